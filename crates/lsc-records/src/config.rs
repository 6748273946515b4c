use serde::{Deserialize, Serialize};

use crate::filter::{default_blocklist, FilterMode};
use crate::normalize::CategoryMapping;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsConfig {
    #[serde(default = "default_input_delimiter")]
    pub input_delimiter: char,

    #[serde(default)]
    pub output: CsvWriterConfig,

    #[serde(default)]
    pub columns: ColumnAliases,

    #[serde(default)]
    pub categories: CategoryMapping,

    /// Host substrings marking a website as an aggregator or social profile
    #[serde(default = "default_blocklist")]
    pub blocklist: Vec<String>,

    #[serde(default)]
    pub filter_mode: FilterMode,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            input_delimiter: default_input_delimiter(),
            output: CsvWriterConfig::default(),
            columns: ColumnAliases::default(),
            categories: CategoryMapping::default(),
            blocklist: default_blocklist(),
            filter_mode: FilterMode::default(),
        }
    }
}

fn default_input_delimiter() -> char {
    ';'
}

/// Accepted header names per field, the first one present in the input wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAliases {
    #[serde(default = "default_name_aliases")]
    pub name: Vec<String>,
    #[serde(default = "default_place_aliases")]
    pub place: Vec<String>,
    #[serde(default = "default_website_aliases")]
    pub website: Vec<String>,
    #[serde(default = "default_category_aliases")]
    pub category: Vec<String>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            name: default_name_aliases(),
            place: default_place_aliases(),
            website: default_website_aliases(),
            category: default_category_aliases(),
        }
    }
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn default_name_aliases() -> Vec<String> {
    aliases(&["naam_afgeleid", "name", "naam"])
}

fn default_place_aliases() -> Vec<String> {
    aliases(&["city", "plaats"])
}

fn default_website_aliases() -> Vec<String> {
    aliases(&["url", "website"])
}

fn default_category_aliases() -> Vec<String> {
    aliases(&["category", "categorie"])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvWriterConfig {
    #[serde(default = "default_csv_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_csv_terminator")]
    pub terminator: CsvTerminator,
}

impl Default for CsvWriterConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            terminator: CsvTerminator::Any('\n'),
        }
    }
}

fn default_csv_delimiter() -> char {
    CsvWriterConfig::default().delimiter
}

fn default_csv_terminator() -> CsvTerminator {
    CsvWriterConfig::default().terminator
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum CsvTerminator {
    CRLF,
    Any(char),
}

impl From<CsvTerminator> for csv::Terminator {
    fn from(source: CsvTerminator) -> Self {
        match source {
            CsvTerminator::CRLF => Self::CRLF,
            CsvTerminator::Any(c) => Self::Any(c as u8),
        }
    }
}

impl From<&CsvWriterConfig> for csv::WriterBuilder {
    fn from(c: &CsvWriterConfig) -> Self {
        let mut builder = csv::WriterBuilder::new();
        builder
            .delimiter(c.delimiter as u8)
            .terminator(c.terminator.into())
            .has_headers(false);
        builder
    }
}
