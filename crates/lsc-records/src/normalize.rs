use serde::{Deserialize, Serialize};

use crate::record::BusinessRecord;

/// Maps free text categories onto a small fixed vocabulary.
///
/// Rules are evaluated in order against the lowercased category, the first rule having
/// one of its substrings present wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMapping {
    #[serde(default = "default_rules")]
    pub rules: Vec<CategoryRule>,

    #[serde(default = "default_fallback")]
    pub fallback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub contains: Vec<String>,
    pub category: String,
}

impl CategoryRule {
    pub fn new(contains: &[&str], category: &str) -> Self {
        Self {
            contains: contains.iter().map(|s| s.to_string()).collect(),
            category: category.to_string(),
        }
    }
}

impl Default for CategoryMapping {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            fallback: default_fallback(),
        }
    }
}

fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(&["restaurant"], "Restaurant"),
        CategoryRule::new(&["cafe", "café"], "Café"),
        CategoryRule::new(&["hotel", "logies", "bnb", "b&b"], "Logies"),
        CategoryRule::new(&["winkel"], "Winkel"),
        CategoryRule::new(&["wellness", "sauna"], "Wellness"),
        CategoryRule::new(&["attract", "museum"], "Attractie"),
    ]
}

fn default_fallback() -> String {
    String::from("Overig")
}

impl CategoryMapping {
    pub fn map(&self, category: &str) -> String {
        let category = category.to_lowercase();
        self.rules
            .iter()
            .find(|rule| {
                rule.contains
                    .iter()
                    .any(|needle| category.contains(&needle.to_lowercase()))
            })
            .map(|rule| rule.category.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Drops the query string and trailing slashes.
pub fn clean_url(url: &str) -> String {
    let url = url.trim();
    let url = url.split_once('?').map(|(head, _)| head).unwrap_or(url);
    url.trim_end_matches('/').to_string()
}

pub fn normalize_record(record: BusinessRecord, categories: &CategoryMapping) -> BusinessRecord {
    BusinessRecord {
        name: record.name.trim().to_string(),
        place: record.place.trim().to_string(),
        website: clean_url(&record.website),
        category: categories.map(record.category.trim()),
    }
}
