use lsc_extract::url_path;
use serde::{Deserialize, Serialize};

/// Decides which sitemap entries are worth an extra page fetch, and which of those may
/// fall back to a rendered fetch.
///
/// Listing and index pages cannot hold a partner link, so by default only detail pages
/// and accommodation pages are enriched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentPolicy {
    #[serde(default)]
    pub enrich: bool,

    #[serde(default)]
    pub enrich_all: bool,

    #[serde(default)]
    pub render: bool,

    #[serde(default)]
    pub render_all: bool,

    #[serde(default = "default_detail_markers")]
    pub detail_markers: Vec<String>,

    #[serde(default = "default_section_markers")]
    pub section_markers: Vec<String>,
}

impl Default for EnrichmentPolicy {
    fn default() -> Self {
        Self {
            enrich: false,
            enrich_all: false,
            render: false,
            render_all: false,
            detail_markers: default_detail_markers(),
            section_markers: default_section_markers(),
        }
    }
}

fn default_detail_markers() -> Vec<String> {
    vec![String::from("/detail/")]
}

fn default_section_markers() -> Vec<String> {
    vec![String::from("/overnachten/")]
}

impl EnrichmentPolicy {
    /// Default markers with enrichment switched on.
    pub fn enabled() -> Self {
        Self {
            enrich: true,
            ..Default::default()
        }
    }

    pub fn is_detail(&self, url: &str) -> bool {
        has_marker(url, &self.detail_markers)
    }

    pub fn should_enrich(&self, url: &str) -> bool {
        self.enrich
            && (self.enrich_all || self.is_detail(url) || has_marker(url, &self.section_markers))
    }

    /// Only meaningful once the static extraction came back empty.
    pub fn should_render(&self, url: &str) -> bool {
        self.should_enrich(url) && self.render && (self.render_all || self.is_detail(url))
    }
}

fn has_marker(url: &str, markers: &[String]) -> bool {
    let path = url_path(url).to_lowercase();
    markers
        .iter()
        .any(|marker| !marker.is_empty() && path.contains(&marker.to_lowercase()))
}
