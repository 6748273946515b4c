use serde::{Deserialize, Serialize};
use url::Url;

use crate::record::BusinessRecord;

/// What happens to a record whose website is on the blocklist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ArgEnum))]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Website is mandatory, a blocklisted website drops the record
    #[default]
    Strict,
    /// Website is optional, a blocklisted website is cleared and the record kept
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Cleared,
    Drop,
}

#[derive(Debug, Clone)]
pub struct RecordFilter {
    mode: FilterMode,
    blocklist: Vec<String>,
}

pub fn default_blocklist() -> Vec<String> {
    [
        "vvnnederland.nl",
        "booking.",
        "hotels.com",
        "expedia",
        "reserveer",
        "affiliate",
        "tripadvisor",
        "airbnb",
        "facebook.com",
        "instagram.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl RecordFilter {
    pub fn new(mode: FilterMode, blocklist: &[String]) -> Self {
        Self {
            mode,
            blocklist: blocklist
                .iter()
                .map(|b| b.trim().to_lowercase())
                .filter(|b| !b.is_empty())
                .collect(),
        }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn is_blocked(&self, website: &str) -> bool {
        let host = website_host(website);
        !host.is_empty() && self.blocklist.iter().any(|b| host.contains(b.as_str()))
    }

    pub fn judge(&self, record: &BusinessRecord) -> Verdict {
        if record.name.is_empty() || record.place.is_empty() {
            return Verdict::Drop;
        }
        match self.mode {
            FilterMode::Strict if record.website.is_empty() => Verdict::Drop,
            FilterMode::Strict if self.is_blocked(&record.website) => Verdict::Drop,
            FilterMode::Lenient if self.is_blocked(&record.website) => Verdict::Cleared,
            _ => Verdict::Keep,
        }
    }

    pub fn apply(&self, record: BusinessRecord) -> Option<BusinessRecord> {
        match self.judge(&record) {
            Verdict::Keep => Some(record),
            Verdict::Cleared => Some(BusinessRecord {
                website: String::new(),
                ..record
            }),
            Verdict::Drop => None,
        }
    }
}

/// Lowercased host of `website`, tolerating a missing scheme. Falls back to the whole
/// lowercased string when no host can be found.
fn website_host(website: &str) -> String {
    let website = website.trim();
    if website.is_empty() {
        return String::new();
    }
    Url::parse(website)
        .ok()
        .filter(|u| u.has_host())
        .or_else(|| Url::parse(&format!("http://{website}")).ok())
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| website.to_lowercase())
}
