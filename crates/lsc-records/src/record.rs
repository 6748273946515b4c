use serde::{Deserialize, Serialize};

pub const BUSINESS_HEADERS: [&str; 4] = ["naam", "plaats", "website", "categorie"];

/// The public four-field record. No other collected field ever reaches the output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRecord {
    #[serde(rename = "naam")]
    pub name: String,
    #[serde(rename = "plaats")]
    pub place: String,
    pub website: String,
    #[serde(rename = "categorie")]
    pub category: String,
}

impl BusinessRecord {
    pub fn new<S: Into<String>>(name: S, place: S, website: S, category: S) -> Self {
        Self {
            name: name.into(),
            place: place.into(),
            website: website.into(),
            category: category.into(),
        }
    }
}
