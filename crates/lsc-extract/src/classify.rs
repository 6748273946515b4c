//! Coarse content-type labels derived from URL paths.

use serde::{Deserialize, Serialize};

use crate::url_path;

/// A single classification rule: every substring in `contains` must be present in the
/// lowercased URL path for `label` to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRule {
    pub contains: Vec<String>,
    pub label: String,
}

impl ClassifierRule {
    pub fn new<S: Into<String>>(contains: &[&str], label: S) -> Self {
        Self {
            contains: contains.iter().map(|s| s.to_lowercase()).collect(),
            label: label.into(),
        }
    }

    fn matches(&self, path: &str) -> bool {
        !self.contains.is_empty()
            && self
                .contains
                .iter()
                .all(|needle| path.contains(&needle.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageClassification {
    pub kind: String,
}

/// Ordered rule list, evaluated top to bottom, first match wins.
///
/// Rules combining a category with `/detail/` must precede the bare category rule,
/// otherwise the generic label shadows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classifier {
    #[serde(default = "default_rules")]
    pub rules: Vec<ClassifierRule>,

    #[serde(default = "default_fallback")]
    pub fallback: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            fallback: default_fallback(),
        }
    }
}

fn default_fallback() -> String {
    String::from("other")
}

fn default_rules() -> Vec<ClassifierRule> {
    vec![
        ClassifierRule::new(&["/overnachten/", "/detail/"], "accommodation-detail"),
        ClassifierRule::new(&["/eten-en-drinken/", "/detail/"], "food-drink-detail"),
        ClassifierRule::new(&["/zien-en-doen/", "/detail/"], "activity-detail"),
        ClassifierRule::new(&["/winkelen/", "/detail/"], "shopping-detail"),
        ClassifierRule::new(&["/evenementen/", "/detail/"], "event-detail"),
        ClassifierRule::new(&["/routes/", "/detail/"], "route-detail"),
        ClassifierRule::new(&["/detail/"], "detail"),
        ClassifierRule::new(&["/overnachten/"], "accommodation"),
        ClassifierRule::new(&["/eten-en-drinken/"], "food-drink"),
        ClassifierRule::new(&["/zien-en-doen/"], "activity"),
        ClassifierRule::new(&["/winkelen/"], "shopping"),
        ClassifierRule::new(&["/evenementen/"], "event"),
        ClassifierRule::new(&["/routes/"], "route"),
        ClassifierRule::new(&["/nieuws/"], "news"),
        ClassifierRule::new(&["/blog/"], "blog"),
    ]
}

impl Classifier {
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self {
            rules,
            fallback: default_fallback(),
        }
    }

    pub fn classify(&self, url: &str) -> PageClassification {
        let path = url_path(url).to_lowercase();
        let kind = self
            .rules
            .iter()
            .find(|rule| rule.matches(&path))
            .map(|rule| rule.label.clone())
            .unwrap_or_else(|| self.fallback.clone());
        PageClassification { kind }
    }
}
