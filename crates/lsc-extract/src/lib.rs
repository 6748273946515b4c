mod classify;
mod name;
mod outbound;

pub use classify::{Classifier, ClassifierRule, PageClassification};
pub use name::derive_name;
pub use outbound::{
    is_external, registrable_domain, ExtractorRules, LinkSource, OutboundExtractor, OutboundLink, Strategy,
    ONCLICK_LABEL, SCRIPT_URL_LABEL,
};

pub use scraper::Html;
pub use url::Url;

/// Path component of `url`, or the raw string (without query and fragment) when it
/// does not parse as an absolute URL.
pub fn url_path(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .trim()
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::url_path;

    #[test]
    fn path_of_absolute_and_raw() {
        assert_eq!(url_path("https://x.nl/a/b/?q=1"), "/a/b/");
        assert_eq!(url_path("/a/detail/b?q=1#top"), "/a/detail/b");
        assert_eq!(url_path(""), "");
    }
}
