//! Outbound "book now / visit website" link detection.
//!
//! The extractor runs a fixed cascade of strategies and stops at the first hit:
//! real anchors first, then data-attribute buttons, then `onclick` handlers and
//! finally absolute URLs embedded in inline scripts.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::{Host, Url};

lazy_static! {
    static ref ANCHORS: Selector = Selector::parse("a[href]").unwrap();
    static ref ALL_ELEMENTS: Selector = Selector::parse("*").unwrap();
    static ref ONCLICK: Selector = Selector::parse("[onclick]").unwrap();
    static ref INLINE_SCRIPTS: Selector = Selector::parse("script:not([src])").unwrap();
    static ref ABSOLUTE_URL: Regex = Regex::new(r#"https?://[^\s"'<>`\\)]+"#).unwrap();
}

pub const SCRIPT_URL_LABEL: &str = "script-url";
pub const ONCLICK_LABEL: &str = "onclick";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkSource {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "static")]
    StaticHtml,
    #[serde(rename = "rendered")]
    Rendered,
    #[serde(rename = "error")]
    Error,
}

impl LinkSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::StaticHtml => "static",
            Self::Rendered => "rendered",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LinkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The best external link found on one page, or the explicit absence of one.
///
/// For `LinkSource::Error` the `label` holds the error class and `url` the error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundLink {
    pub label: String,
    pub url: String,
    pub source: LinkSource,
}

impl OutboundLink {
    pub fn none() -> Self {
        Self {
            label: String::new(),
            url: String::new(),
            source: LinkSource::None,
        }
    }

    pub fn found<L: Into<String>, U: Into<String>>(label: L, url: U, source: LinkSource) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            source,
        }
    }

    pub fn error<E: fmt::Display>(class: &str, message: E) -> Self {
        Self {
            label: class.to_string(),
            url: message.to_string().replace(['\n', '\r'], " "),
            source: LinkSource::Error,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self.source, LinkSource::StaticHtml | LinkSource::Rendered)
    }

    /// Marks a link found in a rendered DOM, leaves misses untouched.
    pub fn into_rendered(self) -> Self {
        match self.source {
            LinkSource::StaticHtml => Self {
                source: LinkSource::Rendered,
                ..self
            },
            _ => self,
        }
    }
}

impl Default for OutboundLink {
    fn default() -> Self {
        Self::none()
    }
}

/// Keyword and attribute tables driving the cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorRules {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    #[serde(default = "default_data_attributes")]
    pub data_attributes: Vec<String>,

    /// Registrable domain of the crawled site, derived from the page URL when absent
    #[serde(default)]
    pub own_domain: Option<String>,
}

impl Default for ExtractorRules {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            data_attributes: default_data_attributes(),
            own_domain: None,
        }
    }
}

fn default_keywords() -> Vec<String> {
    [
        "boek nu",
        "nu boeken",
        "boek direct",
        "direct boeken",
        "reserveer",
        "reserveren",
        "naar de website",
        "naar website",
        "bezoek de website",
        "bezoek website",
        "bekijk website",
        "book now",
        "book direct",
        "visit website",
        "go to website",
        "to the website",
        "reserve",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_data_attributes() -> Vec<String> {
    [
        "data-href",
        "data-url",
        "data-link",
        "data-booking",
        "data-booking-url",
        "data-redirect",
        "data-redirect-url",
        "data-target-url",
        "data-external-url",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    AnchorText,
    DataAttribute,
    InlineHandler,
    ScriptUrl,
}

#[derive(Debug, Clone)]
pub struct OutboundExtractor {
    rules: ExtractorRules,
    keywords: Vec<String>,
}

impl Default for OutboundExtractor {
    fn default() -> Self {
        Self::new(ExtractorRules::default())
    }
}

impl OutboundExtractor {
    pub fn new(rules: ExtractorRules) -> Self {
        let keywords = rules
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { rules, keywords }
    }

    pub fn rules(&self) -> &ExtractorRules {
        &self.rules
    }

    /// The domain considered "own site" when judging links found on `base`.
    ///
    /// Without a configured domain this is the registrable domain of `base`, so pages
    /// served from any subdomain share the same own site.
    pub fn own_domain(&self, base: &Url) -> String {
        match &self.rules.own_domain {
            Some(domain) => domain.trim().to_lowercase(),
            None => registrable_domain(base),
        }
    }

    pub fn extract_page(&self, page: &str, base: &Url) -> OutboundLink {
        self.extract(&Html::parse_document(page), base)
    }

    pub fn extract(&self, html: &Html, base: &Url) -> OutboundLink {
        let own = self.own_domain(base);

        let found = self
            .by_anchor_text(html, base, &own)
            .map(|l| (Strategy::AnchorText, l))
            .or_else(|| {
                self.by_data_attribute(html, base, &own)
                    .map(|l| (Strategy::DataAttribute, l))
            })
            .or_else(|| {
                self.by_inline_handler(html, &own)
                    .map(|l| (Strategy::InlineHandler, l))
            })
            .or_else(|| by_script_url(html, &own).map(|l| (Strategy::ScriptUrl, l)));

        match found {
            Some((strategy, (label, url))) => {
                log::debug!("Outbound link for {base} via {strategy:?}: {url}");
                OutboundLink::found(label, url, LinkSource::StaticHtml)
            }
            None => OutboundLink::none(),
        }
    }

    fn has_keyword(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }

    fn by_anchor_text(&self, html: &Html, base: &Url, own: &str) -> Option<(String, String)> {
        html.select(&ANCHORS).find_map(|anchor| {
            let href = anchor.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let text = visible_text(&anchor);
            if !self.has_keyword(&text) {
                return None;
            }
            let url = base.join(href).ok()?;
            is_external_url(&url, own).then(|| (text, url.to_string()))
        })
    }

    fn by_data_attribute(&self, html: &Html, base: &Url, own: &str) -> Option<(String, String)> {
        html.select(&ALL_ELEMENTS).find_map(|elem| {
            let candidates = self
                .rules
                .data_attributes
                .iter()
                .filter_map(|name| {
                    let value = elem.value().attr(name)?.trim();
                    (!value.is_empty()).then_some((name, value))
                })
                .collect::<Vec<_>>();
            if candidates.is_empty() {
                return None;
            }

            let text = visible_text(&elem);
            if !self.has_keyword(&text) {
                return None;
            }

            candidates.into_iter().find_map(|(name, value)| {
                let url = base.join(value).ok()?;
                if !is_external_url(&url, own) {
                    return None;
                }
                let label = if text.is_empty() { name.clone() } else { text.clone() };
                Some((label, url.to_string()))
            })
        })
    }

    fn by_inline_handler(&self, html: &Html, own: &str) -> Option<(String, String)> {
        html.select(&ONCLICK).find_map(|elem| {
            let handler = elem.value().attr("onclick")?;
            let text = visible_text(&elem);
            if !self.has_keyword(handler) && !self.has_keyword(&text) {
                return None;
            }
            let url = first_absolute_url(handler)?;
            if !is_external_url(&url, own) {
                return None;
            }
            let label = if text.is_empty() {
                ONCLICK_LABEL.to_string()
            } else {
                text
            };
            Some((label, url.to_string()))
        })
    }
}

fn by_script_url(html: &Html, own: &str) -> Option<(String, String)> {
    html.select(&INLINE_SCRIPTS).find_map(|script| {
        let body = script.text().collect::<String>().replace("\\/", "/");
        ABSOLUTE_URL
            .find_iter(&body)
            .filter_map(|m| parse_candidate(m.as_str()))
            .find(|url| is_external_url(url, own))
            .map(|url| (SCRIPT_URL_LABEL.to_string(), url.to_string()))
    })
}

fn first_absolute_url(source: &str) -> Option<Url> {
    ABSOLUTE_URL
        .find(source)
        .and_then(|m| parse_candidate(m.as_str()))
}

fn parse_candidate(raw: &str) -> Option<Url> {
    Url::parse(raw.trim_end_matches(['.', ',', ';'])).ok()
}

fn visible_text(elem: &ElementRef) -> String {
    elem.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_external_url(url: &Url, own_domain: &str) -> bool {
    match url.host_str() {
        Some(host) if !host.is_empty() => {
            own_domain.is_empty() || !host.to_lowercase().contains(own_domain)
        }
        _ => false,
    }
}

/// Registrable domain of the host of `url`, e.g. `visitzuidlimburg.nl` for
/// `m.visitzuidlimburg.nl`. IP addresses and hosts without a public suffix are kept whole.
pub fn registrable_domain(url: &Url) -> String {
    match url.host() {
        Some(Host::Domain(host)) => {
            let host = host.trim_end_matches('.').to_lowercase();
            match psl::domain_str(&host) {
                Some(domain) => domain.to_string(),
                None => host.trim_start_matches("www.").to_string(),
            }
        }
        Some(host) => host.to_string(),
        None => String::new(),
    }
}

/// Whether `url` leaves the site whose registrable domain is `own_domain`.
///
/// The check is a substring match on the host, so every subdomain of the own domain
/// counts as internal. URLs without a host (relative, `mailto:`, `javascript:`) are
/// never external.
pub fn is_external(url: &str, own_domain: &str) -> bool {
    Url::parse(url.trim())
        .map(|u| is_external_url(&u, &own_domain.trim().to_lowercase()))
        .unwrap_or(false)
}
