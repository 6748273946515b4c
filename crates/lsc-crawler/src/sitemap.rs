//! Sitemap documents parsing.
//!
//! Parsing is strict: a document that is not well-formed XML is rejected as a whole.
//! `<url>` blocks without a `<loc>` are skipped with a warning, everything else is
//! returned in document order, without dedup nor filtering.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sxd_document::{dom, parser};
use sxd_xpath::{Context, Factory, Value, XPath};

use crate::error::CrawlError;

lazy_static! {
    static ref XP_FACTORY: Factory = Factory::new();
}

const NS_PREFIX: &str = "sm";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub location: String,
    pub last_modified: Option<String>,
}

impl SitemapEntry {
    pub fn new<S: Into<String>>(location: S, last_modified: Option<S>) -> Self {
        Self {
            location: location.into(),
            last_modified: last_modified.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sitemap {
    Index,
    Urlset,
}

impl Sitemap {
    fn block(&self) -> &'static str {
        match self {
            Self::Index => "sitemap",
            Self::Urlset => "url",
        }
    }
}

impl<'a> TryFrom<dom::Element<'a>> for Sitemap {
    type Error = CrawlError;

    fn try_from(root: dom::Element<'a>) -> Result<Self, Self::Error> {
        match root.name().local_part() {
            "sitemapindex" => Ok(Self::Index),
            "urlset" => Ok(Self::Urlset),
            kind => Err(CrawlError::MalformedDocument(format!(
                "Unknown root node kind: {kind}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedSitemap {
    /// Locations of child sitemaps
    Index(Vec<String>),
    Urlset(Vec<SitemapEntry>),
}

pub fn parse_sitemap(xml: &str) -> Result<ParsedSitemap, CrawlError> {
    let package = parser::parse(xml).map_err(|e| CrawlError::MalformedDocument(e.to_string()))?;
    let document = package.as_document();

    let root = document
        .root()
        .children()
        .into_iter()
        .find_map(|child| child.element())
        .ok_or_else(|| CrawlError::MalformedDocument("Missing root element".into()))?;
    let kind = Sitemap::try_from(root)?;

    // The namespace is read once from the root and applied to every query
    let mut context = Context::new();
    let prefix = match root.name().namespace_uri() {
        Some(ns) => {
            context.set_namespace(NS_PREFIX, ns);
            format!("{NS_PREFIX}:")
        }
        None => String::new(),
    };

    let blocks = xpath(&format!("//{prefix}{}", kind.block()))?;
    let loc = xpath(&format!("{prefix}loc"))?;
    let lastmod = xpath(&format!("{prefix}lastmod"))?;

    let nodes = match blocks.evaluate(&context, document.root()) {
        Ok(Value::Nodeset(nodes)) => nodes.document_order(),
        Ok(_) => vec![],
        Err(e) => return Err(CrawlError::XPath(e.to_string())),
    };

    let mut locations = vec![];
    let mut entries = vec![];
    for node in nodes {
        let location = loc
            .evaluate(&context, node)
            .map_err(|e| CrawlError::XPath(e.to_string()))?
            .string()
            .trim()
            .to_string();
        if location.is_empty() {
            log::warn!("Skipping <{}> block without <loc>", kind.block());
            continue;
        }

        match kind {
            Sitemap::Index => locations.push(location),
            Sitemap::Urlset => {
                let last_modified = lastmod
                    .evaluate(&context, node)
                    .map_err(|e| CrawlError::XPath(e.to_string()))?
                    .string()
                    .trim()
                    .to_string();
                entries.push(SitemapEntry {
                    location,
                    last_modified: (!last_modified.is_empty()).then_some(last_modified),
                });
            }
        }
    }

    Ok(match kind {
        Sitemap::Index => ParsedSitemap::Index(locations),
        Sitemap::Urlset => ParsedSitemap::Urlset(entries),
    })
}

fn xpath(expr: &str) -> Result<XPath, CrawlError> {
    XP_FACTORY
        .build(expr)
        .map_err(|e| CrawlError::XPath(format!("{expr}: {e}")))?
        .ok_or_else(|| CrawlError::XPath(format!("{expr}: Missing XPath")))
}
