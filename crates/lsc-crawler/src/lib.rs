mod config;
mod crawler;
mod error;
mod limiter;
mod policy;
mod render;
mod sitemap;
mod writer;

pub use config::{CrawlerConfig, Throttle};
pub use crawler::{
    crawl_site, crawl_site_until, gather_entries, CrawlSummary, Downloader, PageProcessor,
};
pub use error::{
    CrawlError, ExtractionError, FetchError, RenderError, NETWORK_FAILURE, RENDER_FAILURE,
};
pub use limiter::Limiter;
pub use policy::EnrichmentPolicy;
pub use render::{RenderConfig, Renderer};
pub use sitemap::{parse_sitemap, ParsedSitemap, Sitemap, SitemapEntry};
pub use writer::{CrawlWriter, OutputRow, CRAWL_HEADERS, UTF8_BOM};

#[cfg(feature = "chromium")]
pub use render::ChromiumRenderer;

pub use lsc_extract;
