use std::future::Future;
use std::io::prelude::*;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flate2::read::GzDecoder;
use lsc_extract::{derive_name, Classifier, OutboundExtractor, OutboundLink};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tokio::time::timeout;
use url::Url;

use crate::config::CrawlerConfig;
use crate::error::{CrawlError, ExtractionError, FetchError};
use crate::limiter::Limiter;
use crate::policy::EnrichmentPolicy;
use crate::render::Renderer;
use crate::sitemap::{parse_sitemap, ParsedSitemap, SitemapEntry};
use crate::writer::{CrawlWriter, OutputRow};

/// HTTP session reused for every request of a run.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
}

impl Downloader {
    pub fn new(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let client = reqwest::ClientBuilder::new()
            .gzip(true)
            .deflate(true)
            .build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            timeout: config.fetch_timeout(),
        })
    }

    pub async fn download(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        timeout(self.timeout, self.fetch(parsed))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                secs: self.timeout.as_secs_f32(),
            })?
    }

    async fn fetch(&self, url: Url) -> Result<String, FetchError> {
        let connection = |source| FetchError::Connection {
            url: url.to_string(),
            source,
        };

        let resp = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(connection)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let gzipped = match resp.headers().get(CONTENT_TYPE) {
            Some(c) => c == "application/x-gzip" || c == "application/gzip",
            None => false,
        } || url.path().ends_with(".gz");

        if gzipped {
            let compressed = resp.bytes().await.map_err(connection)?;
            let mut gz = GzDecoder::new(&compressed[..]);
            let mut page = String::new();
            gz.read_to_string(&mut page)
                .map_err(|source| FetchError::Body {
                    url: url.to_string(),
                    source,
                })?;
            Ok(page)
        } else {
            resp.text().await.map_err(connection)
        }
    }
}

/// Collects the entries of a sitemap, following sitemap indexes depth first.
///
/// Any fetch or parse failure is fatal: a partial sitemap is never returned.
pub fn gather_entries<'a>(
    downloader: &'a Downloader,
    sitemap_url: &'a str,
) -> Pin<Box<dyn Future<Output = Result<Vec<SitemapEntry>, CrawlError>> + Send + 'a>> {
    Box::pin(async move {
        let sitemap_xml = downloader.download(sitemap_url).await?;

        match parse_sitemap(&sitemap_xml)? {
            ParsedSitemap::Urlset(entries) => {
                log::debug!("Sitemap {sitemap_url} lists {} entries", entries.len());
                Ok(entries)
            }
            ParsedSitemap::Index(children) => {
                log::info!("Sitemap index {sitemap_url} lists {} sitemaps", children.len());
                let mut entries = vec![];
                for child in children {
                    entries.extend(gather_entries(downloader, &child).await?);
                }
                Ok(entries)
            }
        }
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub entries: usize,
    pub written: usize,
    pub enriched: usize,
    pub found: usize,
    pub rendered: usize,
    pub errors: usize,
    pub interrupted: bool,
}

impl CrawlSummary {
    fn record(&mut self, row: &OutputRow, enriched: bool) {
        use lsc_extract::LinkSource;

        self.written += 1;
        if enriched {
            self.enriched += 1;
        }
        match row.outbound.source {
            LinkSource::StaticHtml => self.found += 1,
            LinkSource::Rendered => {
                self.found += 1;
                self.rendered += 1;
            }
            LinkSource::Error => self.errors += 1,
            LinkSource::None => (),
        }
    }
}

/// Per-run state: the HTTP session, the rule tables and the politeness limiter.
pub struct PageProcessor<'a> {
    downloader: Downloader,
    classifier: Classifier,
    extractor: OutboundExtractor,
    policy: EnrichmentPolicy,
    limiter: Limiter,
    renderer: Option<&'a dyn Renderer>,
}

impl<'a> PageProcessor<'a> {
    pub fn new(
        config: &CrawlerConfig,
        downloader: Downloader,
        renderer: Option<&'a dyn Renderer>,
    ) -> Self {
        Self {
            downloader,
            classifier: config.classifier.clone(),
            extractor: OutboundExtractor::new(config.extractor.clone()),
            policy: config.policy.clone(),
            limiter: Limiter::new(config.throttle),
            renderer,
        }
    }

    /// Builds the output row of one entry. Failures end up in the row, never in the run.
    pub async fn process(&mut self, entry: &SitemapEntry) -> OutputRow {
        let url = entry.location.as_str();
        let kind = self.classifier.classify(url).kind;
        let derived_name = derive_name(url);

        let outbound = if self.policy.should_enrich(url) {
            match self.enrich(url).await {
                Ok(link) => link,
                Err(e) => {
                    log::warn!("Couldn't enrich {url}: {e}");
                    OutboundLink::error(e.class(), &e)
                }
            }
        } else {
            OutboundLink::none()
        };

        OutputRow::new(entry, kind, derived_name, outbound)
    }

    pub fn should_enrich(&self, url: &str) -> bool {
        self.policy.should_enrich(url)
    }

    async fn enrich(&mut self, url: &str) -> Result<OutboundLink, ExtractionError> {
        self.limiter.started();
        let page = self.downloader.download(url).await;
        self.limiter.pause().await;

        let page = page?;
        let base = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let link = self.extractor.extract_page(&page, &base);
        if link.is_found() || !self.policy.should_render(url) {
            return Ok(link);
        }

        match self.renderer {
            Some(renderer) => {
                log::debug!("No static outbound link on {url}, rendering");
                let rendered = renderer.render(url).await?;
                Ok(self.extractor.extract_page(&rendered, &base).into_rendered())
            }
            None => Ok(link),
        }
    }
}

/// Crawls the sitemap at `sitemap_url` and writes one row per entry to `writer`.
///
/// Entries are processed one at a time. When `handle_sigint` is set, Ctrl-C stops the
/// run after the current entry and the rows written so far are flushed.
pub async fn crawl_site<W: Write>(
    config: &CrawlerConfig,
    sitemap_url: &str,
    renderer: Option<&dyn Renderer>,
    writer: &mut CrawlWriter<W>,
) -> Result<CrawlSummary, CrawlError> {
    let stop = Arc::new(AtomicBool::new(false));
    let sigint = config.handle_sigint.then(|| {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, finishing current entry");
                stop.store(true, Ordering::SeqCst);
            }
        })
    });

    let summary = crawl_site_until(config, sitemap_url, renderer, writer, &stop).await;

    if let Some(handle) = sigint {
        handle.abort();
    }
    summary
}

/// Same as [`crawl_site`], stopping before the next entry once `stop` is raised.
pub async fn crawl_site_until<W: Write>(
    config: &CrawlerConfig,
    sitemap_url: &str,
    renderer: Option<&dyn Renderer>,
    writer: &mut CrawlWriter<W>,
    stop: &AtomicBool,
) -> Result<CrawlSummary, CrawlError> {
    config.validate()?;
    let downloader = Downloader::new(config)?;

    let mut entries = gather_entries(&downloader, sitemap_url).await?;
    if config.limit > 0 {
        entries.truncate(config.limit);
    }
    let total = entries.len();
    log::info!("Crawling {total} entries from {sitemap_url}");

    let mut processor = PageProcessor::new(config, downloader, renderer);
    let mut summary = CrawlSummary {
        entries: total,
        ..Default::default()
    };

    let result = async {
        for (i, entry) in entries.iter().enumerate() {
            if stop.load(Ordering::SeqCst) {
                summary.interrupted = true;
                break;
            }

            let enriched = processor.should_enrich(&entry.location);
            let row = processor.process(entry).await;
            writer.write_row(&row)?;
            summary.record(&row, enriched);

            let done = i + 1;
            if config.progress_every > 0 && (done % config.progress_every == 0 || done == total) {
                log::info!(
                    "Processed {done}/{total} entries ({} enriched, {} links, {} errors)",
                    summary.enriched,
                    summary.found,
                    summary.errors
                );
            }
        }
        Ok::<(), CrawlError>(())
    }
    .await;

    writer.flush()?;
    result?;

    Ok(summary)
}
