use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use lsc_crawler::{
    crawl_site, crawl_site_until, CrawlError, CrawlWriter, CrawlerConfig, EnrichmentPolicy,
    RenderError, Renderer, Throttle, UTF8_BOM,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const DETAIL_WITH_LINK: &str = "/overnachten/hotels/detail/hotel-de-kroon/12345/";
const DETAIL_BROKEN: &str = "/eten-en-drinken/detail/cafe-central/77/";
const DETAIL_SCRIPTED: &str = "/zien-en-doen/detail/bb-de-linde/9/";
const LISTING: &str = "/eten-en-drinken/";
const ACCOMMODATION: &str = "/overnachten/campings/";

fn config(policy: EnrichmentPolicy) -> CrawlerConfig {
    CrawlerConfig {
        throttle: None,
        handle_sigint: false,
        progress_every: 2,
        policy,
        ..Default::default()
    }
}

fn urlset(server: &MockServer, paths: &[&str]) -> String {
    let urls = paths
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "<url><loc>{}{p}</loc><lastmod>2024-06-0{}</lastmod></url>",
                server.uri(),
                i + 1
            )
        })
        .collect::<String>();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{urls}</urlset>"#
    )
}

async fn mount(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

async fn site(server: &MockServer) {
    let sitemap = urlset(
        server,
        &[DETAIL_WITH_LINK, DETAIL_BROKEN, LISTING, ACCOMMODATION, DETAIL_SCRIPTED],
    );
    mount(server, "/sitemap.xml", 200, &sitemap).await;
    mount(
        server,
        DETAIL_WITH_LINK,
        200,
        r#"<html><body><a href="/">Home</a><a href="https://www.hoteldekroon.nl/boeken">Boek nu</a></body></html>"#,
    )
    .await;
    mount(server, DETAIL_BROKEN, 500, "oops").await;
    mount(server, LISTING, 200, "<html><body>Lijst</body></html>").await;
    mount(server, ACCOMMODATION, 200, "<html><body>Campings</body></html>").await;
    mount(
        server,
        DETAIL_SCRIPTED,
        200,
        r#"<html><body><div id="app"></div></body></html>"#,
    )
    .await;
}

fn rows(bytes: Vec<u8>) -> Vec<Vec<String>> {
    assert!(bytes.starts_with(UTF8_BOM));
    let mut rdr = csv::Reader::from_reader(&bytes[UTF8_BOM.len()..]);
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec![
            "url",
            "lastmod",
            "type",
            "derivedName",
            "outboundLabel",
            "outboundUrl",
            "outboundSource"
        ]
    );
    rdr.records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

struct StaticRenderer {
    html: String,
    calls: AtomicUsize,
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn render(&self, _url: &str) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.html.clone())
    }
}

struct BrokenRenderer;

#[async_trait]
impl Renderer for BrokenRenderer {
    async fn render(&self, url: &str) -> Result<String, RenderError> {
        Err(RenderError::Navigation {
            url: url.to_string(),
            reason: "net::ERR_ABORTED".into(),
        })
    }
}

#[tokio::test]
async fn one_row_per_entry_with_errors_in_rows() {
    let server = MockServer::start().await;
    site(&server).await;

    let conf = config(EnrichmentPolicy::enabled());
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    let summary = crawl_site(&conf, &sitemap, None, &mut wtr).await.unwrap();

    let rows = rows(wtr.into_inner().unwrap());
    assert_eq!(rows.len(), 5);
    assert_eq!(summary.entries, 5);
    assert_eq!(summary.written, 5);
    assert_eq!(summary.enriched, 4);
    assert_eq!(summary.found, 1);
    assert_eq!(summary.errors, 1);
    assert!(!summary.interrupted);

    let found = &rows[0];
    assert_eq!(found[0], format!("{}{DETAIL_WITH_LINK}", server.uri()));
    assert_eq!(found[1], "2024-06-01");
    assert_eq!(found[2], "accommodation-detail");
    assert_eq!(found[3], "Hotel De Kroon");
    assert_eq!(found[4], "Boek nu");
    assert_eq!(found[5], "https://www.hoteldekroon.nl/boeken");
    assert_eq!(found[6], "static");

    let broken = &rows[1];
    assert_eq!(broken[3], "Cafe Central");
    assert_eq!(broken[4], "NetworkFailure");
    assert!(broken[5].contains("500"));
    assert_eq!(broken[6], "error");

    let listing = &rows[2];
    assert_eq!(listing[2], "food-drink");
    assert_eq!(listing[6], "none");

    assert_eq!(rows[3][2], "accommodation");
    assert_eq!(rows[3][6], "none");

    let scripted = &rows[4];
    assert_eq!(scripted[3], "B&B De Linde");
    assert_eq!(scripted[6], "none");
}

#[tokio::test]
async fn no_enrichment_means_no_page_fetch() {
    let server = MockServer::start().await;
    let sitemap = urlset(&server, &[DETAIL_WITH_LINK]);
    mount(&server, "/sitemap.xml", 200, &sitemap).await;
    Mock::given(method("GET"))
        .and(path(DETAIL_WITH_LINK))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let conf = config(EnrichmentPolicy::default());
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    crawl_site(&conf, &sitemap, None, &mut wtr).await.unwrap();

    let rows = rows(wtr.into_inner().unwrap());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][3], "Hotel De Kroon");
    assert_eq!(rows[0][6], "none");
}

#[tokio::test]
async fn render_fallback_only_on_static_miss() {
    let server = MockServer::start().await;
    site(&server).await;

    let renderer = StaticRenderer {
        html: r#"<button data-url="https://www.bbdelinde.nl/">Reserveer direct</button>"#.into(),
        calls: AtomicUsize::new(0),
    };
    let conf = config(EnrichmentPolicy {
        render: true,
        ..EnrichmentPolicy::enabled()
    });
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    let summary = crawl_site(&conf, &sitemap, Some(&renderer as &dyn Renderer), &mut wtr)
        .await
        .unwrap();

    // Only the scripted detail page misses statically, the accommodation listing is
    // outside the default render scope
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(summary.rendered, 1);

    let rows = rows(wtr.into_inner().unwrap());
    assert_eq!(rows[0][6], "static");
    assert_eq!(rows[3][6], "none");
    assert_eq!(rows[4][4], "Reserveer direct");
    assert_eq!(rows[4][5], "https://www.bbdelinde.nl/");
    assert_eq!(rows[4][6], "rendered");
}

#[tokio::test]
async fn render_failure_is_recorded() {
    let server = MockServer::start().await;
    site(&server).await;

    let conf = config(EnrichmentPolicy {
        render: true,
        ..EnrichmentPolicy::enabled()
    });
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    crawl_site(&conf, &sitemap, Some(&BrokenRenderer as &dyn Renderer), &mut wtr)
        .await
        .unwrap();

    let rows = rows(wtr.into_inner().unwrap());
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4][4], "RenderFailure");
    assert!(rows[4][5].contains("net::ERR_ABORTED"));
    assert_eq!(rows[4][6], "error");
}

#[tokio::test]
async fn limit_truncates_entries() {
    let server = MockServer::start().await;
    site(&server).await;

    let conf = CrawlerConfig {
        limit: 2,
        ..config(EnrichmentPolicy::default())
    };
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    let summary = crawl_site(&conf, &sitemap, None, &mut wtr).await.unwrap();

    assert_eq!(summary.entries, 2);
    assert_eq!(rows(wtr.into_inner().unwrap()).len(), 2);
}

#[tokio::test]
async fn sitemap_index_is_followed() {
    let server = MockServer::start().await;
    let index = format!(
        r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><sitemap><loc>{uri}/sitemap-a.xml</loc></sitemap><sitemap><loc>{uri}/sitemap-b.xml</loc></sitemap></sitemapindex>"#,
        uri = server.uri()
    );
    mount(&server, "/sitemap.xml", 200, &index).await;
    mount(&server, "/sitemap-a.xml", 200, &urlset(&server, &[LISTING])).await;
    mount(&server, "/sitemap-b.xml", 200, &urlset(&server, &[ACCOMMODATION, LISTING])).await;

    let conf = config(EnrichmentPolicy::default());
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    crawl_site(&conf, &sitemap, None, &mut wtr).await.unwrap();

    let rows = rows(wtr.into_inner().unwrap());
    let urls = rows.iter().map(|r| r[0].clone()).collect::<Vec<_>>();
    assert_eq!(
        urls,
        vec![
            format!("{}{LISTING}", server.uri()),
            format!("{}{ACCOMMODATION}", server.uri()),
            format!("{}{LISTING}", server.uri()),
        ]
    );
}

#[tokio::test]
async fn malformed_sitemap_is_fatal() {
    let server = MockServer::start().await;
    mount(&server, "/sitemap.xml", 200, "<urlset><url><loc>x</loc>").await;

    let conf = config(EnrichmentPolicy::enabled());
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    let err = crawl_site(&conf, &sitemap, None, &mut wtr).await.unwrap_err();

    assert!(matches!(err, CrawlError::MalformedDocument(_)));
    assert!(rows(wtr.into_inner().unwrap()).is_empty());
}

#[tokio::test]
async fn unreachable_sitemap_is_fatal() {
    let server = MockServer::start().await;
    mount(&server, "/sitemap.xml", 404, "").await;

    let conf = config(EnrichmentPolicy::enabled());
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    let err = crawl_site(&conf, &sitemap, None, &mut wtr).await.unwrap_err();

    assert!(matches!(err, CrawlError::Fetch(_)));
}

#[tokio::test]
async fn fetch_timeout_is_a_row_not_a_failed_run() {
    let server = MockServer::start().await;
    let sitemap = urlset(&server, &[DETAIL_WITH_LINK, ACCOMMODATION]);
    mount(&server, "/sitemap.xml", 200, &sitemap).await;
    Mock::given(method("GET"))
        .and(path(DETAIL_WITH_LINK))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount(&server, ACCOMMODATION, 200, "<html><body>Campings</body></html>").await;

    let conf = CrawlerConfig {
        fetch_timeout: 0.3,
        ..config(EnrichmentPolicy::enabled())
    };
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    let summary = crawl_site(&conf, &sitemap, None, &mut wtr).await.unwrap();

    assert_eq!(summary.written, 2);
    assert_eq!(summary.errors, 1);
    let rows = rows(wtr.into_inner().unwrap());
    assert_eq!(rows[0][4], "NetworkFailure");
    assert!(rows[0][5].contains("Timed out"));
    assert_eq!(rows[0][6], "error");
    assert_eq!(rows[1][6], "none");
}

#[tokio::test]
async fn stop_flag_flushes_rows_written_so_far() {
    let server = MockServer::start().await;
    let sitemap = urlset(&server, &[DETAIL_WITH_LINK, LISTING, ACCOMMODATION]);
    mount(&server, "/sitemap.xml", 200, &sitemap).await;

    let stop = Arc::new(AtomicBool::new(false));
    let raise = stop.clone();
    Mock::given(method("GET"))
        .and(path(DETAIL_WITH_LINK))
        .respond_with(move |_: &Request| {
            raise.store(true, Ordering::SeqCst);
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="https://www.hoteldekroon.nl/">Boek nu</a>"#)
        })
        .mount(&server)
        .await;

    let conf = config(EnrichmentPolicy::enabled());
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    let summary = crawl_site_until(&conf, &sitemap, None, &mut wtr, &stop)
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.entries, 3);
    assert_eq!(summary.written, 1);
    let rows = rows(wtr.into_inner().unwrap());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][6], "static");
}

#[tokio::test]
async fn enriched_fetches_are_throttled() {
    let server = MockServer::start().await;
    site(&server).await;

    let conf = CrawlerConfig {
        throttle: Some(Throttle::Delay(0.25)),
        ..config(EnrichmentPolicy::enabled())
    };
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    let started = Instant::now();
    let summary = crawl_site(&conf, &sitemap, None, &mut wtr).await.unwrap();

    // One pause after each of the four enriched fetches, none for the listing page
    assert_eq!(summary.enriched, 4);
    assert!(started.elapsed() >= Duration::from_millis(1000));
}

fn gzip(body: &str) -> Vec<u8> {
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(body.as_bytes()).unwrap();
    gz.finish().unwrap()
}

#[tokio::test]
async fn gzipped_sitemaps_are_decoded() {
    let server = MockServer::start().await;
    let index = format!(
        r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><sitemap><loc>{uri}/sitemap-a.xml.gz</loc></sitemap><sitemap><loc>{uri}/sitemap-b</loc></sitemap></sitemapindex>"#,
        uri = server.uri()
    );
    mount(&server, "/sitemap.xml", 200, &index).await;
    Mock::given(method("GET"))
        .and(path("/sitemap-a.xml.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            gzip(&urlset(&server, &[LISTING])),
            "application/octet-stream",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap-b"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(gzip(&urlset(&server, &[ACCOMMODATION])), "application/gzip"),
        )
        .mount(&server)
        .await;

    let conf = config(EnrichmentPolicy::default());
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    crawl_site(&conf, &sitemap, None, &mut wtr).await.unwrap();

    let rows = rows(wtr.into_inner().unwrap());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][2], "food-drink");
    assert_eq!(rows[1][2], "accommodation");
}

#[tokio::test]
async fn invalid_timeout_is_rejected_before_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let conf = CrawlerConfig {
        fetch_timeout: f32::INFINITY,
        ..config(EnrichmentPolicy::enabled())
    };
    let mut wtr = CrawlWriter::new(Vec::<u8>::new()).unwrap();
    let sitemap = format!("{}/sitemap.xml", server.uri());
    let err = crawl_site(&conf, &sitemap, None, &mut wtr).await.unwrap_err();

    assert!(matches!(err, CrawlError::InvalidConfig(_)));
}
