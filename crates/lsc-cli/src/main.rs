use std::fs::{self, File};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::{env, io};

use anyhow::Context;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use lsc_extract::{OutboundExtractor, Url};
use lsc_crawler::{
    crawl_site, CrawlError, CrawlSummary, CrawlWriter, CrawlerConfig, Renderer, Throttle,
};
use lsc_records::{run_files, FilterMode, RecordsConfig};
use tokio::runtime;

/// Listing Site Crawler
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Args {
    #[clap(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[clap(name = "crawl")]
    Crawl(CrawlArgs),
    #[clap(name = "records")]
    Records(RecordsArgs),
    #[clap(name = "extract")]
    Extract(ExtractArgs),
    #[clap(hide = true)]
    Completion,
}

/// Crawl a sitemap and write one classified row per entry
#[derive(Debug, clap::Args)]
pub struct CrawlArgs {
    /// Url of the sitemap (or sitemap index) to crawl
    #[clap(long)]
    pub sitemap: String,
    /// Path to the output file that will contain the crawl table
    #[clap(parse(from_os_str), long, short)]
    pub output_file: PathBuf,
    /// Fetch accommodation detail pages and extract their outbound link
    #[clap(long)]
    pub enrich: bool,
    /// Fetch every page, not only accommodation detail pages
    #[clap(long)]
    pub enrich_all: bool,
    /// Render pages in a headless browser when the static pass finds nothing
    #[clap(long)]
    pub render: bool,
    /// Allow rendering of non detail pages
    #[clap(long)]
    pub render_all: bool,
    /// Maximum number of sitemap entries processed
    #[clap(long)]
    pub limit: Option<usize>,
    /// Override the delay in seconds between page fetches
    #[clap(long)]
    pub delay: Option<f32>,
    /// Override the maximum number of page fetches per second
    #[clap(long, conflicts_with = "delay")]
    pub per_second: Option<NonZeroUsize>,
    /// Override the page fetch timeout in seconds
    #[clap(long)]
    pub timeout: Option<f32>,
    /// Override the render timeout in seconds
    #[clap(long)]
    pub render_timeout: Option<f32>,
    /// Override crawler's user agent
    #[clap(long)]
    pub user_agent: Option<String>,
    /// Optional crawler yaml configuration file
    #[clap(env = "LSC_CONFIG", parse(from_os_str), long)]
    pub config: Option<PathBuf>,
    /// No SIGINT handling, the run can't be stopped gracefully
    #[clap(long)]
    pub no_sigint: bool,
    /// When quiet no logs are outputted
    #[clap(long, short)]
    pub quiet: bool,
}

fn load_crawler_config(path: Option<&PathBuf>) -> anyhow::Result<CrawlerConfig> {
    let conf: CrawlerConfig = match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Couldn't open config {}", path.display()))?;
            serde_yaml::from_reader(file)?
        }
        None => CrawlerConfig::default(),
    };
    conf.validate()?;
    Ok(conf)
}

impl TryFrom<&CrawlArgs> for CrawlerConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut conf = load_crawler_config(args.config.as_ref())?;
        if args.enrich || args.enrich_all {
            conf.policy.enrich = true;
        }
        if args.enrich_all {
            conf.policy.enrich_all = true;
        }
        if args.render || args.render_all {
            conf.policy.render = true;
        }
        if args.render_all {
            conf.policy.render_all = true;
        }
        if let Some(limit) = args.limit {
            conf.limit = limit;
        }
        if let Some(delay) = args.delay {
            conf.throttle = Some(Throttle::Delay(delay));
        }
        if let Some(per_second) = args.per_second {
            conf.throttle = Some(Throttle::PerSecond(per_second));
        }
        if let Some(timeout) = args.timeout {
            conf.fetch_timeout = timeout;
        }
        if let Some(render_timeout) = args.render_timeout {
            conf.render_timeout = render_timeout;
        }
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        if args.no_sigint {
            conf.handle_sigint = false;
        }
        conf.validate()?;
        Ok(conf)
    }
}

pub fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let crawler_conf: CrawlerConfig = (&args).try_into()?;
    let mut writer = CrawlWriter::create(&args.output_file)
        .with_context(|| format!("Couldn't create {}", args.output_file.display()))?;

    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let summary = rt.block_on(async {
        let renderer = launch_renderer(&crawler_conf).await;
        let summary = crawl_site(
            &crawler_conf,
            &args.sitemap,
            renderer.as_ref().map(|r| r as &dyn Renderer),
            &mut writer,
        )
        .await;
        close_renderer(renderer).await;
        summary
    });

    let summary = match summary {
        Ok(summary) => summary,
        Err(e) => {
            drop(writer);
            // Nothing was crawled, don't leave a header only table behind
            if !matches!(e, CrawlError::Io(_) | CrawlError::Csv(_)) {
                if let Err(rm) = fs::remove_file(&args.output_file) {
                    log::warn!("Couldn't remove {}: {rm}", args.output_file.display());
                }
            }
            return Err(e.into());
        }
    };

    report(&summary, &args.output_file);
    Ok(())
}

fn report(summary: &CrawlSummary, output: &Path) {
    log::info!(
        "Wrote {} rows to {} ({} enriched, {} links found, {} rendered, {} errors)",
        summary.written,
        output.display(),
        summary.enriched,
        summary.found,
        summary.rendered,
        summary.errors
    );
    if summary.interrupted {
        log::warn!("Run interrupted after {}/{} entries", summary.written, summary.entries);
    }
}

#[cfg(feature = "chromium")]
async fn launch_renderer(conf: &CrawlerConfig) -> Option<lsc_crawler::ChromiumRenderer> {
    if !conf.policy.render {
        return None;
    }
    match lsc_crawler::ChromiumRenderer::launch(&conf.render, conf.render_timeout()).await {
        Ok(renderer) => Some(renderer),
        Err(e) => {
            log::warn!("Rendering disabled: {e}");
            None
        }
    }
}

#[cfg(feature = "chromium")]
async fn close_renderer(renderer: Option<lsc_crawler::ChromiumRenderer>) {
    if let Some(renderer) = renderer {
        renderer.close().await;
    }
}

#[cfg(not(feature = "chromium"))]
async fn launch_renderer(conf: &CrawlerConfig) -> Option<NoRenderer> {
    if conf.policy.render {
        log::warn!("Rendering disabled: lsc was built without the `chromium` feature");
    }
    None
}

#[cfg(not(feature = "chromium"))]
async fn close_renderer(_renderer: Option<NoRenderer>) {}

#[cfg(not(feature = "chromium"))]
enum NoRenderer {}

#[cfg(not(feature = "chromium"))]
#[async_trait::async_trait]
impl Renderer for NoRenderer {
    async fn render(&self, _url: &str) -> Result<String, lsc_crawler::RenderError> {
        match *self {}
    }
}

/// Normalize and filter an intermediate listing file into the business table
#[derive(Debug, clap::Args)]
pub struct RecordsArgs {
    /// Path to the `;` separated intermediate listing file
    #[clap(parse(from_os_str), long, short)]
    pub input_file: PathBuf,
    /// Path to the output business table
    #[clap(parse(from_os_str), long, short)]
    pub output_file: PathBuf,
    /// Override how records with a blocklisted website are handled
    #[clap(arg_enum, long)]
    pub filter_mode: Option<FilterMode>,
    /// Optional records yaml configuration file
    #[clap(env = "LSC_RECORDS_CONFIG", parse(from_os_str), long)]
    pub config: Option<PathBuf>,
}

impl TryFrom<&RecordsArgs> for RecordsConfig {
    type Error = anyhow::Error;

    fn try_from(args: &RecordsArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(path) = &args.config {
            let file = File::open(path)
                .with_context(|| format!("Couldn't open config {}", path.display()))?;
            serde_yaml::from_reader(file)?
        } else {
            RecordsConfig::default()
        };
        if let Some(filter_mode) = args.filter_mode {
            conf.filter_mode = filter_mode;
        }
        Ok(conf)
    }
}

pub fn records(args: RecordsArgs) -> anyhow::Result<()> {
    let conf: RecordsConfig = (&args).try_into()?;
    let summary = run_files(&conf, &args.input_file, &args.output_file)?;
    println!(
        "Read {} records, kept {} ({} websites cleared, {} dropped)",
        summary.read, summary.kept, summary.cleared, summary.dropped
    );
    Ok(())
}

/// Extract the outbound link of a single page and print it to stdout
#[derive(Debug, clap::Args)]
#[clap(group = clap::ArgGroup::new("page").required(true))]
pub struct ExtractArgs {
    /// A distant html page to extract from
    #[clap(group = "page", long)]
    pub url: Option<String>,
    /// A local html page to extract from
    #[clap(group = "page", parse(from_os_str), long, requires = "base")]
    pub file: Option<PathBuf>,
    /// Url the local page was saved from, used to resolve relative links
    #[clap(long, conflicts_with = "url")]
    pub base: Option<String>,
    /// Optional crawler yaml configuration file
    #[clap(env = "LSC_CONFIG", parse(from_os_str), long)]
    pub config: Option<PathBuf>,
}

pub fn extract(args: ExtractArgs) -> anyhow::Result<()> {
    let conf = load_crawler_config(args.config.as_ref())?;
    let (page, base) = if let Some(url) = args.url {
        let client = reqwest::blocking::ClientBuilder::new()
            .user_agent(&conf.user_agent)
            .timeout(conf.fetch_timeout())
            .build()?;
        let page = client.get(&url).send()?.error_for_status()?.text()?;
        (page, url)
    } else if let (Some(path), Some(base)) = (args.file, args.base) {
        let page = fs::read_to_string(&path)
            .with_context(|| format!("Couldn't read {}", path.display()))?;
        (page, base)
    } else {
        anyhow::bail!("Missing `url` or `file` with `base`");
    };

    let base = Url::parse(&base).with_context(|| format!("Invalid base url {base}"))?;
    let link = OutboundExtractor::new(conf.extractor).extract_page(&page, &base);
    println!("kind:   {}", conf.classifier.classify(base.as_str()).kind);
    println!("source: {}", link.source);
    println!("label:  {}", link.label);
    println!("url:    {}", link.url);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Crawl(args) => {
            if !args.quiet {
                if env::var_os("RUST_LOG").is_none() {
                    env::set_var("RUST_LOG", "lsc=info,lsc_crawler=info,lsc_extract=warn");
                }
                env_logger::init();
            }
            crawl(args)
        }
        SubCommand::Records(args) => {
            if env::var_os("RUST_LOG").is_none() {
                env::set_var("RUST_LOG", "lsc_records=info");
            }
            env_logger::init();
            records(args)
        }
        SubCommand::Extract(args) => {
            if env::var_os("RUST_LOG").is_none() {
                env::set_var("RUST_LOG", "lsc_extract=debug");
            }
            env_logger::init();
            extract(args)
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "lsc", &mut io::stdout());
            Ok(())
        }
    }
}
