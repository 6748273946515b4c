use thiserror::Error;

pub const NETWORK_FAILURE: &str = "NetworkFailure";
pub const RENDER_FAILURE: &str = "RenderFailure";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Timed out after {secs}s fetching {url}")]
    Timeout { url: String, secs: f32 },

    #[error("HTTP {status} fetching {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Request to {url} failed: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Couldn't decode body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Browser unavailable: {0}")]
    Unavailable(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out after {secs}s rendering {url}")]
    Timeout { url: String, secs: f32 },
}

/// Failure of the enrichment of a single page, recorded in its output row.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ExtractionError {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Fetch(_) => NETWORK_FAILURE,
            Self::Render(_) => RENDER_FAILURE,
        }
    }
}

/// Run level failures, nothing is written when one of these happens before the first row.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Couldn't fetch sitemap: {0}")]
    Fetch(#[from] FetchError),

    #[error("Malformed sitemap document: {0}")]
    MalformedDocument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid XPath {0}")]
    XPath(String),

    #[error("Couldn't build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
