use std::num::NonZeroUsize;
use std::time::Duration;

use lsc_extract::{Classifier, ExtractorRules};
use serde::{Deserialize, Serialize};

use crate::error::CrawlError;
use crate::policy::EnrichmentPolicy;
use crate::render::RenderConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_throttle")]
    pub throttle: Option<Throttle>,

    /// Timeout in seconds of a plain page or sitemap fetch
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: f32,

    /// Timeout in seconds of a rendered fetch
    #[serde(default = "default_render_timeout")]
    pub render_timeout: f32,

    /// Maximum number of sitemap entries processed, 0 means no limit
    #[serde(default)]
    pub limit: usize,

    #[serde(default = "default_progress_every")]
    pub progress_every: usize,

    #[serde(default = "default_handle_sigint")]
    pub handle_sigint: bool,

    #[serde(default)]
    pub policy: EnrichmentPolicy,

    #[serde(default)]
    pub extractor: ExtractorRules,

    #[serde(default)]
    pub classifier: Classifier,

    #[serde(default)]
    pub render: RenderConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            throttle: default_throttle(),
            fetch_timeout: default_fetch_timeout(),
            render_timeout: default_render_timeout(),
            limit: 0,
            progress_every: default_progress_every(),
            handle_sigint: default_handle_sigint(),
            policy: EnrichmentPolicy::default(),
            extractor: ExtractorRules::default(),
            classifier: Classifier::default(),
            render: RenderConfig::default(),
        }
    }
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        secs(self.fetch_timeout)
    }

    pub fn render_timeout(&self) -> Duration {
        secs(self.render_timeout)
    }

    /// Rejects durations that are negative, not finite or too large to represent.
    pub fn validate(&self) -> Result<(), CrawlError> {
        check_secs("fetchTimeout", self.fetch_timeout)?;
        check_secs("renderTimeout", self.render_timeout)?;
        if let Some(Throttle::Delay(delay)) = self.throttle {
            check_secs("throttle delay", delay)?;
        }
        Ok(())
    }
}

fn check_secs(name: &str, value: f32) -> Result<(), CrawlError> {
    if value >= 0.0 && Duration::try_from_secs_f32(value).is_ok() {
        Ok(())
    } else {
        Err(CrawlError::InvalidConfig(format!(
            "{name} must be a positive number of seconds, got {value}"
        )))
    }
}

/// Saturates instead of panicking, values are expected to be validated beforehand.
pub(crate) fn secs(value: f32) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(value).unwrap_or(Duration::MAX)
}

fn default_user_agent() -> String {
    String::from("Mozilla/5.0 (X11; Linux x86_64; rv:115.0) Gecko/20100101 Firefox/115.0 lsc/0.1")
}

fn default_throttle() -> Option<Throttle> {
    Some(Throttle::Delay(0.5))
}

fn default_fetch_timeout() -> f32 {
    30.0
}

fn default_render_timeout() -> f32 {
    60.0
}

fn default_progress_every() -> usize {
    100
}

fn default_handle_sigint() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Throttle {
    /// The number of requests per second
    PerSecond(NonZeroUsize),
    /// The delay in seconds after each request
    Delay(f32),
}
