//! Scripted browser fallback for pages whose partner link only appears after scripts ran.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Loads a page through a browser engine and returns the resulting DOM as HTML.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, RenderError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    /// Extra wait after the page load, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Labels of the cookie consent buttons to click, compared case-insensitively
    #[serde(default = "default_consent_labels")]
    pub consent_labels: Vec<String>,

    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            consent_labels: default_consent_labels(),
            chrome_executable: None,
        }
    }
}

fn default_settle_delay_ms() -> u64 {
    1_500
}

fn default_consent_labels() -> Vec<String> {
    ["Alles accepteren", "Accepteren", "Akkoord", "Accept all", "Accept"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[cfg(feature = "chromium")]
pub use chromium::ChromiumRenderer;

#[cfg(feature = "chromium")]
mod chromium {
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use tokio::task::JoinHandle;
    use tokio::time::{sleep, timeout};

    use super::{RenderConfig, Renderer};
    use crate::error::RenderError;

    pub struct ChromiumRenderer {
        browser: Browser,
        handler: JoinHandle<()>,
        config: RenderConfig,
        timeout: Duration,
    }

    impl ChromiumRenderer {
        pub async fn launch(config: &RenderConfig, timeout: Duration) -> Result<Self, RenderError> {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(timeout)
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage");
            if let Some(path) = &config.chrome_executable {
                builder = builder.chrome_executable(path);
            }
            let browser_config = builder.build().map_err(RenderError::Unavailable)?;

            let (browser, mut handler) = Browser::launch(browser_config)
                .await
                .map_err(|e| RenderError::Unavailable(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok(Self {
                browser,
                handler,
                config: config.clone(),
                timeout,
            })
        }

        pub async fn close(mut self) {
            if let Err(e) = self.browser.close().await {
                log::warn!("Couldn't close browser: {e}");
            }
            self.handler.abort();
        }

        async fn load(&self, url: &str) -> Result<String, RenderError> {
            let navigation = |e: chromiumoxide::error::CdpError| RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            };

            let page = self.browser.new_page(url).await.map_err(navigation)?;
            page.wait_for_navigation().await.map_err(navigation)?;
            sleep(Duration::from_millis(self.config.settle_delay_ms)).await;

            if self.dismiss_consent(&page).await {
                sleep(Duration::from_millis(self.config.settle_delay_ms / 2)).await;
            }

            let content = page.content().await.map_err(navigation);
            if let Err(e) = page.close().await {
                log::debug!("Couldn't close page {url}: {e}");
            }
            content
        }

        async fn dismiss_consent(&self, page: &Page) -> bool {
            if self.config.consent_labels.is_empty() {
                return false;
            }
            let labels = match serde_json::to_string(&self.config.consent_labels) {
                Ok(labels) => labels,
                Err(_) => return false,
            };
            let script = format!(
                r#"(() => {{
                    const labels = {labels}.map(l => l.trim().toLowerCase());
                    const buttons = document.querySelectorAll('button, a, [role="button"]');
                    for (const b of buttons) {{
                        const text = (b.innerText || '').trim().toLowerCase();
                        if (labels.includes(text)) {{ b.click(); return true; }}
                    }}
                    return false;
                }})()"#
            );
            match page.evaluate(script).await {
                Ok(result) => result.into_value::<bool>().unwrap_or(false),
                Err(e) => {
                    log::debug!("Consent dismissal failed: {e}");
                    false
                }
            }
        }
    }

    #[async_trait]
    impl Renderer for ChromiumRenderer {
        async fn render(&self, url: &str) -> Result<String, RenderError> {
            timeout(self.timeout, self.load(url))
                .await
                .map_err(|_| RenderError::Timeout {
                    url: url.to_string(),
                    secs: self.timeout.as_secs_f32(),
                })?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_from_empty_yaml() {
        let conf: RenderConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(conf, RenderConfig::default());
        assert_eq!(conf.settle_delay_ms, 1_500);
    }
}
