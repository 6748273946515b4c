use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::config::{secs, Throttle};

/// Politeness control between two requests sent to the crawled site.
///
/// Requests are issued one at a time, so a pause after each request is enough to bound
/// the request rate.
#[derive(Debug, Clone)]
pub struct Limiter {
    throttle: Option<Throttle>,
    last_request: Option<Instant>,
}

impl Limiter {
    pub fn new(throttle: Option<Throttle>) -> Self {
        Self {
            throttle,
            last_request: None,
        }
    }

    pub fn started(&mut self) {
        self.last_request = Some(Instant::now());
    }

    pub fn pending_wait(&self) -> Duration {
        match self.throttle {
            None => Duration::ZERO,
            Some(Throttle::Delay(delay)) => secs(delay),
            Some(Throttle::PerSecond(n)) => {
                let per_second = u32::try_from(n.get()).unwrap_or(u32::MAX);
                let interval = Duration::from_secs(1) / per_second;
                let elapsed = self
                    .last_request
                    .map(|started| started.elapsed())
                    .unwrap_or_default();
                interval.saturating_sub(elapsed)
            }
        }
    }

    pub async fn pause(&mut self) {
        let wait = self.pending_wait();
        if !wait.is_zero() {
            log::trace!("Throttling for {wait:?}");
            sleep(wait).await;
        }
    }
}
