//! Background cache warming, TTL retuning and connection reporting.
//!
//! Three independent timers run off the caller's request path. All of
//! their work is best-effort: the facade operations they call never fail,
//! and nothing here is allowed to surface an error to the UI.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};

use crate::cache::TieredCache;
use crate::fetcher::adaptive::{ConnectionMetrics, ConnectionQuality};
use crate::service::NewsService;

/// Warmup prefetch is pointless on a network this unreliable.
pub const MIN_WARMUP_SUCCESS_RATE: f64 = 70.0;

/// TTL bands: a poor connection caches longer to reduce load, a good one
/// caches shorter for freshness.
pub const GOOD_TTL: Duration = Duration::from_secs(120);
pub const FAIR_TTL: Duration = Duration::from_secs(300);
pub const POOR_TTL: Duration = Duration::from_secs(900);

#[derive(Debug, Clone)]
pub struct PrefetchConfig {
    pub warmup_delay: Duration,
    pub retune_interval: Duration,
    pub report_interval: Duration,
    pub default_category_id: u64,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            warmup_delay: Duration::from_secs(5),
            retune_interval: Duration::from_secs(60),
            report_interval: Duration::from_secs(30),
            default_category_id: 4,
        }
    }
}

pub fn ttl_for(quality: ConnectionQuality) -> Duration {
    match quality {
        ConnectionQuality::Good => GOOD_TTL,
        ConnectionQuality::Fair => FAIR_TTL,
        ConnectionQuality::Poor => POOR_TTL,
    }
}

/// Holds the three timer tasks; they are cancelled as a unit on
/// [`shutdown`](Self::shutdown) or drop, so tests never leak timers.
pub struct PrefetchScheduler {
    handles: Vec<JoinHandle<()>>,
}

impl PrefetchScheduler {
    pub fn start(
        service: Arc<NewsService>,
        cache: Arc<TieredCache>,
        metrics: Arc<ConnectionMetrics>,
        config: PrefetchConfig,
    ) -> Self {
        let mut handles = Vec::with_capacity(3);

        // One-shot warmup of the pages a user is most likely to open first.
        {
            let service = Arc::clone(&service);
            let metrics = Arc::clone(&metrics);
            let delay = config.warmup_delay;
            let category_id = config.default_category_id;
            handles.push(tokio::spawn(async move {
                sleep(delay).await;
                let rate = metrics.success_rate_percent();
                if rate < MIN_WARMUP_SUCCESS_RATE {
                    tracing::debug!(rate, "skipping warmup prefetch");
                    return;
                }
                tracing::debug!("warming cache with likely-next pages");
                service.latest_news(1).await;
                service.posts_by_category(category_id, 1).await;
            }));
        }

        // Periodic TTL retune by connection quality, then purge.
        {
            let cache = Arc::clone(&cache);
            let metrics = Arc::clone(&metrics);
            let period = config.retune_interval;
            handles.push(tokio::spawn(async move {
                let mut timer = interval(period);
                timer.tick().await; // skip the immediate tick
                loop {
                    timer.tick().await;
                    let quality = metrics.quality();
                    let ttl = ttl_for(quality);
                    cache.set_ttl(ttl);
                    let purged = cache.purge_expired();
                    tracing::debug!(
                        %quality,
                        ttl_secs = ttl.as_secs(),
                        purged,
                        "cache retuned"
                    );
                }
            }));
        }

        // Observability tick; no functional effect.
        {
            let period = config.report_interval;
            handles.push(tokio::spawn(async move {
                let mut timer = interval(period);
                timer.tick().await;
                loop {
                    timer.tick().await;
                    tracing::info!(
                        quality = %metrics.quality(),
                        avg_ms = metrics.avg_response_time_ms(),
                        success_rate = metrics.success_rate_percent(),
                        "connection status"
                    );
                }
            }));
        }

        Self { handles }
    }

    /// Cancel all three timers as a unit.
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for PrefetchScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
