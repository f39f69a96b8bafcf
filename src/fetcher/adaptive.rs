//! Connection-quality tracking and adaptive timeout selection.
//!
//! Timeouts are picked per attempt from three fixed bands, so a good
//! network keeps perceived latency low while a degraded one is not failed
//! prematurely. No platform network-quality API is consulted; the bands
//! are derived purely from observed latencies and outcomes.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

pub const FAST_TIMEOUT_MS: u64 = 3_000;
pub const NORMAL_TIMEOUT_MS: u64 = 8_000;
pub const SLOW_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionQuality {
    Good,
    Fair,
    Poor,
}

impl fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionQuality::Good => write!(f, "good"),
            ConnectionQuality::Fair => write!(f, "fair"),
            ConnectionQuality::Poor => write!(f, "poor"),
        }
    }
}

/// Timeout band for the next request. Pure function of the rolling metrics.
pub fn timeout_for(avg_response_ms: f64, success_rate_percent: f64) -> u64 {
    if avg_response_ms < 2_000.0 && success_rate_percent > 95.0 {
        FAST_TIMEOUT_MS
    } else if avg_response_ms < 5_000.0 && success_rate_percent > 85.0 {
        NORMAL_TIMEOUT_MS
    } else {
        SLOW_TIMEOUT_MS
    }
}

/// Quality classification over the same bands as [`timeout_for`].
pub fn quality_for(avg_response_ms: f64, success_rate_percent: f64) -> ConnectionQuality {
    if avg_response_ms < 2_000.0 && success_rate_percent > 95.0 {
        ConnectionQuality::Good
    } else if avg_response_ms < 5_000.0 && success_rate_percent > 85.0 {
        ConnectionQuality::Fair
    } else {
        ConnectionQuality::Poor
    }
}

#[derive(Debug, Default)]
struct MetricsInner {
    avg_response_time_ms: f64,
    success_count: u64,
    total_requests: u64,
    timeout_count: u64,
    current_timeout_ms: u64,
}

impl MetricsInner {
    fn success_rate_percent(&self) -> f64 {
        if self.total_requests == 0 {
            // Optimistic cold start: first request gets the fast band.
            100.0
        } else {
            self.success_count as f64 * 100.0 / self.total_requests as f64
        }
    }
}

/// Rolling connection metrics. One instance lives for the whole process
/// and is shared by the coordinator, the prefetcher and the facade.
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    inner: Mutex<MetricsInner>,
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed attempt. The average uses 0.5-weighted
    /// exponential smoothing: `(old + latency) / 2`.
    pub fn record_outcome(&self, latency_ms: u64, success: bool, timed_out: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.avg_response_time_ms = (inner.avg_response_time_ms + latency_ms as f64) / 2.0;
        inner.total_requests += 1;
        if success {
            inner.success_count += 1;
        }
        if timed_out {
            inner.timeout_count += 1;
        }
    }

    /// Deadline for the next network attempt. Re-derived on every call,
    /// never cached across requests.
    pub fn next_timeout(&self) -> Duration {
        let mut inner = self.inner.lock().unwrap();
        let ms = timeout_for(inner.avg_response_time_ms, inner.success_rate_percent());
        inner.current_timeout_ms = ms;
        Duration::from_millis(ms)
    }

    pub fn quality(&self) -> ConnectionQuality {
        let inner = self.inner.lock().unwrap();
        quality_for(inner.avg_response_time_ms, inner.success_rate_percent())
    }

    pub fn avg_response_time_ms(&self) -> f64 {
        self.inner.lock().unwrap().avg_response_time_ms
    }

    pub fn success_rate_percent(&self) -> f64 {
        self.inner.lock().unwrap().success_rate_percent()
    }

    pub fn total_requests(&self) -> u64 {
        self.inner.lock().unwrap().total_requests
    }

    pub fn timeout_count(&self) -> u64 {
        self.inner.lock().unwrap().timeout_count
    }

    /// Last timeout handed out by [`next_timeout`], for diagnostics.
    pub fn current_timeout_ms(&self) -> u64 {
        self.inner.lock().unwrap().current_timeout_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_banding() {
        assert_eq!(timeout_for(1_500.0, 97.0), FAST_TIMEOUT_MS);
        assert_eq!(timeout_for(3_000.0, 90.0), NORMAL_TIMEOUT_MS);
        assert_eq!(timeout_for(6_000.0, 60.0), SLOW_TIMEOUT_MS);
        // High success rate alone does not earn the fast band.
        assert_eq!(timeout_for(2_500.0, 99.0), NORMAL_TIMEOUT_MS);
    }

    #[test]
    fn test_quality_banding() {
        assert_eq!(quality_for(1_000.0, 100.0), ConnectionQuality::Good);
        assert_eq!(quality_for(4_000.0, 90.0), ConnectionQuality::Fair);
        assert_eq!(quality_for(9_000.0, 50.0), ConnectionQuality::Poor);
    }

    #[test]
    fn test_cold_start_gets_fast_band() {
        let metrics = ConnectionMetrics::new();
        assert_eq!(metrics.success_rate_percent(), 100.0);
        assert_eq!(metrics.next_timeout(), Duration::from_millis(FAST_TIMEOUT_MS));
        assert_eq!(metrics.current_timeout_ms(), FAST_TIMEOUT_MS);
    }

    #[test]
    fn test_exponential_smoothing() {
        let metrics = ConnectionMetrics::new();
        metrics.record_outcome(1_000, true, false);
        assert_eq!(metrics.avg_response_time_ms(), 500.0);
        metrics.record_outcome(2_000, true, false);
        assert_eq!(metrics.avg_response_time_ms(), 1_250.0);
    }

    #[test]
    fn test_success_rate_and_timeout_count() {
        let metrics = ConnectionMetrics::new();
        metrics.record_outcome(100, true, false);
        metrics.record_outcome(3_000, false, true);
        metrics.record_outcome(100, true, false);
        metrics.record_outcome(100, false, false);

        assert_eq!(metrics.total_requests(), 4);
        assert_eq!(metrics.timeout_count(), 1);
        assert_eq!(metrics.success_rate_percent(), 50.0);
    }

    #[test]
    fn test_degraded_network_selects_slow_band() {
        let metrics = ConnectionMetrics::new();
        for _ in 0..4 {
            metrics.record_outcome(8_000, false, true);
        }
        assert_eq!(metrics.next_timeout(), Duration::from_millis(SLOW_TIMEOUT_MS));
        assert_eq!(metrics.quality(), ConnectionQuality::Poor);
    }
}
