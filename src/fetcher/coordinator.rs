//! Deduplicated fetch execution against the content API.
//!
//! Identical concurrent requests share one in-flight future; every attempt
//! races the transport against the adaptive deadline and feeds the outcome
//! back into the connection metrics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::app::{GazetteError, Result};
use crate::fetcher::adaptive::ConnectionMetrics;
use crate::fetcher::Transport;

const MAX_RETRIES: u32 = 2;
const BACKOFF_BASE_MS: u64 = 1_000;

/// Decoded JSON page plus pagination metadata.
#[derive(Debug)]
pub struct ApiPage {
    pub body: serde_json::Value,
    pub total_pages: u32,
}

type SharedResult = std::result::Result<Arc<ApiPage>, Arc<GazetteError>>;
type SharedFetch = Shared<BoxFuture<'static, SharedResult>>;

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    metrics: Arc<ConnectionMetrics>,
    in_flight: Arc<Mutex<HashMap<String, SharedFetch>>>,
    retry_count: Arc<AtomicU64>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, metrics: Arc<ConnectionMetrics>) -> Self {
        Self {
            transport,
            metrics,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            retry_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fetch and decode one API URL.
    ///
    /// The full URL doubles as the dedup key: a caller arriving while an
    /// identical request is in flight awaits the same future instead of
    /// issuing a duplicate network call. The pool entry is removed when
    /// the request settles, success or failure.
    pub async fn fetch_json(&self, url: &str) -> Result<Arc<ApiPage>> {
        let fetch = {
            let mut pool = self.in_flight.lock().unwrap();
            match pool.get(url) {
                Some(pending) => {
                    tracing::debug!(url, "joining in-flight request");
                    pending.clone()
                }
                None => {
                    let fetch = self.start_fetch(url.to_string());
                    pool.insert(url.to_string(), fetch.clone());
                    fetch
                }
            }
        };

        fetch.await.map_err(|err| clone_terminal(&err))
    }

    /// Retry attempts performed since startup, for diagnostics.
    pub fn retry_count(&self) -> u64 {
        self.retry_count.load(Ordering::Relaxed)
    }

    fn start_fetch(&self, url: String) -> SharedFetch {
        let transport = Arc::clone(&self.transport);
        let metrics = Arc::clone(&self.metrics);
        let retry_count = Arc::clone(&self.retry_count);
        let pool = Arc::clone(&self.in_flight);

        async move {
            let result = fetch_with_retry(transport.as_ref(), &metrics, &retry_count, &url).await;
            pool.lock().unwrap().remove(&url);
            result.map(Arc::new).map_err(Arc::new)
        }
        .boxed()
        .shared()
    }
}

/// Joiners of a deduplicated request receive the error behind an `Arc`;
/// rebuild an owned terminal error for the caller.
fn clone_terminal(err: &GazetteError) -> GazetteError {
    match err {
        GazetteError::Timeout(ms) => GazetteError::Timeout(*ms),
        GazetteError::Decode(msg) => GazetteError::Decode(msg.clone()),
        GazetteError::Network(msg) => GazetteError::Network(msg.clone()),
        other => GazetteError::Network(other.to_string()),
    }
}

async fn fetch_with_retry(
    transport: &dyn Transport,
    metrics: &ConnectionMetrics,
    retry_count: &AtomicU64,
    url: &str,
) -> Result<ApiPage> {
    let mut last_err = GazetteError::Network(format!("no attempt made for {url}"));

    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let delay_ms = BACKOFF_BASE_MS << (attempt - 1);
            tracing::debug!(url, attempt, delay_ms, "retrying after backoff");
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            retry_count.fetch_add(1, Ordering::Relaxed);
        }

        match fetch_once(transport, metrics, url).await {
            Ok(page) => return Ok(page),
            // A body that decoded wrong will decode wrong again.
            Err(err @ GazetteError::Decode(_)) => return Err(err),
            Err(err) => {
                tracing::warn!(url, attempt, error = %err, "fetch attempt failed");
                last_err = err;
            }
        }
    }

    Err(last_err)
}

async fn fetch_once(
    transport: &dyn Transport,
    metrics: &ConnectionMetrics,
    url: &str,
) -> Result<ApiPage> {
    let deadline = metrics.next_timeout();
    let started = tokio::time::Instant::now();

    let response = match tokio::time::timeout(deadline, transport.get(url)).await {
        Ok(response) => response,
        Err(_) => {
            let timeout_ms = deadline.as_millis() as u64;
            metrics.record_outcome(timeout_ms, false, true);
            return Err(GazetteError::Timeout(timeout_ms));
        }
    };
    let latency_ms = started.elapsed().as_millis() as u64;

    let response = match response {
        Ok(response) => response,
        Err(err) => {
            metrics.record_outcome(latency_ms, false, false);
            return Err(GazetteError::Network(err.to_string()));
        }
    };

    if !(200..300).contains(&response.status) {
        metrics.record_outcome(latency_ms, false, false);
        return Err(GazetteError::Network(format!(
            "HTTP {} from {url}",
            response.status
        )));
    }

    metrics.record_outcome(latency_ms, true, false);

    let body = serde_json::from_slice(&response.body)
        .map_err(|err| GazetteError::Decode(err.to_string()))?;

    Ok(ApiPage {
        body,
        total_pages: response.total_pages.unwrap_or(1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::{MockTransport, Reply};

    const POSTS_URL: &str = "https://api.example.com/wp/v2/posts?per_page=6&page=1";

    fn client_for(transport: Arc<MockTransport>) -> ApiClient {
        ApiClient::new(transport, Arc::new(ConnectionMetrics::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_identical_requests_share_one_call() {
        let transport = Arc::new(
            MockTransport::new()
                .with_delay(Duration::from_millis(50))
                .on("posts", vec![Reply::Json("[]".into())]),
        );
        let client = client_for(transport.clone());

        let (a, b) = tokio::join!(client.fetch_json(POSTS_URL), client.fetch_json(POSTS_URL));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(transport.calls(), 1);

        // The pool entry is gone once settled, so the next call goes out.
        client.fetch_json(POSTS_URL).await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success_waits_out_backoff() {
        let transport = Arc::new(MockTransport::new().on(
            "posts",
            vec![
                Reply::Error("connection reset".into()),
                Reply::Error("connection reset".into()),
                Reply::Pages("[]".into(), 3),
            ],
        ));
        let client = client_for(transport.clone());

        let started = tokio::time::Instant::now();
        let page = client.fetch_json(POSTS_URL).await.unwrap();

        assert_eq!(page.total_pages, 3);
        assert_eq!(transport.calls(), 3);
        assert_eq!(client.retry_count(), 2);
        // Two backoff delays: 1 s then 2 s.
        assert!(started.elapsed() >= Duration::from_millis(3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_exhaust_retries() {
        let transport =
            Arc::new(MockTransport::new().on("posts", vec![Reply::Hang]));
        let metrics = Arc::new(ConnectionMetrics::new());
        let client = ApiClient::new(transport.clone(), metrics.clone());

        let err = client.fetch_json(POSTS_URL).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(transport.calls(), 3);
        assert_eq!(metrics.timeout_count(), 3);
        assert_eq!(metrics.total_requests(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_2xx_is_retried_then_fails() {
        let transport =
            Arc::new(MockTransport::new().on("posts", vec![Reply::Status(500)]));
        let client = client_for(transport.clone());

        let err = client.fetch_json(POSTS_URL).await.unwrap_err();

        assert!(matches!(err, GazetteError::Network(_)));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_error_is_not_retried() {
        let transport =
            Arc::new(MockTransport::new().on("posts", vec![Reply::Json("{oops".into())]));
        let client = client_for(transport.clone());

        let err = client.fetch_json(POSTS_URL).await.unwrap_err();

        assert!(matches!(err, GazetteError::Decode(_)));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_attempt_updates_metrics() {
        let transport = Arc::new(MockTransport::new().on(
            "posts",
            vec![
                Reply::Error("reset".into()),
                Reply::Json("[]".into()),
            ],
        ));
        let metrics = Arc::new(ConnectionMetrics::new());
        let client = ApiClient::new(transport, metrics.clone());

        client.fetch_json(POSTS_URL).await.unwrap();

        assert_eq!(metrics.total_requests(), 2);
        assert_eq!(metrics.success_rate_percent(), 50.0);
    }
}
