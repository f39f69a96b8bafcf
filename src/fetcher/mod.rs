pub mod adaptive;
pub mod coordinator;
pub mod http_transport;

use async_trait::async_trait;

use crate::app::Result;

/// Raw response from the content API, before JSON decoding.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Collection endpoints advertise their total page count in the
    /// `X-WP-TotalPages` response header.
    pub total_pages: Option<u32>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<ApiResponse>;
}

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{ApiResponse, Transport};
    use crate::app::{GazetteError, Result};

    /// Scripted reply for one matched request.
    #[derive(Debug, Clone)]
    pub enum Reply {
        /// 200 with the given JSON body and a total-pages header of 1.
        Json(String),
        /// 200 with the given JSON body and an explicit total-pages header.
        Pages(String, u32),
        /// Empty body with the given HTTP status.
        Status(u16),
        /// Transport-level failure.
        Error(String),
        /// Never responds; lets the adaptive timeout win the race.
        Hang,
    }

    /// In-memory [`Transport`] with per-URL-fragment reply queues.
    ///
    /// Replies for a fragment are consumed in order; the last one repeats.
    pub struct MockTransport {
        rules: Mutex<Vec<(String, VecDeque<Reply>)>>,
        requests: Mutex<Vec<String>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                rules: Mutex::new(Vec::new()),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        /// Delay every reply, so concurrent callers overlap in flight.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn on(self, fragment: &str, replies: Vec<Reply>) -> Self {
            self.rules
                .lock()
                .unwrap()
                .push((fragment.to_string(), replies.into()));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn next_reply(&self, url: &str) -> Option<Reply> {
            let mut rules = self.rules.lock().unwrap();
            let (_, queue) = rules.iter_mut().find(|(frag, _)| url.contains(frag))?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn get(&self, url: &str) -> Result<ApiResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(url.to_string());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match self.next_reply(url) {
                Some(Reply::Json(body)) => Ok(ApiResponse {
                    status: 200,
                    body: body.into_bytes(),
                    total_pages: Some(1),
                }),
                Some(Reply::Pages(body, total)) => Ok(ApiResponse {
                    status: 200,
                    body: body.into_bytes(),
                    total_pages: Some(total),
                }),
                Some(Reply::Status(status)) => Ok(ApiResponse {
                    status,
                    body: Vec::new(),
                    total_pages: None,
                }),
                Some(Reply::Error(msg)) => Err(GazetteError::Network(msg)),
                Some(Reply::Hang) => {
                    futures::future::pending::<()>().await;
                    unreachable!()
                }
                None => Err(GazetteError::Network(format!("no mock rule for {url}"))),
            }
        }
    }
}
