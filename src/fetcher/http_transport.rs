use async_trait::async_trait;
use reqwest::Client;

use crate::app::Result;
use crate::fetcher::{ApiResponse, Transport};

const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// The client carries no fixed request timeout; deadlines are raced
    /// per attempt by the coordinator using the adaptive estimator.
    pub fn new() -> Self {
        let client = Client::builder()
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("gazette/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<ApiResponse> {
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let total_pages = response
            .headers()
            .get(TOTAL_PAGES_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        let body = response.bytes().await?.to_vec();

        Ok(ApiResponse {
            status,
            body,
            total_pages,
        })
    }
}
