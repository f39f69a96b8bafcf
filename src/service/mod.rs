//! The exported fetch surface.
//!
//! `NewsService` is the only API the presentation layer touches. Every
//! operation degrades to its documented empty shape instead of returning
//! an error; when the network fails and an expired page is still in the
//! cache, stale content is preferred over nothing.

use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use url::Url;

use crate::app::Result;
use crate::cache::{Priority, TieredCache};
use crate::config::GazetteConfig;
use crate::domain::raw::RemoteCategory;
use crate::domain::{category_by_id, Article, ArticlePage, LATEST_CATEGORY_ID};
use crate::fetcher::adaptive::ConnectionMetrics;
use crate::fetcher::coordinator::ApiClient;
use crate::normalizer::Normalizer;

pub const MIN_SEARCH_LEN: usize = 3;
const FEATURED_SOURCE: &str = "Gazette Newsroom";

pub struct NewsService {
    config: Arc<GazetteConfig>,
    client: Arc<ApiClient>,
    cache: Arc<TieredCache>,
    metrics: Arc<ConnectionMetrics>,
    normalizer: Normalizer,
}

/// Diagnostic snapshot for the `--stats` flag and the observability tick.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub cache_hits: u64,
    pub timeouts: u64,
    pub retries: u64,
    pub avg_response_time_ms: f64,
    pub cache_hit_rate_percent: f64,
    pub connection_quality: String,
    pub cache_size: usize,
}

impl NewsService {
    pub fn new(
        config: Arc<GazetteConfig>,
        client: Arc<ApiClient>,
        cache: Arc<TieredCache>,
        metrics: Arc<ConnectionMetrics>,
    ) -> Self {
        let normalizer = Normalizer::new(Arc::clone(&cache));
        Self {
            config,
            client,
            cache,
            metrics,
            normalizer,
        }
    }

    /// Page `page` of the unfiltered stream, newest first.
    pub async fn latest_news(&self, page: u32) -> ArticlePage {
        self.page_query(page, None, None).await
    }

    /// The most recent posts, annotated with the fixed source descriptor.
    pub async fn featured_news(&self) -> Vec<Article> {
        let url = match self.posts_url(1, self.config.featured_count, None, None) {
            Ok(url) => url,
            Err(err) => {
                tracing::error!(error = %err, "could not build featured url");
                return Vec::new();
            }
        };

        let page = self.cached_fetch(&url, 1, Priority::Normal).await;
        page.posts
            .into_iter()
            .map(|mut article| {
                article.source = Some(FEATURED_SOURCE.to_string());
                article
            })
            .collect()
    }

    /// Posts filtered by a mapped category. Id 1 and unmapped ids take the
    /// latest-news path; otherwise the category slug is resolved to the
    /// API's own taxonomy id (cached) before querying.
    pub async fn posts_by_category(&self, category_id: u64, page: u32) -> ArticlePage {
        let slug = match category_by_id(category_id) {
            Some(category) if category.id != LATEST_CATEGORY_ID => category.slug,
            _ => return self.latest_news(page).await,
        };

        match self.resolve_remote_category(slug).await {
            Some(remote_id) => self.page_query(page, None, Some(remote_id)).await,
            None => self.latest_news(page).await,
        }
    }

    /// Full-text search. Queries shorter than three characters return the
    /// empty shape without touching the network.
    pub async fn search_posts(&self, query: &str, page: u32) -> ArticlePage {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            tracing::debug!(query, "search below minimum length");
            return ArticlePage::empty();
        }
        self.page_query(page, Some(query), None).await
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.metrics.total_requests(),
            cache_hits: self.cache.hit_count(),
            timeouts: self.metrics.timeout_count(),
            retries: self.client.retry_count(),
            avg_response_time_ms: self.metrics.avg_response_time_ms(),
            cache_hit_rate_percent: self.cache.hit_rate_percent(),
            connection_quality: self.metrics.quality().to_string(),
            cache_size: self.cache.len(),
        }
    }

    async fn page_query(
        &self,
        page: u32,
        search: Option<&str>,
        remote_category: Option<u64>,
    ) -> ArticlePage {
        let url = match self.posts_url(page, self.config.page_size, search, remote_category) {
            Ok(url) => url,
            Err(err) => {
                tracing::error!(error = %err, "could not build posts url");
                return ArticlePage::empty();
            }
        };

        // Front pages are what users reopen the app to; mirror them.
        let priority = if page == 1 {
            Priority::High
        } else {
            Priority::Normal
        };
        self.cached_fetch(&url, page, priority).await
    }

    async fn cached_fetch(&self, url: &Url, page: u32, priority: Priority) -> ArticlePage {
        let key = request_key(url.as_str());
        if let Some(hit) = self.cache.get_page(&key) {
            return (*hit).clone();
        }

        match self.client.fetch_json(url.as_str()).await {
            Ok(api_page) => {
                let posts = self.normalizer.normalize_page(&api_page.body);
                let result = ArticlePage {
                    posts,
                    total_pages: api_page.total_pages,
                    has_more: page < api_page.total_pages,
                };
                self.cache.put_page(&key, Arc::new(result.clone()), priority);
                result
            }
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "fetch failed");
                if let Some(stale) = self.cache.get_stale_page(&key) {
                    tracing::info!(url = %url, "serving stale cache entry");
                    return (*stale).clone();
                }
                ArticlePage::empty()
            }
        }
    }

    async fn resolve_remote_category(&self, slug: &str) -> Option<u64> {
        let key = format!("slug:{slug}");
        if let Some(cached) = self.cache.get_category(&key) {
            return cached.parse().ok();
        }

        let url = match self.categories_url(slug) {
            Ok(url) => url,
            Err(err) => {
                tracing::error!(error = %err, "could not build categories url");
                return None;
            }
        };

        match self.client.fetch_json(url.as_str()).await {
            Ok(page) => {
                let terms: Vec<RemoteCategory> =
                    serde_json::from_value(page.body.clone()).unwrap_or_default();
                let id = terms.first().map(|t| t.id)?;
                self.cache.put_category(&key, id.to_string(), Priority::High);
                Some(id)
            }
            Err(err) => {
                tracing::warn!(slug, error = %err, "category resolution failed");
                None
            }
        }
    }

    fn posts_url(
        &self,
        page: u32,
        per_page: u32,
        search: Option<&str>,
        remote_category: Option<u64>,
    ) -> Result<Url> {
        let mut url = self.endpoint("posts")?;
        url.query_pairs_mut()
            .append_pair("_embed", "true")
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("orderby", "date")
            .append_pair("order", "desc");
        if let Some(query) = search {
            url.query_pairs_mut().append_pair("search", query);
        }
        if let Some(id) = remote_category {
            url.query_pairs_mut().append_pair("categories", &id.to_string());
        }
        Ok(url)
    }

    fn categories_url(&self, slug: &str) -> Result<Url> {
        let mut url = self.endpoint("categories")?;
        url.query_pairs_mut().append_pair("slug", slug);
        Ok(url)
    }

    fn endpoint(&self, resource: &str) -> Result<Url> {
        let base = self.config.api_base_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{resource}"))?)
    }
}

/// Deterministic cache/dedup key for a request URL.
pub(crate) fn request_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
