use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::app::error::{GazetteError, Result};
use crate::cache::{CacheEvent, TieredCache};
use crate::config::GazetteConfig;
use crate::fetcher::adaptive::ConnectionMetrics;
use crate::fetcher::coordinator::ApiClient;
use crate::fetcher::http_transport::HttpTransport;
use crate::fetcher::Transport;
use crate::prefetch::{PrefetchConfig, PrefetchScheduler};
use crate::service::NewsService;
use crate::store::{KeyValueStore, SqliteKeyStore};

/// Wires every component together once at process start.
///
/// Connection metrics and the cache tiers live here for the process
/// lifetime and are shared by the client, the facade and the prefetcher;
/// tests construct a fresh context per case instead of reaching for any
/// global state.
pub struct AppContext {
    pub config: Arc<GazetteConfig>,
    pub metrics: Arc<ConnectionMetrics>,
    pub cache: Arc<TieredCache>,
    pub client: Arc<ApiClient>,
    pub service: Arc<NewsService>,
}

impl AppContext {
    pub fn new(config: GazetteConfig) -> Result<Self> {
        let db_path = match &config.db_path {
            Some(path) => path.clone(),
            None => Self::default_db_path()?,
        };
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyStore::new(&db_path)?);
        Ok(Self::assemble(
            config,
            Arc::new(HttpTransport::new()),
            Some(store),
        ))
    }

    /// Context over an in-memory mirror store, for tests and ephemeral runs.
    pub fn in_memory(config: GazetteConfig) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyStore::in_memory()?);
        Ok(Self::assemble(
            config,
            Arc::new(HttpTransport::new()),
            Some(store),
        ))
    }

    /// Context with an injected transport and optional mirror store.
    pub fn with_transport(
        config: GazetteConfig,
        transport: Arc<dyn Transport>,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> Self {
        Self::assemble(config, transport, store)
    }

    fn assemble(
        config: GazetteConfig,
        transport: Arc<dyn Transport>,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> Self {
        let config = Arc::new(config);
        let metrics = Arc::new(ConnectionMetrics::new());

        let cache = Arc::new(TieredCache::with_settings(
            store,
            config.cache.general_capacity,
            config.cache.image_capacity,
            config.cache.category_capacity,
        ));
        cache.set_ttl(Duration::from_secs(config.cache.ttl_secs));
        cache.subscribe(|event| match event {
            CacheEvent::Evicted { tier, count } => {
                tracing::debug!(tier = tier.as_str(), count, "cache eviction");
            }
            CacheEvent::Purged { removed } => {
                tracing::debug!(removed, "expired cache entries purged");
            }
            CacheEvent::TtlChanged { ttl } => {
                tracing::debug!(ttl_secs = ttl.as_secs(), "cache ttl changed");
            }
        });

        let client = Arc::new(ApiClient::new(transport, Arc::clone(&metrics)));
        let service = Arc::new(NewsService::new(
            Arc::clone(&config),
            Arc::clone(&client),
            Arc::clone(&cache),
            Arc::clone(&metrics),
        ));

        Self {
            config,
            metrics,
            cache,
            client,
            service,
        }
    }

    /// Restore mirrored cache entries; call once at startup.
    pub async fn hydrate_cache(&self) -> usize {
        self.cache.hydrate().await
    }

    /// Start the background prefetcher configured from settings.
    pub fn start_prefetch(&self) -> PrefetchScheduler {
        let settings = &self.config.prefetch;
        PrefetchScheduler::start(
            Arc::clone(&self.service),
            Arc::clone(&self.cache),
            Arc::clone(&self.metrics),
            PrefetchConfig {
                warmup_delay: Duration::from_secs(settings.initial_delay_secs),
                retune_interval: Duration::from_secs(settings.retune_interval_secs),
                report_interval: Duration::from_secs(settings.report_interval_secs),
                default_category_id: settings.default_category_id,
            },
        )
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| GazetteError::Config("Could not find data directory".into()))?;
        let gazette_dir = data_dir.join("gazette");
        std::fs::create_dir_all(&gazette_dir)?;
        Ok(gazette_dir.join("gazette.db"))
    }
}
