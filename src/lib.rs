//! # Gazette
//!
//! An adaptive client-side fetch-and-cache layer for a paginated news
//! content API, with a small CLI front-end.
//!
//! ## Architecture
//!
//! Gazette follows a modular pipeline architecture:
//!
//! ```text
//! Transport → ApiClient → Normalizer → TieredCache → NewsService
//! ```
//!
//! - [`fetcher`]: HTTP transport, request dedup, retry and adaptive timeouts
//! - [`normalizer`]: Converts raw API posts to flat [`Article`](domain::Article) view models
//! - [`cache`]: Tiered in-memory cache with priority-weighted eviction
//! - [`store`]: Key/value persistence backing the cache mirror
//! - [`service`]: The exported fetch operations
//!
//! ## Quick Start
//!
//! ```bash
//! # Front page
//! gazette latest
//!
//! # Featured stories
//! gazette featured
//!
//! # Technology news, second page
//! gazette category 4 --page 2
//!
//! # Search, with a diagnostics snapshot
//! gazette search "election" --stats
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: TOML configuration loading
//! - [`domain`]: Core domain models (Article, ArticlePage, categories)
//! - [`fetcher`]: Network access with dedup, retry and adaptive timeouts
//! - [`cache`]: Tiered caching and durable mirroring
//! - [`normalizer`]: Post normalization and text cleanup
//! - [`prefetch`]: Background cache warming and TTL retuning
//! - [`service`]: The facade the presentation layer consumes
//! - [`store`]: SQLite-backed key/value store

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all
/// components: metrics, cache, store, client, service.
pub mod app;

/// Tiered in-memory cache with priority-weighted eviction and a
/// best-effort durable mirror.
pub mod cache;

/// Command-line interface using clap.
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/gazette/config.toml`; a commented default file
/// is created on first run.
pub mod config;

/// Core domain models.
///
/// - [`Article`](domain::Article): the flat view model handed to the UI
/// - [`ArticlePage`](domain::ArticlePage): one page of results
/// - [`raw`](domain::raw): typed model of the API payload
pub mod domain;

/// Network access.
///
/// - [`Transport`](fetcher::Transport): async trait over the HTTP layer
/// - [`ApiClient`](fetcher::coordinator::ApiClient): dedup, adaptive
///   timeouts, retry with backoff
/// - [`ConnectionMetrics`](fetcher::adaptive::ConnectionMetrics): rolling
///   connection-quality tracking
pub mod fetcher;

/// Raw post → [`Article`](domain::Article) normalization.
pub mod normalizer;

/// Background cache warming and TTL retuning.
pub mod prefetch;

/// The exported fetch operations, the only surface the UI touches.
pub mod service;

/// SQLite key/value persistence for the cache mirror.
pub mod store;
