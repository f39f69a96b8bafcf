//! Multi-tier in-memory cache with priority-weighted eviction.
//!
//! Three independent tiers (page responses, image URLs, category names)
//! each hold up to a fixed number of entries. Expiry is computed at read
//! time against the current TTL, so a TTL retune takes effect immediately;
//! expired entries linger until the next purge pass. When a tier is full,
//! the most age-dominated fifth of its entries is dropped, scored by
//! `age_ms - priorityWeight - accessCount * 500`.

pub mod persist;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::domain::ArticlePage;
use crate::store::KeyValueStore;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

pub const GENERAL_CAPACITY: usize = 150;
pub const IMAGE_CAPACITY: usize = 300;
pub const CATEGORY_CAPACITY: usize = 60;

const ACCESS_WEIGHT: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    fn weight(self) -> i64 {
        match self {
            Priority::High => 10_000,
            Priority::Normal => 1_000,
            Priority::Low => 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierKind {
    General,
    Image,
    Category,
}

impl TierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TierKind::General => "general",
            TierKind::Image => "image",
            TierKind::Category => "category",
        }
    }
}

/// Eviction score. Age is added positively while priority and access
/// frequency are subtracted, so a sufficiently old entry outranks its own
/// priority class; the eviction pass removes the highest scores first.
/// Known quirk of the scheme, kept as is.
pub(crate) fn entry_score(age_ms: u64, priority: Priority, access_count: u64) -> i64 {
    age_ms as i64 - priority.weight() - access_count as i64 * ACCESS_WEIGHT
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    priority: Priority,
    access_count: u64,
}

struct Tier<T> {
    kind: TierKind,
    entries: HashMap<String, CacheEntry<T>>,
    capacity: usize,
}

impl<T: Clone> Tier<T> {
    fn new(kind: TierKind, capacity: usize) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
            capacity,
        }
    }

    fn get(&mut self, key: &str, ttl: Duration) -> Option<T> {
        let entry = self.entries.get_mut(key)?;
        if entry.created_at.elapsed() >= ttl {
            // Treated as absent; the purge pass removes it later.
            return None;
        }
        entry.access_count += 1;
        Some(entry.value.clone())
    }

    fn get_ignoring_ttl(&self, key: &str) -> Option<T> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert, evicting first when a new key would exceed capacity.
    /// Returns the number of entries evicted.
    fn insert(&mut self, key: String, value: T, priority: Priority, created_at: Instant) -> usize {
        let mut evicted = 0;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            evicted = self.evict();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at,
                priority,
                access_count: 1,
            },
        );
        evicted
    }

    /// Snapshot scores, then drop the worst fifth of the tier.
    fn evict(&mut self) -> usize {
        let now = Instant::now();
        let mut scored: Vec<(String, i64)> = self
            .entries
            .iter()
            .map(|(key, entry)| {
                let age_ms = now.duration_since(entry.created_at).as_millis() as u64;
                (
                    key.clone(),
                    entry_score(age_ms, entry.priority, entry.access_count),
                )
            })
            .collect();
        scored.sort_by_key(|(_, score)| std::cmp::Reverse(*score));

        let victim_count = (self.entries.len() / 5).max(1);
        for (key, _) in scored.into_iter().take(victim_count) {
            self.entries.remove(&key);
        }

        tracing::debug!(
            tier = self.kind.as_str(),
            evicted = victim_count,
            remaining = self.entries.len(),
            "tier eviction"
        );
        victim_count
    }

    fn purge_expired(&mut self, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.created_at.elapsed() < ttl);
        before - self.entries.len()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// State-change notification emitted to cache subscribers.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    Evicted { tier: TierKind, count: usize },
    Purged { removed: usize },
    TtlChanged { ttl: Duration },
}

type Listener = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

pub struct TieredCache {
    general: Mutex<Tier<Arc<ArticlePage>>>,
    images: Mutex<Tier<String>>,
    categories: Mutex<Tier<String>>,
    ttl_ms: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    store: Option<Arc<dyn KeyValueStore>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
}

impl Default for TieredCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TieredCache {
    pub fn new() -> Self {
        Self::build(None, GENERAL_CAPACITY, IMAGE_CAPACITY, CATEGORY_CAPACITY)
    }

    /// Cache that mirrors high-priority and category entries to `store`.
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self::build(
            Some(store),
            GENERAL_CAPACITY,
            IMAGE_CAPACITY,
            CATEGORY_CAPACITY,
        )
    }

    pub fn with_capacities(general: usize, image: usize, category: usize) -> Self {
        Self::build(None, general, image, category)
    }

    /// Fully configured cache; the context uses this to apply settings.
    pub fn with_settings(
        store: Option<Arc<dyn KeyValueStore>>,
        general: usize,
        image: usize,
        category: usize,
    ) -> Self {
        Self::build(store, general, image, category)
    }

    fn build(
        store: Option<Arc<dyn KeyValueStore>>,
        general: usize,
        image: usize,
        category: usize,
    ) -> Self {
        Self {
            general: Mutex::new(Tier::new(TierKind::General, general)),
            images: Mutex::new(Tier::new(TierKind::Image, image)),
            categories: Mutex::new(Tier::new(TierKind::Category, category)),
            ttl_ms: AtomicU64::new(DEFAULT_TTL.as_millis() as u64),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            store,
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms.load(Ordering::Relaxed))
    }

    /// Takes effect for all subsequent reads immediately; existing entries
    /// keep their insertion timestamps.
    pub fn set_ttl(&self, ttl: Duration) {
        self.ttl_ms.store(ttl.as_millis() as u64, Ordering::Relaxed);
        self.emit(CacheEvent::TtlChanged { ttl });
    }

    pub fn get_page(&self, key: &str) -> Option<Arc<ArticlePage>> {
        let value = self.general.lock().unwrap().get(key, self.ttl());
        self.count(value.is_some());
        value
    }

    /// TTL-ignoring read used as a last resort when the network fails.
    pub fn get_stale_page(&self, key: &str) -> Option<Arc<ArticlePage>> {
        self.general.lock().unwrap().get_ignoring_ttl(key)
    }

    pub fn put_page(&self, key: &str, page: Arc<ArticlePage>, priority: Priority) {
        let evicted =
            self.general
                .lock()
                .unwrap()
                .insert(key.to_string(), Arc::clone(&page), priority, Instant::now());
        self.after_insert(TierKind::General, evicted);
        if priority == Priority::High {
            self.mirror(TierKind::General, key, page.as_ref(), priority);
        }
    }

    pub fn get_image(&self, key: &str) -> Option<String> {
        let value = self.images.lock().unwrap().get(key, self.ttl());
        self.count(value.is_some());
        value
    }

    pub fn put_image(&self, key: &str, url: String, priority: Priority) {
        let evicted =
            self.images
                .lock()
                .unwrap()
                .insert(key.to_string(), url.clone(), priority, Instant::now());
        self.after_insert(TierKind::Image, evicted);
        if priority == Priority::High {
            self.mirror(TierKind::Image, key, &url, priority);
        }
    }

    pub fn get_category(&self, key: &str) -> Option<String> {
        let value = self.categories.lock().unwrap().get(key, self.ttl());
        self.count(value.is_some());
        value
    }

    /// Category lookups are mirrored regardless of priority; taxonomy
    /// rarely changes and is the cheapest thing to have warm on restart.
    pub fn put_category(&self, key: &str, name: String, priority: Priority) {
        let evicted =
            self.categories
                .lock()
                .unwrap()
                .insert(key.to_string(), name.clone(), priority, Instant::now());
        self.after_insert(TierKind::Category, evicted);
        self.mirror(TierKind::Category, key, &name, priority);
    }

    /// Drop every expired entry across all tiers; returns the count removed.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl();
        let removed = self.general.lock().unwrap().purge_expired(ttl)
            + self.images.lock().unwrap().purge_expired(ttl)
            + self.categories.lock().unwrap().purge_expired(ttl);
        if removed > 0 {
            self.emit(CacheEvent::Purged { removed });
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.general.lock().unwrap().len()
            + self.images.lock().unwrap().len()
            + self.categories.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn hit_rate_percent(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 * 100.0 / total as f64
        }
    }

    /// Register a listener for cache state changes. Fan-out is synchronous
    /// and carries no ordering guarantee between subscribers.
    pub fn subscribe(&self, listener: impl Fn(&CacheEvent) + Send + Sync + 'static) -> u64 {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap()
            .push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap()
            .retain(|(listener_id, _)| *listener_id != id);
    }

    fn emit(&self, event: CacheEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }

    fn after_insert(&self, tier: TierKind, evicted: usize) {
        if evicted > 0 {
            self.emit(CacheEvent::Evicted {
                tier,
                count: evicted,
            });
        }
    }

    fn count(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    // Hydration inserts restored entries with a back-dated timestamp and
    // must not re-mirror them.
    pub(crate) fn restore_page(
        &self,
        key: &str,
        page: Arc<ArticlePage>,
        priority: Priority,
        created_at: Instant,
    ) {
        self.general
            .lock()
            .unwrap()
            .insert(key.to_string(), page, priority, created_at);
    }

    pub(crate) fn restore_image(
        &self,
        key: &str,
        url: String,
        priority: Priority,
        created_at: Instant,
    ) {
        self.images
            .lock()
            .unwrap()
            .insert(key.to_string(), url, priority, created_at);
    }

    pub(crate) fn restore_category(
        &self,
        key: &str,
        name: String,
        priority: Priority,
        created_at: Instant,
    ) {
        self.categories
            .lock()
            .unwrap()
            .insert(key.to_string(), name, priority, created_at);
    }
}
