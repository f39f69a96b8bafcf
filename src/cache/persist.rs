//! Best-effort mirroring of hot cache entries to the key-value store.
//!
//! Mirror writes run on a detached task and every storage failure is
//! swallowed with a debug log; nothing on this path may surface to the
//! caller. Mirrored entries outlive a restart until twice the current TTL
//! has lapsed, after which hydration discards them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::cache::{Priority, TierKind, TieredCache};
use crate::domain::ArticlePage;

const KEY_PREFIX: &str = "cache:";

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    value: serde_json::Value,
    priority: Priority,
    stored_at_ms: i64,
}

impl TieredCache {
    pub(crate) fn mirror<T: Serialize>(
        &self,
        tier: TierKind,
        key: &str,
        value: &T,
        priority: Priority,
    ) {
        let Some(store) = self.store.clone() else {
            return;
        };
        // Outside a runtime (synchronous unit tests) mirroring is skipped.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(key, error = %err, "cache mirror serialize failed");
                return;
            }
        };
        let entry = PersistedEntry {
            value,
            priority,
            stored_at_ms: Utc::now().timestamp_millis(),
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(key, error = %err, "cache mirror serialize failed");
                return;
            }
        };

        let store_key = format!("{KEY_PREFIX}{}:{key}", tier.as_str());
        handle.spawn(async move {
            if let Err(err) = store.set(&store_key, &payload).await {
                tracing::debug!(key = %store_key, error = %err, "cache mirror write failed");
            }
        });
    }

    /// Restore mirrored entries from the key-value store.
    ///
    /// Records older than twice the current TTL are deleted instead of
    /// restored; the rest are inserted with a back-dated timestamp so the
    /// normal read-time expiry keeps applying. Returns the restored count.
    pub async fn hydrate(&self) -> usize {
        let Some(store) = self.store.clone() else {
            return 0;
        };

        let keys = match store.list_keys().await {
            Ok(keys) => keys,
            Err(err) => {
                tracing::debug!(error = %err, "cache hydration skipped");
                return 0;
            }
        };

        let max_age = self.ttl() * 2;
        let mut restored = 0;

        for store_key in keys.iter().filter(|k| k.starts_with(KEY_PREFIX)) {
            let Some((tier, cache_key)) = split_store_key(store_key) else {
                continue;
            };

            let payload = match store.get(store_key).await {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(err) => {
                    tracing::debug!(key = %store_key, error = %err, "mirror read failed");
                    continue;
                }
            };

            let entry: PersistedEntry = match serde_json::from_str(&payload) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(key = %store_key, error = %err, "dropping corrupt mirror entry");
                    let _ = store.remove(store_key).await;
                    continue;
                }
            };

            let age_ms = (Utc::now().timestamp_millis() - entry.stored_at_ms).max(0) as u64;
            let age = Duration::from_millis(age_ms);
            if age >= max_age {
                let _ = store.remove(store_key).await;
                continue;
            }

            let created_at = Instant::now().checked_sub(age).unwrap_or_else(Instant::now);
            match tier {
                TierKind::General => {
                    if let Ok(page) = serde_json::from_value::<ArticlePage>(entry.value) {
                        self.restore_page(cache_key, Arc::new(page), entry.priority, created_at);
                        restored += 1;
                    }
                }
                TierKind::Image => {
                    if let Ok(url) = serde_json::from_value::<String>(entry.value) {
                        self.restore_image(cache_key, url, entry.priority, created_at);
                        restored += 1;
                    }
                }
                TierKind::Category => {
                    if let Ok(name) = serde_json::from_value::<String>(entry.value) {
                        self.restore_category(cache_key, name, entry.priority, created_at);
                        restored += 1;
                    }
                }
            }
        }

        if restored > 0 {
            tracing::info!(restored, "cache hydrated from storage");
        }
        restored
    }
}

fn split_store_key(store_key: &str) -> Option<(TierKind, &str)> {
    let rest = store_key.strip_prefix(KEY_PREFIX)?;
    let (tier, cache_key) = rest.split_once(':')?;
    let tier = match tier {
        "general" => TierKind::General,
        "image" => TierKind::Image,
        "category" => TierKind::Category,
        _ => return None,
    };
    Some((tier, cache_key))
}
