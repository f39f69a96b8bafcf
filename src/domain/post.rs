use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flat view model produced by the normalizer.
///
/// This is the only post shape the presentation layer may depend on;
/// everything API-specific stays in [`crate::domain::raw`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: u64,
    pub headline: String,
    /// Stripped, bounded summary for list views.
    pub excerpt: String,
    /// Full plain-text body for detail views.
    pub content: String,
    pub category: String,
    pub image_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub read_time_minutes: u32,
    pub slug: String,
    pub link: String,
    pub author: String,
    /// Fixed source descriptor, set on featured posts only.
    pub source: Option<String>,
}

impl Article {
    pub fn display_headline(&self) -> &str {
        if self.headline.is_empty() {
            "(Untitled)"
        } else {
            &self.headline
        }
    }
}

/// One page of results as returned by every list-shaped facade operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticlePage {
    pub posts: Vec<Article>,
    pub total_pages: u32,
    pub has_more: bool,
}

impl ArticlePage {
    /// The documented empty shape substituted on irrecoverable failure.
    pub fn empty() -> Self {
        Self::default()
    }
}
