//! Raw API posts → flat [`Article`] view models.
//!
//! Every per-field resolution failure degrades to a documented fallback
//! (placeholder image, "General" category, empty text) so a single odd
//! post can never fail a page. Image and category lookups go through the
//! cache tiers since the same media and taxonomy objects repeat across
//! pages.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use html_escape::decode_html_entities;

use crate::cache::{Priority, TieredCache};
use crate::domain::raw::{Media, RawPost};
use crate::domain::Article;

pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/600x400.png?text=News";
const FALLBACK_CATEGORY: &str = "General";
const EXCERPT_MAX_CHARS: usize = 220;
const WORDS_PER_MINUTE: u32 = 200;

/// Media size variants in preference order.
const IMAGE_SIZE_ORDER: [&str; 4] = ["medium_large", "large", "medium", "thumbnail"];

#[derive(Clone)]
pub struct Normalizer {
    cache: Arc<TieredCache>,
}

impl Normalizer {
    pub fn new(cache: Arc<TieredCache>) -> Self {
        Self { cache }
    }

    /// Normalize one page worth of raw posts.
    ///
    /// A post that fails to decode is dropped with a warning; the rest of
    /// the page goes through.
    pub fn normalize_page(&self, body: &serde_json::Value) -> Vec<Article> {
        let Some(items) = body.as_array() else {
            tracing::warn!("expected a JSON array of posts");
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| match serde_json::from_value::<RawPost>(item.clone()) {
                Ok(raw) => Some(self.normalize_post(&raw)),
                Err(err) => {
                    tracing::warn!(error = %err, "dropping malformed post");
                    None
                }
            })
            .collect()
    }

    pub fn normalize_post(&self, raw: &RawPost) -> Article {
        let headline = raw
            .title
            .as_ref()
            .map(|t| strip_html(&t.rendered))
            .unwrap_or_default();

        let content_html = raw
            .content
            .as_ref()
            .map(|c| c.rendered.as_str())
            .unwrap_or("");
        let content = to_plain_text(content_html);

        let excerpt_source = raw
            .excerpt
            .as_ref()
            .map(|e| strip_html(&e.rendered))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| strip_html(content_html));

        Article {
            id: raw.id,
            headline,
            excerpt: excerpt_of(&excerpt_source),
            category: self.resolve_category(raw),
            image_url: self.resolve_image(raw),
            published_at: raw.date.as_deref().and_then(parse_published),
            read_time_minutes: read_time_minutes(&content),
            content,
            slug: raw.slug.clone().unwrap_or_default(),
            link: raw.link.clone().unwrap_or_default(),
            author: raw
                .embedded
                .as_ref()
                .and_then(|e| e.author.first())
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            source: None,
        }
    }

    /// Direct source URL → size variants → GUID → placeholder, cached per
    /// media id so repeat appearances skip the fallback walk.
    fn resolve_image(&self, raw: &RawPost) -> String {
        let Some(media) = raw.embedded.as_ref().and_then(|e| e.media.first()) else {
            return PLACEHOLDER_IMAGE.to_string();
        };

        let key = media.id.to_string();
        if media.id != 0 {
            if let Some(url) = self.cache.get_image(&key) {
                return url;
            }
        }

        let url = image_from_media(media).unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());
        if media.id != 0 {
            self.cache.put_image(&key, url.clone(), Priority::High);
        }
        url
    }

    /// First category id matched against embedded terms → first embedded
    /// term → "General", cached per post id.
    fn resolve_category(&self, raw: &RawPost) -> String {
        let key = raw.id.to_string();
        if let Some(name) = self.cache.get_category(&key) {
            return name;
        }

        let name = category_from_terms(raw).unwrap_or_else(|| FALLBACK_CATEGORY.to_string());
        self.cache.put_category(&key, name.clone(), Priority::High);
        name
    }
}

fn image_from_media(media: &Media) -> Option<String> {
    if let Some(url) = media.source_url.as_ref().filter(|u| !u.is_empty()) {
        return Some(url.clone());
    }

    if let Some(details) = &media.media_details {
        for size in IMAGE_SIZE_ORDER {
            if let Some(variant) = details.sizes.get(size) {
                return Some(variant.source_url.clone());
            }
        }
    }

    media
        .guid
        .as_ref()
        .map(|g| g.rendered.clone())
        .filter(|u| !u.is_empty())
}

fn category_from_terms(raw: &RawPost) -> Option<String> {
    let groups = &raw.embedded.as_ref()?.terms;
    let terms: Vec<_> = groups.iter().flatten().collect();

    if let Some(first_id) = raw.categories.first() {
        if let Some(term) = terms.iter().find(|t| t.id == *first_id) {
            return Some(term.name.clone());
        }
    }

    terms.first().map(|t| t.name.clone())
}

/// Strip tags, decode entities and collapse whitespace. List-view path.
pub fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    let decoded = decode_html_entities(&out);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Detail-view path: paragraph/break markup becomes newlines, remaining
/// tags are stripped, entities fully decoded (named, numeric, hex), runs
/// of 3+ newlines collapse to exactly 2 and every line is trimmed.
pub fn to_plain_text(html: &str) -> String {
    let mut text = html.to_string();
    for tag in ["</p>", "</P>"] {
        text = text.replace(tag, "\n\n");
    }
    for tag in ["<br>", "<br/>", "<br />", "<BR>", "<BR/>"] {
        text = text.replace(tag, "\n");
    }

    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    let decoded = decode_html_entities(&out);
    let trimmed_lines = decoded
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");

    let mut collapsed = trimmed_lines;
    while collapsed.contains("\n\n\n") {
        collapsed = collapsed.replace("\n\n\n", "\n\n");
    }
    collapsed.trim().to_string()
}

/// `max(1, ceil(words / 200))`. Monotonic in content length.
pub fn read_time_minutes(text: &str) -> u32 {
    let words = text.split_whitespace().count() as u32;
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

fn excerpt_of(text: &str) -> String {
    if text.chars().count() <= EXCERPT_MAX_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_MAX_CHARS).collect();
    format!("{}…", cut.trim_end())
}

fn parse_published(date: &str) -> Option<DateTime<Utc>> {
    // The API emits zone-less timestamps; some installations add an offset.
    DateTime::parse_from_rfc3339(date)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(Arc::new(TieredCache::new()))
    }

    fn raw_post(json: &str) -> RawPost {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_bare_post_gets_all_fallbacks() {
        let article = normalizer().normalize_post(&raw_post(r#"{"id": 5}"#));

        assert_eq!(article.image_url, PLACEHOLDER_IMAGE);
        assert_eq!(article.category, "General");
        assert_eq!(article.headline, "");
        assert_eq!(article.read_time_minutes, 1);
    }

    #[test]
    fn test_image_prefers_direct_source_url() {
        let article = normalizer().normalize_post(&raw_post(
            r#"{
                "id": 1,
                "_embedded": {"wp:featuredmedia": [{
                    "id": 9,
                    "source_url": "https://cdn/direct.jpg",
                    "media_details": {"sizes": {"large": {"source_url": "https://cdn/large.jpg"}}}
                }]}
            }"#,
        ));
        assert_eq!(article.image_url, "https://cdn/direct.jpg");
    }

    #[test]
    fn test_image_size_variant_order() {
        let article = normalizer().normalize_post(&raw_post(
            r#"{
                "id": 1,
                "_embedded": {"wp:featuredmedia": [{
                    "id": 9,
                    "media_details": {"sizes": {
                        "thumbnail": {"source_url": "https://cdn/thumb.jpg"},
                        "medium": {"source_url": "https://cdn/medium.jpg"}
                    }}
                }]}
            }"#,
        ));
        assert_eq!(article.image_url, "https://cdn/medium.jpg");
    }

    #[test]
    fn test_image_guid_fallback() {
        let article = normalizer().normalize_post(&raw_post(
            r#"{
                "id": 1,
                "_embedded": {"wp:featuredmedia": [{
                    "id": 9,
                    "guid": {"rendered": "https://cdn/guid.jpg"}
                }]}
            }"#,
        ));
        assert_eq!(article.image_url, "https://cdn/guid.jpg");
    }

    #[test]
    fn test_image_resolution_is_cached_by_media_id() {
        let n = normalizer();
        let first = n.normalize_post(&raw_post(
            r#"{"id": 1, "_embedded": {"wp:featuredmedia": [{"id": 9, "source_url": "https://cdn/a.jpg"}]}}"#,
        ));
        // Same media id, different payload: the cached URL wins.
        let second = n.normalize_post(&raw_post(
            r#"{"id": 2, "_embedded": {"wp:featuredmedia": [{"id": 9, "source_url": "https://cdn/other.jpg"}]}}"#,
        ));

        assert_eq!(first.image_url, "https://cdn/a.jpg");
        assert_eq!(second.image_url, "https://cdn/a.jpg");
    }

    #[test]
    fn test_category_matches_first_category_id() {
        let article = normalizer().normalize_post(&raw_post(
            r#"{
                "id": 1,
                "categories": [12],
                "_embedded": {"wp:term": [[
                    {"id": 7, "name": "Misc"},
                    {"id": 12, "name": "Politics"}
                ]]}
            }"#,
        ));
        assert_eq!(article.category, "Politics");
    }

    #[test]
    fn test_category_falls_back_to_first_term() {
        let article = normalizer().normalize_post(&raw_post(
            r#"{
                "id": 1,
                "categories": [99],
                "_embedded": {"wp:term": [[{"id": 7, "name": "Misc"}]]}
            }"#,
        ));
        assert_eq!(article.category, "Misc");
    }

    #[test]
    fn test_page_normalization_drops_malformed_posts() {
        let body = serde_json::json!([
            {"id": 1, "title": {"rendered": "Ok"}},
            {"title": "missing id"},
            {"id": 2}
        ]);
        let articles = normalizer().normalize_page(&body);
        assert_eq!(articles.len(), 2);
    }

    #[test]
    fn test_strip_html_removes_tags_and_decodes_entities() {
        let stripped = strip_html("<p>Ben &amp; Jerry&#8217;s <em>new</em> flavor</p>");
        assert_eq!(stripped, "Ben & Jerry’s new flavor");
    }

    #[test]
    fn test_to_plain_text_paragraphs_and_breaks() {
        let text = to_plain_text(
            "<p>First paragraph.</p><p>Second<br>line.</p><p></p><p>Third.</p>",
        );
        assert_eq!(text, "First paragraph.\n\nSecond\nline.\n\nThird.");
    }

    #[test]
    fn test_to_plain_text_decodes_numeric_and_hex_entities() {
        assert_eq!(to_plain_text("A&#32;B &#x26; C"), "A B & C");
    }

    #[test]
    fn test_read_time_floors_at_one_minute() {
        assert_eq!(read_time_minutes(""), 1);
        assert_eq!(read_time_minutes("a few words"), 1);
    }

    #[test]
    fn test_read_time_is_monotonic() {
        let two_hundred = "word ".repeat(200);
        let four_hundred = "word ".repeat(401);
        assert_eq!(read_time_minutes(&two_hundred), 1);
        assert_eq!(read_time_minutes(&four_hundred), 3);
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let long = "word ".repeat(100);
        let excerpt = excerpt_of(&long);
        assert!(excerpt.chars().count() <= EXCERPT_MAX_CHARS + 1);
        assert!(excerpt.ends_with('…'));
    }

    #[test]
    fn test_parse_published_zoneless() {
        let parsed = parse_published("2024-03-01T08:30:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-01T08:30:00+00:00");
    }
}
