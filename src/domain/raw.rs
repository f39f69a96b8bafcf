//! Typed model of the content API's post payload.
//!
//! The API embeds related resources (`_embedded` media, taxonomy terms,
//! author) whose shapes are not reliable across installations, so every
//! sub-structure is optional and embedded collections are decoded element
//! by element: one malformed object is dropped instead of poisoning the
//! post that carries it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    pub id: u64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub title: Option<Rendered>,
    #[serde(default)]
    pub content: Option<Rendered>,
    #[serde(default)]
    pub excerpt: Option<Rendered>,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<Embedded>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Embedded {
    #[serde(rename = "wp:featuredmedia", default, deserialize_with = "lenient_vec")]
    pub media: Vec<Media>,
    #[serde(rename = "wp:term", default, deserialize_with = "lenient_vec")]
    pub terms: Vec<Vec<Term>>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub author: Vec<EmbeddedAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub media_details: Option<MediaDetails>,
    #[serde(default)]
    pub guid: Option<Rendered>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaDetails {
    #[serde(default)]
    pub sizes: std::collections::HashMap<String, SizeVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SizeVariant {
    pub source_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Term {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub taxonomy: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedAuthor {
    pub name: String,
}

/// Remote taxonomy record, used to resolve a local category slug to the
/// API's own category id.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCategory {
    pub id: u64,
    pub slug: String,
    pub name: String,
}

/// Deserialize a JSON array, discarding elements that fail to decode.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_post_decodes() {
        let post: RawPost = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(post.id, 7);
        assert!(post.title.is_none());
        assert!(post.categories.is_empty());
        assert!(post.embedded.is_none());
    }

    #[test]
    fn test_embedded_media_and_terms() {
        let post: RawPost = serde_json::from_str(
            r#"{
                "id": 1,
                "title": {"rendered": "Hello"},
                "categories": [12],
                "_embedded": {
                    "wp:featuredmedia": [
                        {"id": 44, "source_url": "https://cdn.example.com/a.jpg"}
                    ],
                    "wp:term": [
                        [{"id": 12, "name": "Politics", "slug": "politics"}]
                    ],
                    "author": [{"name": "Ada"}]
                }
            }"#,
        )
        .unwrap();

        let embedded = post.embedded.unwrap();
        assert_eq!(embedded.media[0].id, 44);
        assert_eq!(embedded.terms[0][0].name, "Politics");
        assert_eq!(embedded.author[0].name, "Ada");
    }

    #[test]
    fn test_malformed_media_entry_is_dropped() {
        // The API is known to emit `false` in place of a media object when
        // the attachment was deleted.
        let post: RawPost = serde_json::from_str(
            r#"{
                "id": 1,
                "_embedded": {
                    "wp:featuredmedia": [false, {"id": 9, "source_url": "https://c/i.png"}]
                }
            }"#,
        )
        .unwrap();

        let embedded = post.embedded.unwrap();
        assert_eq!(embedded.media.len(), 1);
        assert_eq!(embedded.media[0].id, 9);
    }
}
