// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Accepts `null` wherever a plain value is expected and falls back to `T::default()`.
fn null_as_default<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Author {
    #[serde(rename = "userName", default, deserialize_with = "null_as_default")]
    pub handle: String,
    #[serde(rename = "name", default, deserialize_with = "null_as_default")]
    pub display_name: String,
    /// Upstream fields we don't model (followers, avatar, ...), kept for round-trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One collected post. `id` is the only identity key; everything else may drift.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Author,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    /// Timestamp exactly as the source sent it. Never rewritten.
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        handle: impl Into<String>,
        text: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let handle = handle.into();
        Self {
            url: format!("https://x.com/{handle}/status/{id}"),
            author: Author {
                display_name: handle.clone(),
                handle,
                extra: Map::new(),
            },
            id,
            text: text.into(),
            created_at: created_at.into(),
            extra: Map::new(),
        }
    }

    /// Items without an id can't be deduplicated and are never stored.
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Parsed `created_at`, if it is RFC 3339 or the classic
    /// `Tue Dec 10 07:00:30 +0000 2024` format.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_created_at(&self.created_at)
    }

    /// Ordering key for "newest first" sorts. Parsed timestamps compare as instants;
    /// unparseable ones rank below every parsed one and fall back to string order.
    pub fn recency_key(&self) -> (Option<DateTime<Utc>>, &str) {
        (self.created_at_utc(), self.created_at.as_str())
    }
}

pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Stable sort, newest `created_at` first.
pub fn sort_newest_first(items: &mut [Item]) {
    items.sort_by(|a, b| b.recency_key().cmp(&a.recency_key()));
}

/// One page of the advanced search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(rename = "tweets", default, deserialize_with = "null_as_default")]
    pub items: Vec<Item>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_next_page: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub next_cursor: String,
}

#[async_trait::async_trait]
pub trait SearchApi: Send + Sync {
    /// Fetch one page for `query`. An empty `cursor` means the first page.
    async fn fetch_page(&self, query: &str, cursor: &str) -> Result<SearchPage>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_item_keeps_unknown_fields() {
        let raw = r#"{
            "type": "tweet",
            "id": "1866",
            "url": "https://x.com/a/status/1866",
            "text": "hello",
            "createdAt": "Tue Dec 10 07:00:30 +0000 2024",
            "likeCount": 3,
            "author": {"userName": "a", "name": "A", "followers": 10}
        }"#;
        let item: Item = serde_json::from_str(raw).unwrap();
        assert_eq!(item.id, "1866");
        assert_eq!(item.author.handle, "a");
        assert_eq!(item.author.display_name, "A");
        assert_eq!(item.extra.get("likeCount"), Some(&Value::from(3)));

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["author"]["followers"], Value::from(10));
        assert_eq!(back["createdAt"], "Tue Dec 10 07:00:30 +0000 2024");
    }

    #[test]
    fn null_fields_become_defaults() {
        let item: Item = serde_json::from_str(r#"{"id": null, "text": null}"#).unwrap();
        assert!(!item.has_id());
        assert_eq!(item.text, "");
    }

    #[test]
    fn both_timestamp_formats_parse() {
        let a = parse_created_at("2024-12-10T07:00:30Z").unwrap();
        let b = parse_created_at("Tue Dec 10 07:00:30 +0000 2024").unwrap();
        assert_eq!(a, b);
        assert!(parse_created_at("yesterday").is_none());
    }

    #[test]
    fn newest_first_uses_instants_not_strings() {
        // "Mon" sorts before "Tue" as a string, but Dec 16 is newer than Dec 10.
        let mut items = vec![
            Item::new("1", "a", "older", "Tue Dec 10 07:00:30 +0000 2024"),
            Item::new("2", "a", "newer", "Mon Dec 16 07:00:30 +0000 2024"),
            Item::new("3", "a", "garbled", "not a date"),
        ];
        sort_newest_first(&mut items);
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
    }
}
