//! Payload Module
//!
//! Known shapes of cached data. The incremental updater dispatches on the
//! variant instead of probing for field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{CacheError, Result};

// == Capacities ==
/// Page size of the "newest" listing query.
pub const NEWEST_CAPACITY: usize = 16;

/// Page size of the "most popular" listing query.
pub const POPULAR_CAPACITY: usize = 32;

// == Item Summary ==
/// Summary record of an item as it appears inside listings and search results.
///
/// Optional fields that are absent are not serialized, so a summary
/// round-trips in the shape it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Username of the owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields the cache does not know about, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ItemSummary {
    /// Creates a bare summary carrying only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            author: None,
            author_verified: None,
            views: None,
            likes: None,
            status: None,
            tags: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    /// Builds the summary of a freshly created item.
    ///
    /// Fields present in `data` win; everything else gets the defaults a new
    /// item has in the database.
    pub fn from_created(
        id: &str,
        data: Option<&Value>,
        author: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Self> {
        let mut defaults = Self::new(id);
        defaults.title = Some(String::new());
        defaults.description = Some(String::new());
        defaults.author = author.map(str::to_string);
        defaults.author_verified = Some(false);
        defaults.views = Some(0);
        defaults.likes = Some(0);
        defaults.status = Some("active".to_string());
        defaults.tags = Some(Vec::new());
        defaults.created_at = Some(at);
        defaults.updated_at = Some(at);

        let mut created = match data {
            Some(data) => defaults.merged(data)?,
            None => defaults,
        };
        created.id = id.to_string();
        Ok(created)
    }

    /// Returns a copy with the fields of `patch` shallow-merged over this one.
    ///
    /// Fails when `patch` is not an object or the result is not a valid summary.
    pub fn merged(&self, patch: &Value) -> Result<Self> {
        let patch = patch.as_object().ok_or_else(|| {
            CacheError::MalformedPayload("item patch must be a JSON object".to_string())
        })?;
        let mut fields = match serde_json::to_value(self)? {
            Value::Object(fields) => fields,
            _ => {
                return Err(CacheError::MalformedPayload(
                    "item summary did not serialize to an object".to_string(),
                ))
            }
        };
        for (name, value) in patch {
            fields.insert(name.clone(), value.clone());
        }
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// True when the item is owned by `username`.
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.author.as_deref() == Some(username)
    }
}

// == Listings Payload ==
/// Landing page listings: newest and most popular items.
///
/// Either list may be absent; only the lists present are patched. Other
/// top-level fields are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest: Option<Vec<ItemSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popular: Option<Vec<ItemSummary>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ListingsPayload {
    /// Creates a payload carrying both lists.
    pub fn new(newest: Vec<ItemSummary>, popular: Vec<ItemSummary>) -> Self {
        Self {
            newest: Some(newest),
            popular: Some(popular),
            extra: Map::new(),
        }
    }

    /// Newest items, empty when the list is absent.
    pub fn newest(&self) -> &[ItemSummary] {
        self.newest.as_deref().unwrap_or_default()
    }

    /// Most popular items, empty when the list is absent.
    pub fn popular(&self) -> &[ItemSummary] {
        self.popular.as_deref().unwrap_or_default()
    }

    /// Lists present in the payload, paired with their fixed capacity.
    pub(crate) fn lists_mut(&mut self) -> Vec<(&mut Vec<ItemSummary>, usize)> {
        [
            (self.newest.as_mut(), NEWEST_CAPACITY),
            (self.popular.as_mut(), POPULAR_CAPACITY),
        ]
        .into_iter()
        .filter_map(|(list, capacity)| list.map(|list| (list, capacity)))
        .collect()
    }

    fn has_lists(&self) -> bool {
        self.newest.is_some() || self.popular.is_some()
    }
}

// == Search Payload ==
/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPayload {
    pub scripts: Vec<ItemSummary>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// == Cache Payload ==
/// Data held by a cache entry.
///
/// Serialized untagged, so the JSON form is exactly the application payload.
/// Deserialization classifies by field names: `newest`/`popular` make a
/// listings payload, `scripts` a search page. Anything that does not fit its
/// shape is kept verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CachePayload {
    Listings(ListingsPayload),
    Search(SearchPayload),
    /// Any other shape; stored verbatim and never patched
    Other(Value),
}

impl<'de> Deserialize<'de> for CachePayload {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(CachePayload::classify)
    }
}

impl CachePayload {
    /// Picks the variant for a JSON value.
    pub fn classify(value: Value) -> Self {
        let Some(fields) = value.as_object() else {
            return CachePayload::Other(value);
        };

        if fields.contains_key("newest") || fields.contains_key("popular") {
            match ListingsPayload::deserialize(&value) {
                Ok(listings) if listings.has_lists() => return CachePayload::Listings(listings),
                _ => {}
            }
        } else if fields.contains_key("scripts") {
            if let Ok(search) = SearchPayload::deserialize(&value) {
                return CachePayload::Search(search);
            }
        }
        CachePayload::Other(value)
    }

    /// Returns a copy with the top-level fields of `partial` merged over this
    /// payload. The result may change variant if the merged shape does.
    pub fn shallow_merged(&self, partial: &Value) -> Result<Self> {
        let partial = partial.as_object().ok_or_else(|| {
            CacheError::MalformedPayload("partial update must be a JSON object".to_string())
        })?;
        let mut fields = match serde_json::to_value(self)? {
            Value::Object(fields) => fields,
            _ => {
                return Err(CacheError::MalformedPayload(
                    "stored payload is not an object".to_string(),
                ))
            }
        };
        for (name, value) in partial {
            fields.insert(name.clone(), value.clone());
        }
        Ok(CachePayload::classify(Value::Object(fields)))
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CachePayload::Listings(_) => "listings",
            CachePayload::Search(_) => "search",
            CachePayload::Other(_) => "other",
        }
    }
}

impl From<ListingsPayload> for CachePayload {
    fn from(payload: ListingsPayload) -> Self {
        CachePayload::Listings(payload)
    }
}

impl From<SearchPayload> for CachePayload {
    fn from(payload: SearchPayload) -> Self {
        CachePayload::Search(payload)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_summary_roundtrips_sparse_shape() {
        let value = json!({"id": "a", "views": 10});
        let summary: ItemSummary = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(summary.views, Some(10));
        assert_eq!(serde_json::to_value(&summary).unwrap(), value);
    }

    #[test]
    fn test_summary_keeps_unknown_fields() {
        let value = json!({"id": "a", "category": "tools", "downloads": 3});
        let summary: ItemSummary = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(summary.extra.get("category"), Some(&json!("tools")));
        assert_eq!(serde_json::to_value(&summary).unwrap(), value);
    }

    #[test]
    fn test_from_created_fills_defaults() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let data = json!({"title": "New"});
        let created = ItemSummary::from_created("b", Some(&data), Some("alice"), at).unwrap();

        assert_eq!(created.id, "b");
        assert_eq!(created.title.as_deref(), Some("New"));
        assert_eq!(created.views, Some(0));
        assert_eq!(created.likes, Some(0));
        assert_eq!(created.status.as_deref(), Some("active"));
        assert_eq!(created.author.as_deref(), Some("alice"));
        assert_eq!(created.author_verified, Some(false));
        assert_eq!(created.created_at, Some(at));
    }

    #[test]
    fn test_from_created_id_cannot_be_overridden_by_data() {
        let data = json!({"id": "other", "title": "New"});
        let created = ItemSummary::from_created("b", Some(&data), None, Utc::now()).unwrap();
        assert_eq!(created.id, "b");
    }

    #[test]
    fn test_merged_rejects_invalid_field_type() {
        let summary = ItemSummary::new("a");
        let result = summary.merged(&json!({"views": "lots"}));
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_merged_rejects_non_object() {
        let summary = ItemSummary::new("a");
        let result = summary.merged(&json!([1, 2, 3]));
        assert!(matches!(result, Err(CacheError::MalformedPayload(_))));
    }

    #[test]
    fn test_payload_variants_deserialize_by_shape() {
        let listings: CachePayload =
            serde_json::from_value(json!({"newest": [], "popular": []})).unwrap();
        assert_eq!(listings.kind(), "listings");

        let search: CachePayload = serde_json::from_value(
            json!({"scripts": [], "total": 0, "page": 1, "limit": 20}),
        )
        .unwrap();
        assert_eq!(search.kind(), "search");

        let other: CachePayload = serde_json::from_value(json!({"count": 3})).unwrap();
        assert_eq!(other.kind(), "other");
    }

    #[test]
    fn test_shallow_merged_replaces_top_level_fields() {
        let payload = CachePayload::Search(SearchPayload {
            scripts: vec![ItemSummary::new("a")],
            total: 1,
            page: 1,
            limit: 20,
            extra: Map::new(),
        });

        let merged = payload.shallow_merged(&json!({"total": 5})).unwrap();
        match merged {
            CachePayload::Search(search) => {
                assert_eq!(search.total, 5);
                assert_eq!(search.scripts.len(), 1);
            }
            other => panic!("unexpected variant {}", other.kind()),
        }
    }

    #[test]
    fn test_listings_keeps_top_level_fields() {
        let value = json!({
            "newest": [{"id": "a"}],
            "popular": [],
            "generatedAt": "2024-01-01",
            "totalCount": 12
        });
        let payload: CachePayload = serde_json::from_value(value.clone()).unwrap();

        match &payload {
            CachePayload::Listings(listings) => {
                assert_eq!(listings.extra.get("generatedAt"), Some(&json!("2024-01-01")));
            }
            other => panic!("expected listings, got {}", other.kind()),
        }
        assert_eq!(serde_json::to_value(&payload).unwrap(), value);
    }

    #[test]
    fn test_search_keeps_top_level_fields() {
        let value = json!({
            "scripts": [], "total": 0, "page": 1, "limit": 20, "query": "rust"
        });
        let payload: CachePayload = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(payload.kind(), "search");
        assert_eq!(serde_json::to_value(&payload).unwrap(), value);
    }

    #[test]
    fn test_single_list_is_listings() {
        let value = json!({"newest": [{"id": "a"}, {"id": "b"}]});
        let payload: CachePayload = serde_json::from_value(value.clone()).unwrap();

        match &payload {
            CachePayload::Listings(listings) => {
                assert_eq!(listings.newest().len(), 2);
                assert!(listings.popular.is_none());
            }
            other => panic!("expected listings, got {}", other.kind()),
        }
        assert_eq!(serde_json::to_value(&payload).unwrap(), value);
    }

    #[test]
    fn test_lists_mut_yields_present_lists_only() {
        let mut listings: ListingsPayload =
            serde_json::from_value(json!({"popular": [{"id": "a"}]})).unwrap();

        let lists = listings.lists_mut();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].1, POPULAR_CAPACITY);
    }

    #[test]
    fn test_malformed_lists_fall_back_to_other() {
        let null_list: CachePayload = serde_json::from_value(json!({"newest": null})).unwrap();
        assert_eq!(null_list.kind(), "other");

        let bad_items: CachePayload =
            serde_json::from_value(json!({"newest": [{"title": "no id"}]})).unwrap();
        assert_eq!(bad_items.kind(), "other");
        assert_eq!(
            serde_json::to_value(&bad_items).unwrap(),
            json!({"newest": [{"title": "no id"}]})
        );
    }
}
