// src/model/record.rs
//! Raw Omeka S resources.
//!
//! A record keeps every field exactly as the API returned it, in the API's
//! order. The harvester only looks at a handful of fields, exposed here as
//! typed accessors; everything else is left for downstream mappers.

use crate::types::{RecordId, ResourceClassId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    /// Wraps a JSON object; returns `None` for any other JSON shape.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map.into_iter().collect())),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0.into_iter().collect())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.0
    }

    /// `o:id`, when present and numeric.
    pub fn id(&self) -> Option<RecordId> {
        self.0.get("o:id").and_then(Value::as_u64).map(RecordId::new)
    }

    /// `o:is_public`; resources without the flag are treated as public.
    pub fn is_public(&self) -> bool {
        self.0
            .get("o:is_public")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// `o:title`, when present and non-empty.
    pub fn title(&self) -> Option<&str> {
        self.0
            .get("o:title")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
    }

    /// `o:resource_class.o:id`.
    pub fn resource_class_id(&self) -> Option<ResourceClassId> {
        self.0
            .get("o:resource_class")
            .and_then(|c| c.get("o:id"))
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok())
            .map(ResourceClassId::new)
    }

    /// Ids of the item sets this item belongs to (`o:item_set[].o:id`).
    pub fn item_set_ids(&self) -> Vec<RecordId> {
        self.linked_ids("o:item_set")
    }

    /// Ids of the media attached to this item (`o:media[].o:id`).
    pub fn media_ids(&self) -> Vec<RecordId> {
        self.linked_ids("o:media")
    }

    /// `display_title` of the first value of a vocabulary property such as
    /// `dcterms:language`.
    pub fn first_display_title(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .and_then(|values| values.first())
            .and_then(|v| v.get("display_title"))
            .and_then(Value::as_str)
    }

    /// `@value` of the first value of a literal property such as
    /// `bibo:content`.
    pub fn first_literal(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .and_then(|values| values.first())
            .and_then(|v| v.get("@value"))
            .and_then(Value::as_str)
    }

    /// Whitespace-separated words in the full text (`bibo:content`); 0 when
    /// the record carries no text.
    pub fn word_count(&self) -> usize {
        self.first_literal("bibo:content")
            .map_or(0, |content| content.split_whitespace().count())
    }

    fn linked_ids(&self, field: &str) -> Vec<RecordId> {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .map(|links| {
                links
                    .iter()
                    .filter_map(|link| link.get("o:id").and_then(Value::as_u64))
                    .map(RecordId::new)
                    .collect()
            })
            .unwrap_or_default()
    }
}
