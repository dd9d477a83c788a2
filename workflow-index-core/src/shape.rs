//! Runtime discrimination of aggregate-document layouts.
//!
//! Aggregate documents are published in several layouts. Each recognised
//! layout is tried in a fixed priority order and the first match wins; a
//! document matching none of them decodes to [`DocumentShape::Unrecognized`].

use serde_json::{Map, Value};

use crate::model::RawItem;

/// A single-array object is only treated as a data array above this length.
pub const MIN_DATA_ARRAY_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentShape {
    /// `[ {...}, {...} ]`
    Sequence(Vec<Value>),
    /// `{ "workflows": [ ... ] }`
    WorkflowsProperty(Vec<Value>),
    /// `{ "0001": {...}, "0002": {...} }`
    KeyedById(Vec<(String, Value)>),
    /// `{ "anything": [ ...more than MIN_DATA_ARRAY_LEN items... ] }`
    SingleDataArray { key: String, items: Vec<Value> },
    Unrecognized,
}

impl DocumentShape {
    pub fn decode(doc: Value) -> Self {
        match doc {
            Value::Array(items) => DocumentShape::Sequence(items),
            Value::Object(mut map) => {
                if map.get("workflows").is_some_and(Value::is_array) {
                    if let Some(Value::Array(items)) = map.remove("workflows") {
                        return DocumentShape::WorkflowsProperty(items);
                    }
                }
                if is_keyed_by_id(&map) {
                    return DocumentShape::KeyedById(map.into_iter().collect());
                }
                single_data_array(map)
            }
            _ => DocumentShape::Unrecognized,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentShape::Sequence(_) => "sequence",
            DocumentShape::WorkflowsProperty(_) => "workflows_property",
            DocumentShape::KeyedById(_) => "keyed_by_id",
            DocumentShape::SingleDataArray { .. } => "single_data_array",
            DocumentShape::Unrecognized => "unrecognized",
        }
    }

    /// Flattens the decoded shape into raw candidates, in document order.
    pub fn into_items(self) -> Vec<RawItem> {
        match self {
            DocumentShape::Sequence(items)
            | DocumentShape::WorkflowsProperty(items)
            | DocumentShape::SingleDataArray { items, .. } => items
                .into_iter()
                .map(|value| RawItem::record(None, value))
                .collect(),
            DocumentShape::KeyedById(entries) => entries
                .into_iter()
                .map(|(id, value)| RawItem::record(Some(id), value))
                .collect(),
            DocumentShape::Unrecognized => Vec::new(),
        }
    }
}

fn is_numeric_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_digit())
}

fn is_keyed_by_id(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map
            .iter()
            .all(|(key, value)| is_numeric_key(key) && value.is_object())
}

fn single_data_array(map: Map<String, Value>) -> DocumentShape {
    if map.len() != 1 {
        return DocumentShape::Unrecognized;
    }
    match map.into_iter().next() {
        Some((key, Value::Array(items))) if items.len() > MIN_DATA_ARRAY_LEN => {
            DocumentShape::SingleDataArray { key, items }
        }
        _ => DocumentShape::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawSource;
    use serde_json::json;

    #[test]
    fn plain_sequence() {
        let shape = DocumentShape::decode(json!([{"name": "a"}, {"name": "b"}, 3]));
        assert_eq!(shape.label(), "sequence");
        assert_eq!(shape.into_items().len(), 3);
    }

    #[test]
    fn workflows_property_wins_over_other_keys() {
        let shape = DocumentShape::decode(json!({
            "version": 2,
            "workflows": [{"name": "a"}, {"name": "b"}]
        }));
        assert_eq!(shape.label(), "workflows_property");
        assert_eq!(shape.into_items().len(), 2);
    }

    #[test]
    fn numeric_keys_become_ids() {
        let mut doc = Map::new();
        for i in 1..=120 {
            doc.insert(format!("{i:04}"), json!({"title": format!("flow {i}")}));
        }
        let items = DocumentShape::decode(Value::Object(doc)).into_items();
        assert_eq!(items.len(), 120);
        match &items[0].source {
            RawSource::Record { id, .. } => assert_eq!(id.as_deref(), Some("0001")),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn mixed_keys_are_not_keyed_by_id() {
        let shape = DocumentShape::decode(json!({"0001": {}, "meta": {}}));
        assert_eq!(shape, DocumentShape::Unrecognized);
    }

    #[test]
    fn single_large_array_is_the_data() {
        let items: Vec<Value> = (0..11).map(|i| json!({"id": i})).collect();
        let shape = DocumentShape::decode(json!({ "data": items }));
        assert_eq!(shape.label(), "single_data_array");
        assert_eq!(shape.into_items().len(), 11);
    }

    #[test]
    fn single_small_array_is_unrecognized() {
        let items: Vec<Value> = (0..10).map(|i| json!({"id": i})).collect();
        assert_eq!(DocumentShape::decode(json!({ "data": items })), DocumentShape::Unrecognized);
    }

    #[test]
    fn scalars_and_empty_objects_are_unrecognized() {
        assert_eq!(DocumentShape::decode(json!("text")), DocumentShape::Unrecognized);
        assert_eq!(DocumentShape::decode(json!({})), DocumentShape::Unrecognized);
        assert!(DocumentShape::Unrecognized.into_items().is_empty());
    }
}
