//! Structural JSON merge rules shared by the Aggregator (batch-scope merge
//! of per-file results) and the consume loop (file-scope merge of per-chunk
//! results). The schema of `extracted` is opaque; merge is purely
//! structural, keyed only by JSON shape.

use serde_json::Value;

const MAX_ARRAY_ITEMS: usize = 1000;

/// One item to merge, paired with the ordering key used to break ties
/// between scalar fields carrying the same key (`completed_at` ascending,
/// `doc_id` lexicographic).
pub struct MergeItem {
    pub value: Value,
    pub order_key: (chrono::DateTime<chrono::Utc>, String),
}

/// Merge a sequence of opaque JSON documents into one accumulator,
/// following the declared rules: scalars are first-non-empty-wins ordered
/// by `order_key`; arrays concatenate, deduplicate by deep equality, and
/// cap at [`MAX_ARRAY_ITEMS`]; nested objects recurse.
pub fn merge_all(mut items: Vec<MergeItem>) -> Value {
    items.sort_by(|a, b| a.order_key.cmp(&b.order_key));

    let mut accumulator = Value::Null;
    for item in items {
        accumulator = merge_two(accumulator, item.value);
    }
    accumulator
}

fn merge_two(acc: Value, incoming: Value) -> Value {
    match (acc, incoming) {
        (Value::Object(mut acc_map), Value::Object(incoming_map)) => {
            for (key, incoming_value) in incoming_map {
                let merged = match acc_map.remove(&key) {
                    Some(existing) => merge_field(existing, incoming_value),
                    None => incoming_value,
                };
                acc_map.insert(key, merged);
            }
            Value::Object(acc_map)
        }
        (Value::Null, incoming) => incoming,
        (acc, Value::Null) => acc,
        (acc, _incoming) => acc,
    }
}

fn merge_field(existing: Value, incoming: Value) -> Value {
    match (existing, incoming) {
        (Value::Object(a), Value::Object(b)) => merge_two(Value::Object(a), Value::Object(b)),
        (Value::Array(mut a), Value::Array(b)) => {
            for item in b {
                if !a.iter().any(|existing_item| existing_item == &item) {
                    a.push(item);
                }
            }
            a.truncate(MAX_ARRAY_ITEMS);
            Value::Array(a)
        }
        (existing, incoming) => {
            if is_empty_scalar(&existing) {
                incoming
            } else {
                existing
            }
        }
    }
}

fn is_empty_scalar(value: &Value) -> bool {
    matches!(value, Value::Null) || matches!(value, Value::String(s) if s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn item(value: Value, doc_id: &str) -> MergeItem {
        MergeItem { value, order_key: (Utc::now(), doc_id.to_string()) }
    }

    #[test]
    fn scalars_first_non_empty_wins() {
        let merged = merge_all(vec![
            item(json!({"title": ""}), "a"),
            item(json!({"title": "Tender 1"}), "b"),
            item(json!({"title": "Tender 2"}), "c"),
        ]);
        assert_eq!(merged["title"], "Tender 1");
    }

    #[test]
    fn arrays_concatenate_and_dedupe() {
        let merged = merge_all(vec![
            item(json!({"items": ["a", "b"]}), "a"),
            item(json!({"items": ["b", "c"]}), "b"),
        ]);
        assert_eq!(merged["items"], json!(["a", "b", "c"]));
    }

    #[test]
    fn nested_objects_merge_recursively() {
        let merged = merge_all(vec![
            item(json!({"meta": {"a": 1}}), "a"),
            item(json!({"meta": {"b": 2}}), "b"),
        ]);
        assert_eq!(merged["meta"], json!({"a": 1, "b": 2}));
    }

    #[test]
    fn provenance_field_survives_merge() {
        let merged = merge_all(vec![item(json!({"source_document": "a.pdf", "title": "X"}), "a")]);
        assert_eq!(merged["source_document"], "a.pdf");
    }

    #[test]
    fn merge_is_idempotent() {
        let inputs = vec![item(json!({"title": "X", "items": [1, 2]}), "a")];
        let first = merge_all(inputs);
        let second = merge_all(vec![item(first.clone(), "a")]);
        assert_eq!(first, second);
    }
}
