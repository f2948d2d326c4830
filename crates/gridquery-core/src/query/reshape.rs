//! Flattening of collection-valued associations in hydrated rows.
//!
//! Rows fanned out across one-to-many joins carry nested sequences. For
//! display, each sequence on a bound column path is folded into one mapping
//! by [`deep_merge`], so `lines.sku` over two lines becomes
//! `{"lines": {"sku": ["a", "b"]}}`. Which child a value came from is lost.

use gridquery_proto::{DisplayRow, RawRow};
use serde_json::{Map, Value};

use super::binding::ColumnBinding;

/// Reshapes raw rows for one set of bindings.
#[derive(Debug, Clone)]
pub struct ResultReshaper {
    paths: Vec<Vec<String>>,
}

impl ResultReshaper {
    /// Keep the paths of the collection-reachable bindings.
    pub fn new(bindings: &[ColumnBinding]) -> Self {
        let paths = bindings
            .iter()
            .filter(|b| b.collection_reachable)
            .map(|b| b.segments().map(str::to_string).collect())
            .collect();
        Self { paths }
    }

    /// Whether any binding needs flattening.
    pub fn is_noop(&self) -> bool {
        self.paths.is_empty()
    }

    /// Flatten one raw row.
    pub fn reshape(&self, row: RawRow) -> DisplayRow {
        let mut row = row;
        for path in &self.paths {
            flatten_path(&mut row, path);
        }
        row
    }

    /// Flatten every row of a page.
    pub fn reshape_all(&self, rows: Vec<RawRow>) -> Vec<DisplayRow> {
        rows.into_iter().map(|row| self.reshape(row)).collect()
    }
}

fn flatten_path(map: &mut Map<String, Value>, segments: &[String]) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        return;
    }
    let Some(value) = map.get_mut(first.as_str()) else {
        return;
    };

    if let Value::Array(items) = value {
        // sequences holding scalars are left as they are; nulls count as empty
        if !items.iter().all(|item| item.is_object() || item.is_null()) {
            return;
        }
        let merged = merge_all(std::mem::take(items));
        *value = Value::Object(merged);
    }

    if let Value::Object(child) = value {
        flatten_path(child, rest);
    }
}

fn merge_all(items: Vec<Value>) -> Map<String, Value> {
    items.into_iter().fold(Map::new(), |acc, item| match item {
        Value::Object(map) => deep_merge(acc, map),
        _ => acc,
    })
}

/// Merge two mappings.
///
/// Keys are unioned. A key defined on both sides gets both values
/// concatenated into a sequence, with sequences spliced in; when both values
/// are mappings they are merged recursively instead. The merge is
/// associative.
pub fn deep_merge(left: Map<String, Value>, right: Map<String, Value>) -> Map<String, Value> {
    let mut merged = left;
    for (key, value) in right {
        match merged.get_mut(&key) {
            Some(existing) => {
                let current = std::mem::take(existing);
                *existing = merge_values(current, value);
            }
            None => {
                merged.insert(key, value);
            }
        }
    }
    merged
}

fn merge_values(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => Value::Object(deep_merge(l, r)),
        (l, r) => {
            let mut items = into_items(l);
            items.extend(into_items(r));
            Value::Array(items)
        }
    }
}

fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    fn binding(path: &str, collection_reachable: bool) -> ColumnBinding {
        ColumnBinding {
            index: 0,
            path: path.into(),
            entity_type: String::new(),
            entity_alias: String::new(),
            field_name: path.rsplit('.').next().unwrap_or(path).into(),
            fully_qualified_name: String::new(),
            collection_reachable,
            searchable: true,
            orderable: true,
        }
    }

    #[test]
    fn test_deep_merge_scalars() {
        let merged = deep_merge(obj(json!({"x": 1})), obj(json!({"x": 2})));
        assert_eq!(Value::Object(merged), json!({"x": [1, 2]}));
    }

    #[test]
    fn test_deep_merge_splices_sequences() {
        let merged = deep_merge(obj(json!({"x": 1, "y": [5]})), obj(json!({"x": 2, "y": [6]})));
        assert_eq!(Value::Object(merged), json!({"x": [1, 2], "y": [5, 6]}));
    }

    #[test]
    fn test_deep_merge_recurses_and_unions() {
        let merged = deep_merge(
            obj(json!({"a": {"b": 1}, "only_left": true})),
            obj(json!({"a": {"b": 2, "c": 3}, "only_right": null})),
        );
        assert_eq!(
            Value::Object(merged),
            json!({"a": {"b": [1, 2], "c": 3}, "only_left": true, "only_right": null})
        );
    }

    #[test]
    fn test_deep_merge_is_associative() {
        let a = obj(json!({"x": 1, "n": {"k": "a"}}));
        let b = obj(json!({"x": [2, 3], "n": {"k": "b"}, "z": 0}));
        let c = obj(json!({"x": 4, "n": {"j": 1}, "z": 9}));

        let left = deep_merge(deep_merge(a.clone(), b.clone()), c.clone());
        let right = deep_merge(a, deep_merge(b, c));
        assert_eq!(left, right);
    }

    #[test]
    fn test_reshape_flattens_collection_paths() {
        let reshaper = ResultReshaper::new(&[binding("name", false), binding("lines.sku", true)]);
        let row = obj(json!({
            "id": 1,
            "name": "first",
            "lines": [{"id": 10, "sku": "a"}, {"id": 11, "sku": "b"}]
        }));

        let reshaped = reshaper.reshape(row);
        assert_eq!(
            Value::Object(reshaped),
            json!({"id": 1, "name": "first", "lines": {"id": [10, 11], "sku": ["a", "b"]}})
        );
    }

    #[test]
    fn test_reshape_nested_collections() {
        let reshaper = ResultReshaper::new(&[binding("customer.orders.lines.sku", true)]);
        let row = obj(json!({
            "customer": {
                "orders": [
                    {"lines": [{"sku": "a"}, {"sku": "b"}]},
                    {"lines": [{"sku": "c"}]}
                ]
            }
        }));

        let reshaped = reshaper.reshape(row);
        assert_eq!(
            Value::Object(reshaped),
            json!({"customer": {"orders": {"lines": {"sku": ["a", "b", "c"]}}}})
        );
    }

    #[test]
    fn test_reshape_skips_null_to_one_in_collection() {
        let reshaper = ResultReshaper::new(&[binding("lines.product.title", true)]);
        let row = obj(json!({
            "lines": [
                {"id": 1, "product": null},
                {"id": 2, "product": {"id": 9, "title": "t"}}
            ]
        }));

        let reshaped = reshaper.reshape(row);
        assert_eq!(
            Value::Object(reshaped),
            json!({"lines": {"id": [1, 2], "product": {"id": 9, "title": "t"}}})
        );
    }

    #[test]
    fn test_reshape_all_null_to_one_in_collection() {
        let reshaper = ResultReshaper::new(&[binding("lines.product.title", true)]);
        let row = obj(json!({
            "lines": [{"id": 1, "product": null}, {"id": 2, "product": null}]
        }));

        let reshaped = reshaper.reshape(row);
        assert_eq!(
            Value::Object(reshaped),
            json!({"lines": {"id": [1, 2], "product": {}}})
        );
    }

    #[test]
    fn test_reshape_edge_cases() {
        let reshaper = ResultReshaper::new(&[binding("lines.sku", true), binding("tags.name", true)]);
        let row = obj(json!({"lines": [], "tags": ["red", "blue"]}));

        let reshaped = reshaper.reshape(row);
        assert_eq!(Value::Object(reshaped), json!({"lines": {}, "tags": ["red", "blue"]}));
        assert!(ResultReshaper::new(&[binding("customer.email", false)]).is_noop());
    }
}
