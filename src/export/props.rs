use serde_json::Value;

use crate::export::document::{PropScalar, PropValue, PropertyBag};
use crate::scene_graph::Tags;

/// Keys starting with this are private to the authoring tool.
pub const PRIVATE_PREFIX: char = '_';

/// Keeps the tags the runtime can read: scalars, and lists whose elements are
/// all scalars. Anything else, and private keys, is dropped.
pub fn filter_props(tags: &Tags) -> PropertyBag {
    tags.iter()
        .filter(|(key, _)| !key.starts_with(PRIVATE_PREFIX))
        .filter_map(|(key, value)| Some((key.clone(), to_prop(value)?)))
        .collect()
}

fn to_prop(value: &Value) -> Option<PropValue> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(to_scalar)
            .collect::<Option<Vec<_>>>()
            .map(PropValue::List),
        _ => to_scalar(value).map(PropValue::Scalar),
    }
}

fn to_scalar(value: &Value) -> Option<PropScalar> {
    match value {
        Value::Bool(b) => Some(PropScalar::Bool(*b)),
        Value::Number(n) => Some(PropScalar::Number(n.clone())),
        Value::String(s) => Some(PropScalar::String(s.clone())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(value: Value) -> Tags {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn drops_private_keys_and_lists_with_objects() {
        let input = tags(json!({
            "_hidden": 1,
            "hp": 10,
            "tags": ["a", "b"],
            "mixed": [1, "x", {}]
        }));

        let props = filter_props(&input);

        assert_eq!(serde_json::to_value(&props).unwrap(), json!({ "hp": 10, "tags": ["a", "b"] }));
    }

    #[test]
    fn keeps_scalars_unchanged() {
        let input = tags(json!({ "speed": 2.5, "count": -3, "name": "door", "locked": true }));
        let props = filter_props(&input);

        assert_eq!(props.len(), 4);
        assert_eq!(props["locked"], PropValue::Scalar(PropScalar::Bool(true)));
        assert_eq!(props["name"], PropValue::Scalar(PropScalar::String("door".into())));
        assert_eq!(
            serde_json::to_value(&props).unwrap(),
            json!({ "speed": 2.5, "count": -3, "name": "door", "locked": true })
        );
    }

    #[test]
    fn nested_values_and_nulls_are_dropped() {
        let input = tags(json!({
            "ids": [1, 2, 3],
            "flags": [true, false],
            "nested": [[1], [2]],
            "with_null": [1, null],
            "dict": { "a": 1 },
            "nothing": null,
            "empty": []
        }));

        let props = filter_props(&input);
        let keys = props.keys().map(String::as_str).collect::<Vec<_>>();

        assert_eq!(keys, vec!["empty", "flags", "ids"]);
        assert_eq!(serde_json::to_value(&props["empty"]).unwrap(), json!([]));
    }

    #[test]
    fn lists_mixing_scalar_kinds_are_kept() {
        let input = tags(json!({
            "mixed_scalars": [1, "x"],
            "num_bool": [1, true],
            "all_three": [2.5, "y", false]
        }));

        let props = filter_props(&input);

        assert_eq!(
            serde_json::to_value(&props).unwrap(),
            json!({
                "all_three": [2.5, "y", false],
                "mixed_scalars": [1, "x"],
                "num_bool": [1, true]
            })
        );
    }

    #[test]
    fn output_order_is_stable() {
        let input = tags(json!({ "z": 1, "a": 2, "m": 3 }));

        let first = serde_json::to_string(&filter_props(&input)).unwrap();
        let second = serde_json::to_string(&filter_props(&input)).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, r#"{"a":2,"m":3,"z":1}"#);
    }
}
