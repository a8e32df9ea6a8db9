use serde_json::{Number, Value};

/// Structural JSON equality: numbers compare by numeric value (so `1`
/// equals `1.0`), strings by bytes, arrays element-wise in order, objects
/// by key-set equality with pairwise-equal values.
///
/// `serde_json::Value`'s derived `PartialEq` does *not* give us this;
/// it distinguishes a `Number` built from an integer literal from one
/// built from a float literal even when they denote the same value, which
/// the patch engine's `test`/`safeReplace` contract explicitly rules out.
pub fn deep_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_eq(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| deep_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|v2| deep_eq(v, v2)))
        }
        _ => false,
    }
}

fn numbers_eq(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_and_float_literal_are_equal() {
        assert!(deep_eq(&json!(1), &json!(1.0)));
    }

    #[test]
    fn objects_compare_by_key_set_not_insertion_order() {
        assert!(deep_eq(&json!({"a": 1, "b": 2}), &json!({"b": 2, "a": 1})));
    }

    #[test]
    fn arrays_compare_element_wise_in_order() {
        assert!(!deep_eq(&json!([1, 2]), &json!([2, 1])));
        assert!(deep_eq(&json!([1, 2]), &json!([1, 2])));
    }

    #[test]
    fn differing_key_sets_are_unequal() {
        assert!(!deep_eq(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
    }
}
