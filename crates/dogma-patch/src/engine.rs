use dogma_pointer::{JsonPointer, at, at_mut, decode_index, is_append};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::equality::deep_eq;
use crate::operation::{JsonPatch, JsonPatchOperation, PatchDecodeError, PatchError};

/// Applies `patch` to `value`, returning a new value. `value` itself is
/// never mutated: a working copy is cloned up front and every operation is
/// applied against that copy, so a failure midway leaves the caller's
/// value observationally unchanged and the partially-mutated copy is
/// simply dropped.
#[instrument(skip(value, patch), fields(operations = patch.operations().len()))]
pub fn apply(value: &Value, patch: &JsonPatch) -> Result<Value, PatchError> {
    let mut working = value.clone();
    for (index, operation) in patch.operations().iter().enumerate() {
        if let Err(error) = apply_one(&mut working, operation) {
            warn!(index, %error, "patch aborted, caller's value left unchanged");
            return Err(error);
        }
    }
    debug!("patch applied");
    Ok(working)
}

/// Parses `patch_json` as a [`JsonPatch`] and applies it to `value` in one
/// call, for callers that receive the patch as a raw JSON document (e.g.
/// an HTTP request body) rather than a pre-parsed structure.
#[instrument(skip(value, patch_json))]
pub fn apply_str(value: &Value, patch_json: &str) -> Result<Value, ApplyStrError> {
    let patch: JsonPatch =
        serde_json::from_str(patch_json).map_err(PatchDecodeError::Malformed)?;
    Ok(apply(value, &patch)?)
}

/// Combines decode and apply failures for [`apply_str`].
#[derive(Debug, thiserror::Error)]
pub enum ApplyStrError {
    #[error(transparent)]
    Decode(#[from] PatchDecodeError),
    #[error(transparent)]
    Patch(#[from] PatchError),
}

fn apply_one(doc: &mut Value, operation: &JsonPatchOperation) -> Result<(), PatchError> {
    match operation {
        JsonPatchOperation::Add { path, value } => {
            let pointer = parse_pointer(path)?;
            op_add(doc, &pointer, path, value.clone())
        }
        JsonPatchOperation::Remove { path } => {
            let pointer = parse_pointer(path)?;
            take_target(doc, &pointer, path, false).map(|_| ())
        }
        JsonPatchOperation::RemoveIfExists { path } => {
            let pointer = parse_pointer(path)?;
            take_target(doc, &pointer, path, true).map(|_| ())
        }
        JsonPatchOperation::Replace { path, value } => {
            let pointer = parse_pointer(path)?;
            op_replace(doc, &pointer, path, value.clone())
        }
        JsonPatchOperation::SafeReplace {
            path,
            old_value,
            new_value,
        } => {
            let pointer = parse_pointer(path)?;
            op_safe_replace(doc, &pointer, path, old_value, new_value.clone())
        }
        JsonPatchOperation::Test { path, value } => {
            let pointer = parse_pointer(path)?;
            op_test(doc, &pointer, path, value)
        }
        JsonPatchOperation::TestAbsence { path } => {
            let pointer = parse_pointer(path)?;
            op_test_absence(doc, &pointer, path)
        }
        JsonPatchOperation::Copy { from, path } => {
            let from_ptr = parse_pointer(from)?;
            let to_ptr = parse_pointer(path)?;
            let source = at(doc, &from_ptr)
                .cloned()
                .ok_or_else(|| PatchError::conflict(from, "source does not exist"))?;
            op_add(doc, &to_ptr, path, source)
        }
        JsonPatchOperation::Move { from, path } => {
            let from_ptr = parse_pointer(from)?;
            let to_ptr = parse_pointer(path)?;
            if from_ptr.is_proper_prefix_of(&to_ptr) {
                return Err(PatchError::conflict(
                    path,
                    "cannot move a node into its own subtree",
                ));
            }
            let value = take_target(doc, &from_ptr, from, false)?
                .expect("take_target with allow_missing=false always returns Some on success");
            op_add(doc, &to_ptr, path, value)
        }
    }
}

fn parse_pointer(raw: &str) -> Result<JsonPointer, PatchError> {
    JsonPointer::parse(raw).map_err(|e| PatchError::conflict(raw, e.to_string()))
}

fn op_add(doc: &mut Value, pointer: &JsonPointer, raw_path: &str, value: Value) -> Result<(), PatchError> {
    if pointer.is_root() {
        *doc = value;
        return Ok(());
    }
    let parent_ptr = pointer.parent();
    let last = pointer.last_token().expect("non-root pointer has a last token");
    let parent = at_mut(doc, &parent_ptr)
        .ok_or_else(|| PatchError::conflict(raw_path, "parent does not exist"))?;
    insert_into_container(parent, last, value, raw_path)
}

fn insert_into_container(
    parent: &mut Value,
    last: &str,
    value: Value,
    raw_path: &str,
) -> Result<(), PatchError> {
    match parent {
        Value::Object(map) => {
            map.insert(last.to_owned(), value);
            Ok(())
        }
        Value::Array(arr) => {
            if is_append(last) {
                arr.push(value);
                return Ok(());
            }
            let idx = decode_index(last)
                .map_err(|_| PatchError::conflict(raw_path, "invalid array index"))?;
            if idx > arr.len() {
                return Err(PatchError::conflict(raw_path, "array index out of range"));
            }
            arr.insert(idx, value);
            Ok(())
        }
        _ => Err(PatchError::conflict(raw_path, "parent is not a container")),
    }
}

/// Removes and returns the value at `pointer`. Returns `Ok(None)` only
/// when `allow_missing` is set and the target does not exist; otherwise a
/// missing target is a [`PatchError::Conflict`].
fn take_target(
    doc: &mut Value,
    pointer: &JsonPointer,
    raw_path: &str,
    allow_missing: bool,
) -> Result<Option<Value>, PatchError> {
    if pointer.is_root() {
        return Err(PatchError::conflict(raw_path, "empty path is not a valid remove target"));
    }
    let parent_ptr = pointer.parent();
    let last = pointer.last_token().expect("non-root pointer has a last token");

    let parent = match at_mut(doc, &parent_ptr) {
        Some(parent) => parent,
        None => return missing(raw_path, allow_missing),
    };

    match parent {
        Value::Object(map) => match map.remove(last) {
            Some(value) => Ok(Some(value)),
            None => missing(raw_path, allow_missing),
        },
        Value::Array(arr) => {
            if is_append(last) {
                return missing(raw_path, allow_missing);
            }
            match decode_index(last) {
                Ok(idx) if idx < arr.len() => Ok(Some(arr.remove(idx))),
                _ => missing(raw_path, allow_missing),
            }
        }
        _ => missing(raw_path, allow_missing),
    }
}

fn missing(raw_path: &str, allow_missing: bool) -> Result<Option<Value>, PatchError> {
    if allow_missing {
        Ok(None)
    } else {
        Err(PatchError::conflict(raw_path, "target does not exist"))
    }
}

fn op_replace(
    doc: &mut Value,
    pointer: &JsonPointer,
    raw_path: &str,
    value: Value,
) -> Result<(), PatchError> {
    let target = at_mut(doc, pointer)
        .ok_or_else(|| PatchError::conflict(raw_path, "target does not exist"))?;
    *target = value;
    Ok(())
}

fn op_safe_replace(
    doc: &mut Value,
    pointer: &JsonPointer,
    raw_path: &str,
    old_value: &Value,
    new_value: Value,
) -> Result<(), PatchError> {
    let target = at_mut(doc, pointer)
        .ok_or_else(|| PatchError::test_failed(raw_path, Some(old_value.clone()), None))?;
    if !deep_eq(target, old_value) {
        let actual = target.clone();
        return Err(PatchError::test_failed(
            raw_path,
            Some(old_value.clone()),
            Some(actual),
        ));
    }
    *target = new_value;
    Ok(())
}

fn op_test(doc: &Value, pointer: &JsonPointer, raw_path: &str, expected: &Value) -> Result<(), PatchError> {
    match at(doc, pointer) {
        Some(actual) if deep_eq(actual, expected) => Ok(()),
        Some(actual) => Err(PatchError::test_failed(
            raw_path,
            Some(expected.clone()),
            Some(actual.clone()),
        )),
        None => Err(PatchError::test_failed(raw_path, Some(expected.clone()), None)),
    }
}

fn op_test_absence(doc: &Value, pointer: &JsonPointer, raw_path: &str) -> Result<(), PatchError> {
    match at(doc, pointer) {
        None => Ok(()),
        Some(actual) => Err(PatchError::test_failed(raw_path, None, Some(actual.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::JsonPatchOperation as Op;
    use serde_json::json;

    fn patch(ops: Vec<Op>) -> JsonPatch {
        JsonPatch::new(ops)
    }

    #[test]
    fn test_then_replace_succeeds() {
        let doc = json!({"a": 1});
        let result = apply(
            &doc,
            &patch(vec![
                Op::Test { path: "/a".into(), value: json!(1) },
                Op::Replace { path: "/a".into(), value: json!(2) },
            ]),
        )
        .unwrap();
        assert_eq!(result, json!({"a": 2}));
    }

    #[test]
    fn failing_test_leaves_input_unchanged_and_aborts_whole_patch() {
        let doc = json!({"a": 1});
        let err = apply(
            &doc,
            &patch(vec![
                Op::Test { path: "/a".into(), value: json!(9) },
                Op::Replace { path: "/a".into(), value: json!(2) },
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, PatchError::TestFailed { .. }));
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn move_within_same_array_shifts_correctly() {
        let doc = json!({"a": [1, 2, 3]});
        let result = apply(
            &doc,
            &patch(vec![Op::Move { from: "/a/0".into(), path: "/a/2".into() }]),
        )
        .unwrap();
        assert_eq!(result, json!({"a": [2, 3, 1]}));
    }

    #[test]
    fn add_append_token_appends_to_array() {
        let doc = json!({"a": [1, 2, 3]});
        let result = apply(
            &doc,
            &patch(vec![Op::Add { path: "/a/-".into(), value: json!(4) }]),
        )
        .unwrap();
        assert_eq!(result, json!({"a": [1, 2, 3, 4]}));
    }

    #[test]
    fn move_rejects_moving_into_own_subtree() {
        let doc = json!({"a": {"b": 1}});
        let err = apply(
            &doc,
            &patch(vec![Op::Move { from: "/a".into(), path: "/a/b".into() }]),
        )
        .unwrap_err();
        assert!(matches!(err, PatchError::Conflict { .. }));
    }

    #[test]
    fn copy_duplicates_without_mutating_source() {
        let doc = json!({"a": {"x": 1}, "b": {}});
        let result = apply(
            &doc,
            &patch(vec![Op::Copy { from: "/a".into(), path: "/b/a".into() }]),
        )
        .unwrap();
        assert_eq!(result, json!({"a": {"x": 1}, "b": {"a": {"x": 1}}}));
    }

    #[test]
    fn remove_if_exists_is_a_no_op_when_missing() {
        let doc = json!({"a": 1});
        let result = apply(
            &doc,
            &patch(vec![Op::RemoveIfExists { path: "/missing".into() }]),
        )
        .unwrap();
        assert_eq!(result, doc);
    }

    #[test]
    fn plain_remove_on_missing_target_fails() {
        let doc = json!({"a": 1});
        let err = apply(&doc, &patch(vec![Op::Remove { path: "/missing".into() }])).unwrap_err();
        assert!(matches!(err, PatchError::Conflict { .. }));
    }

    #[test]
    fn safe_replace_requires_matching_old_value() {
        let doc = json!({"a": 1});
        let err = apply(
            &doc,
            &patch(vec![Op::SafeReplace {
                path: "/a".into(),
                old_value: json!(9),
                new_value: json!(2),
            }]),
        )
        .unwrap_err();
        match err {
            PatchError::TestFailed { expected, actual, .. } => {
                assert_eq!(expected, Some(json!(9)));
                assert_eq!(actual, Some(json!(1)));
            }
            _ => panic!("expected TestFailed"),
        }
    }

    #[test]
    fn safe_replace_treats_integer_and_float_old_value_as_equal() {
        let doc = json!({"a": 1});
        let result = apply(
            &doc,
            &patch(vec![Op::SafeReplace {
                path: "/a".into(),
                old_value: json!(1.0),
                new_value: json!(2),
            }]),
        )
        .unwrap();
        assert_eq!(result, json!({"a": 2}));
    }

    #[test]
    fn test_absence_succeeds_only_when_target_is_missing() {
        let doc = json!({"a": 1});
        apply(&doc, &patch(vec![Op::TestAbsence { path: "/b".into() }])).unwrap();
        let err = apply(&doc, &patch(vec![Op::TestAbsence { path: "/a".into() }])).unwrap_err();
        assert!(matches!(err, PatchError::TestFailed { expected: None, .. }));
    }

    #[test]
    fn empty_path_add_replaces_whole_document() {
        let doc = json!({"a": 1});
        let result = apply(
            &doc,
            &patch(vec![Op::Add { path: "".into(), value: json!({"b": 2}) }]),
        )
        .unwrap();
        assert_eq!(result, json!({"b": 2}));
    }

    #[test]
    fn patch_round_trips_through_json() {
        let original = patch(vec![
            Op::Add { path: "/a".into(), value: json!(1) },
            Op::Move { from: "/a".into(), path: "/b".into() },
        ]);
        let wire = serde_json::to_string(&original).unwrap();
        let decoded: JsonPatch = serde_json::from_str(&wire).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn unknown_op_discriminator_is_rejected() {
        let wire = r#"[{"op":"unknown","path":"/a"}]"#;
        let decoded: Result<JsonPatch, _> = serde_json::from_str(wire);
        assert!(decoded.is_err());
    }

    #[test]
    fn unknown_fields_on_known_operations_are_ignored() {
        let wire = r#"[{"op":"add","path":"/a","value":1,"extra":"ignored"}]"#;
        let decoded: JsonPatch = serde_json::from_str(wire).unwrap();
        assert_eq!(decoded.0, vec![Op::Add { path: "/a".into(), value: json!(1) }]);
    }
}
