use dogma_model::Mismatch;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A single JSON Patch operation, RFC 6902 plus the domain extensions
/// `removeIfExists`, `safeReplace`, and `testAbsence`.
///
/// `path`/`from` are carried as raw RFC 6901 pointer strings rather than
/// pre-parsed pointers, so that (de)serialization is exact and
/// `parse(serialize(patch)) == patch` holds without needing a canonical
/// pointer representation. Unknown fields on a recognized operation are
/// ignored (no `deny_unknown_fields`); an unrecognized `op` discriminator
/// is rejected by `serde`'s internally-tagged enum deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum JsonPatchOperation {
    Add { path: String, value: Value },
    Copy { from: String, path: String },
    Move { from: String, path: String },
    Remove { path: String },
    RemoveIfExists { path: String },
    Replace { path: String, value: Value },
    SafeReplace {
        path: String,
        #[serde(rename = "oldValue")]
        old_value: Value,
        #[serde(rename = "newValue")]
        new_value: Value,
    },
    Test { path: String, value: Value },
    TestAbsence { path: String },
}

/// An ordered, finite sequence of [`JsonPatchOperation`]s. Serializes as a
/// plain JSON array of operation objects (a newtype around `Vec` is
/// serde-transparent for a single-field tuple struct).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct JsonPatch(pub Vec<JsonPatchOperation>);

impl JsonPatch {
    pub fn new(operations: Vec<JsonPatchOperation>) -> Self {
        JsonPatch(operations)
    }

    pub fn operations(&self) -> &[JsonPatchOperation] {
        &self.0
    }
}

impl FromIterator<JsonPatchOperation> for JsonPatch {
    fn from_iter<T: IntoIterator<Item = JsonPatchOperation>>(iter: T) -> Self {
        JsonPatch(iter.into_iter().collect())
    }
}

/// Everything that can go wrong applying a [`JsonPatch`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatchError {
    /// Missing node, non-container parent, out-of-range index, or a
    /// `move` whose `from` is a proper prefix of its `to`.
    #[error("json patch conflict at {pointer}: {reason}")]
    Conflict { pointer: String, reason: String },

    /// `test`, `testAbsence`, or `safeReplace` did not hold.
    #[error("test failed at {pointer}")]
    TestFailed {
        pointer: String,
        expected: Option<Value>,
        actual: Option<Value>,
    },
}

impl PatchError {
    pub(crate) fn conflict(pointer: impl Into<String>, reason: impl Into<String>) -> Self {
        PatchError::Conflict {
            pointer: pointer.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn test_failed(
        pointer: impl Into<String>,
        expected: Option<Value>,
        actual: Option<Value>,
    ) -> Self {
        PatchError::TestFailed {
            pointer: pointer.into(),
            expected,
            actual,
        }
    }

    /// Projects this error onto the shared `dogma-model` mismatch payload,
    /// for callers matching across crate boundaries on a uniform shape.
    pub fn mismatch(&self) -> Option<Mismatch> {
        match self {
            PatchError::TestFailed {
                expected: Some(expected),
                actual,
                ..
            } => Some(Mismatch::new(expected.clone(), actual.clone())),
            _ => None,
        }
    }
}

/// Failure parsing a patch from its wire (JSON) form.
#[derive(Debug, Error)]
pub enum PatchDecodeError {
    #[error("malformed json patch: {0}")]
    Malformed(#[from] serde_json::Error),
}
