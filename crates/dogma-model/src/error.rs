//! Error vocabulary shared by the pointer, patch, and watch crates.
//!
//! This module intentionally does not define a single workspace-wide error
//! enum; each component crate has its own `thiserror`-derived error type
//! for its own failure modes (see `dogma-pattern::PatternError`,
//! `dogma-pointer::PointerError`, `dogma-patch::PatchError`,
//! `dogma-watch::RegistryError`). What lives here is the small set of
//! payload shapes those enums embed so that a caller matching across crate
//! boundaries sees a consistent pointer + mismatch vocabulary.

use serde_json::Value;

/// Payload attached to test-failure style errors (`test`, `testAbsence`,
/// `safeReplace`): what was expected and, when available, what was
/// actually observed at the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub expected: Value,
    pub actual: Option<Value>,
}

impl Mismatch {
    pub fn new(expected: Value, actual: Option<Value>) -> Self {
        Self { expected, actual }
    }
}
