//! RFC 6902 JSON Patch engine, extended with `removeIfExists`,
//! `safeReplace`, and `testAbsence`.
//!
//! [`apply`] takes a current JSON value and an ordered [`JsonPatch`] and
//! returns a new value; it never mutates its input, and a failure partway
//! through the patch leaves the caller's value untouched (the engine
//! clones once up front and works against the clone).

mod engine;
mod equality;
mod operation;

pub use engine::{ApplyStrError, apply, apply_str};
pub use equality::deep_eq;
pub use operation::{JsonPatch, JsonPatchOperation, PatchDecodeError, PatchError};
