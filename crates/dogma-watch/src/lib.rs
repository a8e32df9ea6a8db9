//! The commit-watch registry: lets a caller block on a path pattern until
//! the repository advances past a baseline revision, with at-most-once
//! delivery per registration.
//!
//! [`Registry`] owns a bounded, access-ordered map from compiled
//! [`dogma_pattern::PathPattern`] to the set of watches registered against
//! it. [`Registry::notify`] is the fan-out entry point a storage engine
//! calls once per changed path after committing a revision;
//! [`Registry::add`] is how a caller registers interest, getting back a
//! [`WatchHandle`] future; [`Registry::close`] terminates every
//! outstanding watch, e.g. on storage engine shutdown.

mod error;
mod registry;
mod watch;

pub use error::RegistryError;
pub use registry::{Registry, RegistryConfig};
pub use watch::{WatchHandle, WatchId, WatchOutcome};
