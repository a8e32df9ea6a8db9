use dogma_pattern::PatternError;
use thiserror::Error;

/// Everything that can go wrong registering or delivering a watch.
#[derive(Debug, Error, Clone)]
pub enum RegistryError {
    /// The pattern passed to [`crate::Registry::add`] failed to compile.
    #[error("invalid watch pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    /// The registry was closed; surfaced through every outstanding watch's
    /// future and returned from any `add` attempted afterward.
    #[error("watch registry closed: {0}")]
    Closed(String),
}
