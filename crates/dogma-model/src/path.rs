use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A slash-rooted location inside a repository, e.g. `/configs/staging.json`.
///
/// A path begins with `/`; segments are separated by `/` and may contain any
/// character except `/` and NUL. A trailing `/` is rejected: paths name
/// entries, not directories-as-a-concept, within this core.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Path(String);

/// Rejection reason for a malformed [`Path`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path must begin with '/': {0:?}")]
    MissingLeadingSlash(String),
    #[error("path must not end with '/': {0:?}")]
    TrailingSlash(String),
    #[error("path must not contain NUL: {0:?}")]
    ContainsNul(String),
    #[error("path must not be empty")]
    Empty,
}

impl Path {
    /// Parses and validates a path string.
    pub fn parse(raw: impl Into<String>) -> Result<Self, PathError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        if !raw.starts_with('/') {
            return Err(PathError::MissingLeadingSlash(raw));
        }
        if raw.len() > 1 && raw.ends_with('/') {
            return Err(PathError::TrailingSlash(raw));
        }
        if raw.contains('\0') {
            return Err(PathError::ContainsNul(raw));
        }
        Ok(Path(raw))
    }

    /// The path as a plain `&str`, e.g. `/a/b`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `/`-separated segments, excluding the empty leading segment.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').skip(1)
    }
}

impl TryFrom<String> for Path {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Path::parse(value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_paths() {
        assert!(Path::parse("/a/b/c").is_ok());
        assert!(Path::parse("/").is_ok());
    }

    #[test]
    fn rejects_missing_leading_slash() {
        assert!(matches!(
            Path::parse("a/b"),
            Err(PathError::MissingLeadingSlash(_))
        ));
    }

    #[test]
    fn rejects_trailing_slash() {
        assert!(matches!(
            Path::parse("/a/b/"),
            Err(PathError::TrailingSlash(_))
        ));
    }

    #[test]
    fn rejects_nul() {
        assert!(matches!(
            Path::parse("/a\0b"),
            Err(PathError::ContainsNul(_))
        ));
    }

    #[test]
    fn segments_skip_leading_empty_segment() {
        let path = Path::parse("/a/b/c").unwrap();
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
