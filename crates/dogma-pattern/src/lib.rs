//! Glob-like path pattern compiler and matcher.
//!
//! A pattern is a comma-separated list of alternatives, each beginning with
//! `/`. Within an alternative, `*` matches exactly one path segment and
//! never crosses a `/`; `**` matches zero or more whole segments and is
//! greedy with backtracking. A path matches the pattern if it matches any
//! alternative.
//!
//! Compiling is the expensive part (parsing, validating, interning
//! segments); matching a compiled [`PathPattern`] against a candidate path
//! is cheap and allocation-free.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Reason a pattern string failed to compile.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern alternative must not be empty")]
    EmptyAlternative,
    #[error("pattern must not contain NUL")]
    ContainsNul,
    #[error("pattern alternative must begin with '/': {0:?}")]
    MissingLeadingSlash(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Literal(Arc<str>),
    Star,
    DoubleStar,
}

/// A compiled path pattern. Cheap to clone (segments are `Arc`-interned);
/// equality and hashing are content-based, so two `PathPattern`s built from
/// the same source string are interchangeable as map keys.
#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct PathPattern {
    canonical: Arc<str>,
    alternatives: Arc<Vec<Vec<Segment>>>,
}

impl PartialOrd for PathPattern {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathPattern {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Compiles a pattern string into a [`PathPattern`].
///
/// Fails with [`PatternError`] if any comma-separated alternative is empty
/// after trimming surrounding whitespace, contains a NUL byte, or does not
/// begin with `/`.
pub fn compile(pattern: &str) -> Result<PathPattern, PatternError> {
    if pattern.contains('\0') {
        return Err(PatternError::ContainsNul);
    }

    let mut alternatives = Vec::new();
    let mut canonical_parts = Vec::new();

    for raw in pattern.split(',') {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PatternError::EmptyAlternative);
        }
        if !trimmed.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(trimmed.to_owned()));
        }
        canonical_parts.push(trimmed.to_owned());
        alternatives.push(compile_alternative(trimmed));
    }

    Ok(PathPattern {
        canonical: canonical_parts.join(",").into(),
        alternatives: Arc::new(alternatives),
    })
}

fn compile_alternative(alternative: &str) -> Vec<Segment> {
    alternative
        .split('/')
        .skip(1)
        .map(|segment| match segment {
            "*" => Segment::Star,
            "**" => Segment::DoubleStar,
            literal => Segment::Literal(Arc::from(literal)),
        })
        .collect()
}

/// Tests whether `path` matches `pattern`. A trailing `/` on `path` (other
/// than the root path `/` itself) never matches anything.
pub fn matches(pattern: &PathPattern, path: &str) -> bool {
    if path.len() > 1 && path.ends_with('/') {
        return false;
    }
    let path_segments: Vec<&str> = if path == "/" {
        Vec::new()
    } else {
        path.split('/').skip(1).collect()
    };
    pattern
        .alternatives
        .iter()
        .any(|alternative| match_segments(alternative, &path_segments))
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.first() {
        None => path.is_empty(),
        Some(Segment::Literal(literal)) => match path.first() {
            Some(head) if *head == literal.as_ref() => match_segments(&pattern[1..], &path[1..]),
            _ => false,
        },
        Some(Segment::Star) => {
            if path.is_empty() {
                false
            } else {
                match_segments(&pattern[1..], &path[1..])
            }
        }
        Some(Segment::DoubleStar) => {
            // Greedy: try consuming the most segments first, backtracking
            // down to zero.
            (0..=path.len())
                .rev()
                .any(|consumed| match_segments(&pattern[1..], &path[consumed..]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_alternative() {
        assert_eq!(compile("/a,, /b"), Err(PatternError::EmptyAlternative));
    }

    #[test]
    fn rejects_missing_leading_slash() {
        assert!(matches!(
            compile("a/b"),
            Err(PatternError::MissingLeadingSlash(_))
        ));
    }

    #[test]
    fn rejects_nul() {
        assert_eq!(compile("/a\0b"), Err(PatternError::ContainsNul));
    }

    #[test]
    fn trims_whitespace_around_alternatives() {
        let pattern = compile(" /a/b , /c/d ").unwrap();
        assert!(matches(&pattern, "/a/b"));
        assert!(matches(&pattern, "/c/d"));
        assert!(!matches(&pattern, "/e/f"));
    }

    #[test]
    fn star_matches_single_segment_only() {
        let pattern = compile("/a/*").unwrap();
        assert!(matches(&pattern, "/a/b"));
        assert!(!matches(&pattern, "/a/b/c"));
        assert!(!matches(&pattern, "/a"));
    }

    #[test]
    fn double_star_matches_any_depth_including_zero() {
        let pattern = compile("/a/**").unwrap();
        assert!(matches(&pattern, "/a"));
        assert!(matches(&pattern, "/a/b"));
        assert!(matches(&pattern, "/a/b/c/d"));
    }

    #[test]
    fn double_star_backtracks_to_find_a_match() {
        let pattern = compile("/a/**/z").unwrap();
        assert!(matches(&pattern, "/a/z"));
        assert!(matches(&pattern, "/a/b/c/z"));
        assert!(!matches(&pattern, "/a/b/c"));
    }

    #[test]
    fn trailing_slash_on_path_never_matches() {
        let pattern = compile("/a/**").unwrap();
        assert!(!matches(&pattern, "/a/b/"));
        assert!(!matches(&pattern, "/"));
    }

    #[test]
    fn root_path_has_zero_segments() {
        let double_star = compile("/**").unwrap();
        assert!(matches(&double_star, "/"));

        let star = compile("/*").unwrap();
        assert!(!matches(&star, "/"));
    }

    #[test]
    fn equal_patterns_collide_as_map_keys() {
        use std::collections::HashMap;
        let a = compile("/a/*").unwrap();
        let b = compile("/a/*").unwrap();
        let mut map = HashMap::new();
        map.insert(a, "bucket");
        assert_eq!(map.get(&b), Some(&"bucket"));
    }

    #[test]
    fn compilation_is_idempotent() {
        let once = compile("/a/*,/b/**").unwrap();
        let twice = compile(&once.to_string()).unwrap();
        assert_eq!(once, twice);
    }
}
