use std::fmt;

use serde::{Deserialize, Serialize};

/// A revision number of a commit in the configuration repository.
///
/// A revision number is an integer which refers to a specific point of
/// repository history. When a repository is created, it starts with an
/// initial commit whose revision is 1. As new commits are added, each
/// commit gets its own revision number, monotonically increasing from the
/// previous commit's revision: 1, 2, 3, ...
///
/// [`Revision::HEAD`] is a sentinel meaning "the latest known revision". It
/// must be resolved to a concrete, positive revision (see
/// [`Revision::resolve`]) before it can be compared against another
/// revision; ordering on an unresolved `HEAD` is not meaningful.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Revision(i64);

impl Revision {
    /// The sentinel revision meaning "latest known", also called `HEAD`.
    pub const HEAD: Revision = Revision(-1);
    /// The first revision a repository is created with.
    pub const INIT: Revision = Revision(1);

    /// Builds a revision from a raw integer. Does not validate that a
    /// positive value actually exists in any particular repository.
    pub fn new(value: i64) -> Self {
        Revision(value)
    }

    /// The raw integer value, including the `HEAD` sentinel (`-1`).
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// True if this revision is the unresolved `HEAD` sentinel.
    pub fn is_head(&self) -> bool {
        *self == Revision::HEAD
    }

    /// Resolves `HEAD` against the given concrete latest revision,
    /// otherwise returns `self` unchanged. Comparing two revisions without
    /// resolving `HEAD` first produces a meaningless ordering, since `HEAD`
    /// is encoded as `-1`.
    pub fn resolve(self, latest: Revision) -> Revision {
        if self.is_head() { latest } else { self }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for Revision {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Revision {
    /// Standard integer comparison. Callers are responsible for resolving
    /// `HEAD` beforehand; comparing an unresolved `HEAD` against a concrete
    /// revision compares `-1` against that revision, which is never what a
    /// caller wants.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// `baseline < revision`. Equality or `baseline` being newer is not
/// eligible: a watch registered with an already-current baseline must
/// wait for the next commit past it.
pub fn is_eligible(baseline: Revision, revision: Revision) -> bool {
    baseline < revision
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_resolves_to_latest() {
        assert_eq!(Revision::HEAD.resolve(Revision::new(42)), Revision::new(42));
        assert_eq!(Revision::new(7).resolve(Revision::new(42)), Revision::new(7));
    }

    #[test]
    fn eligibility_is_strict() {
        let baseline = Revision::new(5);
        assert!(!is_eligible(baseline, Revision::new(5)));
        assert!(!is_eligible(baseline, Revision::new(4)));
        assert!(is_eligible(baseline, Revision::new(6)));
    }

    #[test]
    fn ordering_is_integer_ordering() {
        assert!(Revision::new(1) < Revision::new(2));
        assert!(Revision::INIT < Revision::new(2));
    }

    #[test]
    fn display_matches_raw_value() {
        assert_eq!(Revision::new(9).to_string(), "9");
        assert_eq!(Revision::HEAD.to_string(), "-1");
    }
}
