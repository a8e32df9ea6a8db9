use crate::{Path, Revision};

/// The minimal projection of a commit the notification core consumes: a
/// revision paired with one path it touched. A single commit that touches
/// several paths is announced to the registry as one `Notification` per
/// path (see `dogma-watch::Registry::notify`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub revision: Revision,
    pub path: Path,
}

impl Notification {
    pub fn new(revision: Revision, path: Path) -> Self {
        Self { revision, path }
    }
}
