//! Selection of pickles by tag expression and scenario name.

use crate::{pickle::Pickle, tag::TagExpr};

/// Combined pickle filter: a tag expression ANDed with an exact-match
/// scenario-name list. An empty name list matches every pickle.
#[derive(Clone, Debug)]
pub struct PickleFilter {
    tags: TagExpr,
    names: Vec<String>,
}

impl PickleFilter {
    /// Creates a filter from its two parts.
    #[must_use]
    pub fn new(tags: TagExpr, names: Vec<String>) -> Self {
        Self { tags, names }
    }

    /// Indicates whether one pickle passes both filters.
    #[must_use]
    pub fn matches(&self, pickle: &Pickle) -> bool {
        self.tags.matches(&pickle.tags)
            && (self.names.is_empty()
                || self.names.contains(&pickle.name))
    }

    /// Keeps the matching pickles, preserving input order.
    #[must_use]
    pub fn apply(&self, pickles: Vec<Pickle>) -> Vec<Pickle> {
        let total = pickles.len();
        let kept: Vec<_> =
            pickles.into_iter().filter(|p| self.matches(p)).collect();
        if kept.len() != total {
            log::debug!("filtered {total} pickle(s) down to {}", kept.len());
        }
        kept
    }
}
