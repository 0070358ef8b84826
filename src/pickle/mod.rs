//! Pickles: flattened, executable scenarios.
//!
//! A [`Pickle`] is what the executor runs. The [`compiler`] produces them
//! from cached features by prepending background steps, expanding
//! `Scenario Outline` examples and resolving step types. Once compiled, a
//! pickle is immutable.

pub(crate) mod compiler;

use std::collections::HashMap;

use serde::Serialize;

/// Cucumber step type, derived from the Gherkin keyword.
///
/// Conjunction keywords (`And`, `But`, `*`) inherit the type of the
/// previous step; a conjunction before any typed step is [`Unknown`].
///
/// The variant idents double as the wire spellings: the protocol keeps
/// this enum PascalCase, unlike statuses and encodings.
///
/// [`Unknown`]: PickleStepType::Unknown
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum PickleStepType {
    /// `Given` step.
    Context,

    /// `When` step.
    Action,

    /// `Then` step.
    Outcome,

    /// Unrecognised keyword, or a conjunction with nothing to inherit.
    Unknown,
}

/// A data table attached to a step.
///
/// The first row is conventionally a header; [`DataTable::hashes()`]
/// builds one map per body row keyed by it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DataTable {
    rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Creates a [`DataTable`] from raw rows.
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// All rows, header included.
    #[must_use]
    pub fn raw(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Body rows as maps keyed by the header row.
    #[must_use]
    pub fn hashes(&self) -> Vec<HashMap<String, String>> {
        let Some((header, body)) = self.rows.split_first() else {
            return Vec::new();
        };
        body.iter()
            .map(|row| {
                header
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// Indicates whether the table has no rows at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<Vec<&str>>> for DataTable {
    fn from(rows: Vec<Vec<&str>>) -> Self {
        Self::new(
            rows.into_iter()
                .map(|r| r.into_iter().map(str::to_owned).collect())
                .collect(),
        )
    }
}

/// Block argument of a [`PickleStep`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PickleArgument {
    /// A DocString block.
    DocString {
        /// DocString content, outline placeholders already substituted.
        content: String,
    },

    /// A data table, outline placeholders already substituted per cell.
    DataTable(DataTable),
}

/// One executable step of a [`Pickle`].
#[derive(Clone, Debug)]
pub struct PickleStep {
    /// Unique `step-N` id.
    pub id: String,

    /// Step text, outline placeholders already substituted.
    pub text: String,

    /// Resolved step type.
    pub ty: PickleStepType,

    /// Optional block argument.
    pub argument: Option<PickleArgument>,

    /// Ids of the AST nodes this step traces back to.
    pub ast_node_ids: Vec<String>,
}

/// A flattened, executable scenario.
#[derive(Clone, Debug)]
pub struct Pickle {
    /// Unique `pickle-N` id.
    pub id: String,

    /// URI of the feature the pickle came from.
    pub uri: String,

    /// Display name; outline pickles carry their example values.
    pub name: String,

    /// Gherkin dialect of the source feature.
    pub language: String,

    /// Background steps (feature, then rule) followed by scenario steps.
    pub steps: Vec<PickleStep>,

    /// Inherited tag names (feature ∪ rule ∪ scenario ∪ examples),
    /// without the `@` sigil.
    pub tags: Vec<String>,

    /// Ids of the AST nodes this pickle traces back to.
    pub ast_node_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_key_body_rows_by_header() {
        let table = DataTable::from(vec![
            vec!["name", "age"],
            vec!["Alice", "30"],
            vec!["Bob", "25"],
        ]);

        let hashes = table.hashes();
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[0].get("name").unwrap(), "Alice");
        assert_eq!(hashes[1].get("age").unwrap(), "25");
    }

    #[test]
    fn hashes_of_headerless_table_are_empty() {
        assert!(DataTable::default().hashes().is_empty());
    }
}
