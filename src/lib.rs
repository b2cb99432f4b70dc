// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! cpan-depgraph library - prerequisite graph and importance scores for CPAN
//!
//! Distributions are ingested either by discovery (resolve, fetch, read the
//! declared prerequisites) or in bulk from a relational snapshot. The scorer
//! then walks the prerequisite edges and credits every distribution for how
//! heavily and how deeply it is depended upon by other authors' work.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod ingest;
pub mod resolver;
pub mod scorer;
pub mod snapshot;

/// Core data types shared by the store, the ingestor and the scorer
pub mod types {
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    // =========================================================================
    // Package Record
    // =========================================================================

    /// One distribution in the graph store
    ///
    /// Field names are the on-disk names of the graph snapshot.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct PackageRecord {
        /// Author display name, informational only
        pub author: String,
        /// Author short id, used for same-author comparisons
        pub cpanid: String,
        /// Accumulated importance score
        pub score: u64,
        /// Prerequisite id -> cross-author flag
        #[serde(with = "edge_flags")]
        pub prereqs: BTreeMap<String, bool>,
        /// Dependent id -> cross-author flag, filled in by the scorer
        #[serde(with = "edge_flags")]
        pub used_by: BTreeMap<String, bool>,
    }

    impl PackageRecord {
        /// Create a freshly ingested record with no score and no dependents
        #[must_use]
        pub fn new(author: impl Into<String>, cpanid: impl Into<String>) -> Self {
            Self {
                author: author.into(),
                cpanid: cpanid.into(),
                ..Self::default()
            }
        }

        /// Builder-style helper to attach a prerequisite edge
        #[must_use]
        pub fn with_prereq(mut self, id: impl Into<String>, cross_author: bool) -> Self {
            self.prereqs.insert(id.into(), cross_author);
            self
        }
    }

    /// Edge flags are persisted as 0/1 integers rather than JSON booleans
    mod edge_flags {
        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer, Serializer};
        use std::collections::BTreeMap;

        pub(super) fn serialize<S>(map: &BTreeMap<String, bool>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_map(map.iter().map(|(id, &flag)| (id, u8::from(flag))))
        }

        pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, bool>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = BTreeMap::<String, u8>::deserialize(deserializer)?;
            raw.into_iter()
                .map(|(id, flag)| match flag {
                    0 => Ok((id, false)),
                    1 => Ok((id, true)),
                    other => Err(D::Error::custom(format!(
                        "edge flag for '{id}' must be 0 or 1, got {other}"
                    ))),
                })
                .collect()
        }
    }

    // =========================================================================
    // Resolver results
    // =========================================================================

    /// What the package index knows about a name
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Resolution {
        /// Canonical distribution id, e.g. `Foo-Bar`
        pub canonical_id: String,
        /// Author short id (may be empty when unknown)
        pub author_id: String,
        /// Author display name
        pub author_name: String,
        /// Part of the language's own standard library
        pub is_core_library: bool,
        /// Aggregate with no code of its own
        pub is_meta_bundle: bool,
    }

    /// Outcome of classifying one raw prerequisite name
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Classification {
        /// Runtime or meta package, never an edge
        Ignore,
        /// Ships with the language, not an external dependency
        StandardLibrary,
        /// Unknown to the index; kept as a cross-author edge under its raw name
        Unresolvable(String),
        /// Resolved distribution
        Normal {
            /// Canonical id of the prerequisite
            id: String,
            /// Maintained by somebody else
            cross_author: bool,
        },
    }

    impl Classification {
        /// The edge this classification contributes, if any
        #[must_use]
        pub fn edge(&self) -> Option<(&str, bool)> {
            match self {
                Self::Ignore | Self::StandardLibrary => None,
                Self::Unresolvable(raw) => Some((raw.as_str(), true)),
                Self::Normal { id, cross_author } => Some((id.as_str(), *cross_author)),
            }
        }
    }

    // =========================================================================
    // Discovery worklist
    // =========================================================================

    /// Packages to discover
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Worklist {
        /// Every package known to the index
        All,
        /// An explicit list of names
        Names(Vec<String>),
    }

    impl Worklist {
        /// Build a worklist from command-line style arguments
        #[must_use]
        pub fn from_args(all: bool, names: Vec<String>) -> Self {
            if all {
                Self::All
            } else {
                Self::Names(names)
            }
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{DepGraphError, Result};
    pub use crate::graph::DependencyGraph;
    pub use crate::types::*;
}

#[cfg(test)]
mod tests {
    use super::types::*;

    #[test]
    fn test_record_serializes_flags_as_integers() {
        let record = PackageRecord::new("Ann Author", "ANN")
            .with_prereq("Foo-Bar", true)
            .with_prereq("Baz", false);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["prereqs"]["Foo-Bar"], 1);
        assert_eq!(json["prereqs"]["Baz"], 0);
        assert_eq!(json["score"], 0);
        assert_eq!(json["cpanid"], "ANN");
    }

    #[test]
    fn test_record_rejects_out_of_range_flag() {
        let json = r#"{"author":"","cpanid":"","score":0,"prereqs":{"X":2},"used_by":{}}"#;
        let err = serde_json::from_str::<PackageRecord>(json).unwrap_err();
        assert!(err.to_string().contains("must be 0 or 1"));
    }

    #[test]
    fn test_record_rejects_unknown_fields() {
        let json = r#"{"author":"","cpanid":"","score":0,"prereqs":{},"used_by":{},"extra":1}"#;
        assert!(serde_json::from_str::<PackageRecord>(json).is_err());
    }

    #[test]
    fn test_classification_edges() {
        assert_eq!(Classification::Ignore.edge(), None);
        assert_eq!(Classification::StandardLibrary.edge(), None);
        assert_eq!(
            Classification::Unresolvable("Gone::Away".into()).edge(),
            Some(("Gone::Away", true))
        );
        let normal = Classification::Normal {
            id: "Foo".into(),
            cross_author: false,
        };
        assert_eq!(normal.edge(), Some(("Foo", false)));
    }

    #[test]
    fn test_worklist_from_args() {
        assert_eq!(Worklist::from_args(true, vec!["x".into()]), Worklist::All);
        assert_eq!(
            Worklist::from_args(false, vec!["x".into()]),
            Worklist::Names(vec!["x".into()])
        );
    }
}
