// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Relational snapshot of the package index
//!
//! The snapshot is a SQLite file with two tables:
//!
//! ```sql
//! CREATE TABLE dists   (dist_id INTEGER, dist_name TEXT, cpanid TEXT, author TEXT);
//! CREATE TABLE prereqs (dist_id INTEGER, prereq TEXT);
//! ```
//!
//! `prereqs` holds one raw prerequisite name per row and may repeat names.

use crate::error::{DepGraphError, Result};
use crate::resolver::Resolver;
use crate::types::Resolution;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::info;

/// One row of `dists`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionRow {
    /// Row key joined against `prereqs`
    pub dist_id: i64,
    /// Canonical distribution id
    pub name: String,
    /// Author short id as recorded in the snapshot
    pub cpanid: String,
    /// Author display name as recorded in the snapshot
    pub author: String,
}

impl DistributionRow {
    /// Build a row
    pub fn new(dist_id: i64, name: impl Into<String>, cpanid: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            dist_id,
            name: name.into(),
            cpanid: cpanid.into(),
            author: author.into(),
        }
    }
}

/// One row of `prereqs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrereqRow {
    /// Owning distribution
    pub dist_id: i64,
    /// Raw prerequisite name
    pub prereq: String,
}

impl PrereqRow {
    /// Build a row
    pub fn new(dist_id: i64, prereq: impl Into<String>) -> Self {
        Self {
            dist_id,
            prereq: prereq.into(),
        }
    }
}

/// Both tables, fully read into memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationalSnapshot {
    /// Rows of `dists`
    pub distributions: Vec<DistributionRow>,
    /// Rows of `prereqs`
    pub prereqs: Vec<PrereqRow>,
}

impl RelationalSnapshot {
    /// Distinct, trimmed, non-empty prerequisite names per distribution
    #[must_use]
    pub fn prereqs_by_distribution(&self) -> HashMap<i64, BTreeSet<&str>> {
        let mut grouped: HashMap<i64, BTreeSet<&str>> = HashMap::new();
        for row in &self.prereqs {
            let name = row.prereq.trim();
            if !name.is_empty() {
                grouped.entry(row.dist_id).or_default().insert(name);
            }
        }
        grouped
    }

    /// Read a SQLite snapshot, blocking the current thread
    ///
    /// Must not be called from inside an async runtime.
    pub fn read_sqlite(path: &Path) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DepGraphError::io(e, path))?;
        runtime.block_on(Self::read_sqlite_async(path))
    }

    /// Read a SQLite snapshot
    pub async fn read_sqlite_async(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DepGraphError::io(
                std::io::Error::new(std::io::ErrorKind::NotFound, "snapshot not found"),
                path,
            ));
        }

        let options = SqliteConnectOptions::new().filename(path).read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let result = Self::read_tables(&pool).await.map_err(|e| DepGraphError::MalformedSnapshotFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        });
        pool.close().await;

        let snapshot = result?;
        info!(
            "Read {} distributions and {} prerequisite rows from {}",
            snapshot.distributions.len(),
            snapshot.prereqs.len(),
            path.display()
        );
        Ok(snapshot)
    }

    async fn read_tables(pool: &SqlitePool) -> std::result::Result<Self, sqlx::Error> {
        let distributions = sqlx::query_as::<_, (i64, String, Option<String>, Option<String>)>(
            "SELECT dist_id, dist_name, cpanid, author FROM dists ORDER BY dist_id",
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|(dist_id, name, cpanid, author)| {
            DistributionRow::new(dist_id, name, cpanid.unwrap_or_default(), author.unwrap_or_default())
        })
        .collect();

        let prereqs = sqlx::query_as::<_, (i64, Option<String>)>(
            "SELECT dist_id, prereq FROM prereqs ORDER BY dist_id",
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .filter_map(|(dist_id, prereq)| prereq.map(|p| PrereqRow::new(dist_id, p)))
        .collect();

        Ok(Self {
            distributions,
            prereqs,
        })
    }
}

/// Resolver answering from the snapshot's own `dists` table
///
/// Used for bulk imports when no live index is available. It cannot fetch
/// distributions, and leaves standard-library detection to the ingestor's
/// configured core module list.
#[derive(Debug)]
pub struct SnapshotResolver<'a> {
    by_name: HashMap<&'a str, &'a DistributionRow>,
}

impl<'a> SnapshotResolver<'a> {
    /// Index the distributions of `snapshot`
    #[must_use]
    pub fn new(snapshot: &'a RelationalSnapshot) -> Self {
        Self {
            by_name: snapshot
                .distributions
                .iter()
                .map(|row| (row.name.as_str(), row))
                .collect(),
        }
    }

    /// The distribution row for a module or distribution name
    ///
    /// A module name that is not itself a distribution falls back to the
    /// longest `::`-prefix that is, so `Foo::Bar::Util` maps to `Foo-Bar`.
    fn lookup(&self, name: &str) -> Option<&'a DistributionRow> {
        let mut candidate = name;
        loop {
            if let Some(&row) = self.by_name.get(candidate.replace("::", "-").as_str()) {
                return Some(row);
            }
            candidate = &candidate[..candidate.rfind("::")?];
        }
    }
}

impl Resolver for SnapshotResolver<'_> {
    fn resolve(&self, name: &str) -> Option<Resolution> {
        let row = self.lookup(name)?;

        Some(Resolution {
            is_meta_bundle: row.name.starts_with("Bundle-"),
            canonical_id: row.name.clone(),
            author_id: row.cpanid.clone(),
            author_name: row.author.clone(),
            is_core_library: false,
        })
    }

    fn all_packages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.keys().map(|name| (*name).to_string()).collect();
        names.sort();
        names
    }

    fn fetch_and_extract(&self, id: &str, _workspace: &Path) -> Result<PathBuf> {
        Err(DepGraphError::FetchExtractFailed {
            id: id.to_string(),
            message: "a relational snapshot holds no distribution archives".into(),
        })
    }

    fn is_standard_library(&self, _name: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prereqs_grouped_and_deduplicated() {
        let snapshot = RelationalSnapshot {
            distributions: vec![DistributionRow::new(1, "App", "ANN", "Ann")],
            prereqs: vec![
                PrereqRow::new(1, "Foo::Bar"),
                PrereqRow::new(1, " Foo::Bar "),
                PrereqRow::new(1, ""),
                PrereqRow::new(2, "Baz"),
            ],
        };

        let grouped = snapshot.prereqs_by_distribution();
        assert_eq!(grouped[&1].iter().copied().collect::<Vec<_>>(), vec!["Foo::Bar"]);
        assert_eq!(grouped[&2].len(), 1);
    }

    #[test]
    fn test_snapshot_resolver() {
        let snapshot = RelationalSnapshot {
            distributions: vec![
                DistributionRow::new(1, "Foo-Bar", "FOO", "Foo Person"),
                DistributionRow::new(2, "Bundle-Stuff", "BAR", "Bar Person"),
            ],
            prereqs: vec![],
        };
        let resolver = SnapshotResolver::new(&snapshot);

        let res = resolver.resolve("Foo::Bar").unwrap();
        assert_eq!(res.canonical_id, "Foo-Bar");
        assert_eq!(res.author_id, "FOO");
        assert!(!res.is_meta_bundle);
        assert!(resolver.resolve("Bundle::Stuff").unwrap().is_meta_bundle);
        assert!(resolver.resolve("Nope").is_none());
        assert!(resolver.resolve("Nope::Foo::Bar").is_none());
        assert_eq!(resolver.all_packages(), vec!["Bundle-Stuff", "Foo-Bar"]);
        assert!(resolver.fetch_and_extract("Foo-Bar", Path::new("/tmp")).is_err());
    }

    #[test]
    fn test_module_names_map_to_enclosing_distribution() {
        let snapshot = RelationalSnapshot {
            distributions: vec![
                DistributionRow::new(1, "Foo-Bar", "FOO", "Foo Person"),
                DistributionRow::new(2, "Foo-Bar-Util", "UTL", "Util Person"),
            ],
            prereqs: vec![],
        };
        let resolver = SnapshotResolver::new(&snapshot);

        assert_eq!(resolver.resolve("Foo::Bar::Parser").unwrap().canonical_id, "Foo-Bar");
        assert_eq!(resolver.resolve("Foo::Bar::Util::Deep").unwrap().canonical_id, "Foo-Bar-Util");
        assert_eq!(resolver.resolve("Foo::Bar::Util").unwrap().author_id, "UTL");
        assert!(resolver.resolve("Foo").is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RelationalSnapshot::read_sqlite(Path::new("/nonexistent/cpan.db")).unwrap_err();
        assert!(matches!(err, DepGraphError::Io { .. }));
    }
}
