// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Ingestion of prerequisite facts into the graph store
//!
//! Both entry points classify every raw prerequisite name the same way and
//! write a fresh record (score 0, no dependents) for the package:
//!
//! - discovery resolves, fetches and reads each package on a worklist, one
//!   package at a time, logging and skipping per-package failures
//! - bulk import reads pre-extracted pairs from a relational snapshot and
//!   rebuilds the whole store from them

use crate::config::IngestOptions;
use crate::error::{DepGraphError, Result};
use crate::graph::DependencyGraph;
use crate::resolver::Resolver;
use crate::snapshot::RelationalSnapshot;
use crate::types::{Classification, PackageRecord, Worklist};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Whether an edge to a package by `theirs` crosses authors, seen from `own`
///
/// A prerequisite with no known author is not credited as cross-author.
/// An empty `own` id never matches a real one.
#[must_use]
pub fn cross_author(own: &str, theirs: &str) -> bool {
    !theirs.is_empty() && own != theirs
}

/// What happened during an ingestion call
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Ids written to the store
    pub ingested: Vec<String>,
    /// Names passed over without error (already processed, ignored, bundles)
    pub skipped: Vec<String>,
    /// Names that failed, with the reason
    pub failed: Vec<(String, DepGraphError)>,
}

impl IngestReport {
    /// Nothing was written and nothing failed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ingested.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }
}

enum Discovery {
    Ingested(String),
    Skipped,
}

/// Merges resolved prerequisite facts into a [`DependencyGraph`]
pub struct Ingestor<'r> {
    resolver: &'r dyn Resolver,
    ignore: HashSet<String>,
    core: HashSet<String>,
    excluded: HashSet<String>,
    processed: HashSet<String>,
}

impl<'r> Ingestor<'r> {
    /// Create an ingestor over `resolver`
    ///
    /// Ignored and skipped names start out as already processed.
    #[must_use]
    pub fn new(resolver: &'r dyn Resolver, options: &IngestOptions) -> Self {
        let ignore: HashSet<String> = options.ignore.iter().cloned().collect();
        let excluded: HashSet<String> = ignore.iter().chain(&options.skip).cloned().collect();

        Self {
            resolver,
            ignore,
            core: options.core.iter().cloned().collect(),
            processed: excluded.clone(),
            excluded,
        }
    }

    /// Whether discovery would pass over `id`
    #[must_use]
    pub fn is_processed(&self, id: &str) -> bool {
        self.processed.contains(id)
    }

    /// Classify one raw prerequisite name for a package by `own_author`
    #[must_use]
    pub fn classify(&self, raw: &str, own_author: &str) -> Classification {
        if self.ignore.contains(raw) {
            return Classification::Ignore;
        }
        if self.core.contains(raw) || self.resolver.is_standard_library(raw) {
            return Classification::StandardLibrary;
        }

        match self.resolver.resolve(raw) {
            None => Classification::Unresolvable(raw.to_string()),
            Some(res) if self.ignore.contains(&res.canonical_id) => Classification::Ignore,
            Some(res) if res.is_core_library => Classification::StandardLibrary,
            Some(res) => Classification::Normal {
                cross_author: cross_author(own_author, &res.author_id),
                id: res.canonical_id,
            },
        }
    }

    fn build_record<'a>(
        &self,
        author_name: &str,
        author_id: &str,
        raw_names: impl IntoIterator<Item = &'a str>,
    ) -> PackageRecord {
        let mut record = PackageRecord::new(author_name, author_id);

        for raw in raw_names {
            let class = self.classify(raw, author_id);
            debug!("  {} -> {:?}", raw, class);
            if let Some((id, cross)) = class.edge() {
                record.prereqs.insert(id.to_string(), cross);
            }
        }

        record
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Discover and ingest every package on `worklist`
    ///
    /// Per-package failures are logged and collected in the report. An empty
    /// worklist is logged as an invalid argument and ingests nothing.
    pub fn ingest_discovery(&mut self, graph: &mut DependencyGraph, worklist: &Worklist) -> IngestReport {
        let names = match worklist {
            Worklist::All => self.resolver.all_packages(),
            Worklist::Names(names) => names.clone(),
        };

        let mut report = IngestReport::default();
        if names.is_empty() {
            warn!("{}", DepGraphError::InvalidArgument("no packages to discover".into()));
            return report;
        }

        info!("Discovering prerequisites for {} packages", names.len());

        for name in names {
            match self.discover_one(graph, &name) {
                Ok(Discovery::Ingested(id)) => report.ingested.push(id),
                Ok(Discovery::Skipped) => report.skipped.push(name),
                Err(e) => {
                    warn!("Skipping {}: {}", name, e);
                    report.failed.push((name, e));
                }
            }
        }

        info!(
            "Discovery finished: {} ingested, {} skipped, {} failed",
            report.ingested.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    fn discover_one(&mut self, graph: &mut DependencyGraph, name: &str) -> Result<Discovery> {
        if self.processed.contains(name) {
            debug!("{} already processed", name);
            return Ok(Discovery::Skipped);
        }

        let res = self
            .resolver
            .resolve(name)
            .ok_or_else(|| DepGraphError::PackageResolutionFailed {
                name: name.to_string(),
            })?;

        if res.is_meta_bundle {
            debug!("{} is a meta-bundle, nothing to ingest", res.canonical_id);
            return Ok(Discovery::Skipped);
        }
        if self.processed.contains(&res.canonical_id) {
            debug!("{} already processed", res.canonical_id);
            return Ok(Discovery::Skipped);
        }

        // Removed when dropped, whichever way this function returns
        let workspace = tempfile::Builder::new()
            .prefix("cpan-depgraph-")
            .tempdir()
            .map_err(|e| DepGraphError::io(e, std::env::temp_dir()))?;

        let dir = self.resolver.fetch_and_extract(&res.canonical_id, workspace.path())?;
        let raw = self.resolver.extract_declared_prereqs(&dir)?;

        info!("Processing {} ({} declared prerequisites)", res.canonical_id, raw.len());
        let record = self.build_record(&res.author_name, &res.author_id, raw.iter().map(String::as_str));
        graph.insert(res.canonical_id.clone(), record);
        self.processed.insert(res.canonical_id.clone());

        Ok(Discovery::Ingested(res.canonical_id))
    }

    // =========================================================================
    // Bulk import
    // =========================================================================

    /// Rebuild `graph` from a relational snapshot
    ///
    /// A package's own author id comes from the resolver when it knows the
    /// package, and from the snapshot row otherwise.
    pub fn ingest_bulk(&mut self, graph: &mut DependencyGraph, snapshot: &RelationalSnapshot) -> IngestReport {
        let mut fresh = DependencyGraph::new();
        let mut report = IngestReport::default();
        let prereqs = snapshot.prereqs_by_distribution();

        for dist in &snapshot.distributions {
            if self.excluded.contains(&dist.name) {
                debug!("{} is excluded", dist.name);
                report.skipped.push(dist.name.clone());
                continue;
            }

            let live = self.resolver.resolve(&dist.name);
            if live.as_ref().is_some_and(|res| res.is_meta_bundle) {
                debug!("{} is a meta-bundle, nothing to ingest", dist.name);
                report.skipped.push(dist.name.clone());
                continue;
            }

            let (author_name, author_id) = match &live {
                Some(res) => (res.author_name.as_str(), res.author_id.as_str()),
                None => {
                    debug!("{} not known to the resolver, using snapshot author {}", dist.name, dist.cpanid);
                    (dist.author.as_str(), dist.cpanid.as_str())
                }
            };

            let raw = prereqs.get(&dist.dist_id).cloned().unwrap_or_default();
            let record = self.build_record(author_name, author_id, raw);
            fresh.insert(dist.name.clone(), record);
            report.ingested.push(dist.name.clone());
        }

        info!(
            "Bulk import finished: {} ingested, {} skipped, {} edges",
            report.ingested.len(),
            report.skipped.len(),
            fresh.edge_count()
        );
        *graph = fresh;
        report
    }

    /// Read a SQLite snapshot from `path` and rebuild `graph` from it
    ///
    /// `graph` is only replaced once the snapshot has been read completely.
    pub fn ingest_bulk_file(&mut self, graph: &mut DependencyGraph, path: &Path) -> Result<IngestReport> {
        let snapshot = RelationalSnapshot::read_sqlite(path)?;
        Ok(self.ingest_bulk(graph, &snapshot))
    }
}
