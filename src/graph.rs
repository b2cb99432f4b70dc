// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Graph store for distribution records, with snapshot persistence

use crate::error::{DepGraphError, Result};
use crate::scorer::{self, ScoreSummary};
use crate::types::PackageRecord;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// The prerequisite graph: one record per distribution id
///
/// Records are never removed during a run. Loading a snapshot replaces the
/// whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    records: BTreeMap<String, PackageRecord>,
}

impl DependencyGraph {
    /// Create a new empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from already assembled records
    #[must_use]
    pub fn from_records(records: BTreeMap<String, PackageRecord>) -> Self {
        Self { records }
    }

    // =========================================================================
    // Store operations
    // =========================================================================

    /// Get a record by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PackageRecord> {
        self.records.get(id)
    }

    /// Check whether a record exists
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Get the record for `id`, creating an empty one if needed
    pub fn get_or_create(&mut self, id: &str) -> &mut PackageRecord {
        if !self.records.contains_key(id) {
            debug!("Creating partial record for {}", id);
        }
        self.records.entry(id.to_owned()).or_default()
    }

    /// Insert a record, replacing any previous record for the same id
    pub fn insert(&mut self, id: impl Into<String>, record: PackageRecord) -> Option<PackageRecord> {
        self.records.insert(id.into(), record)
    }

    /// Set the prerequisite edge `source -> target`, overwriting its flag
    pub fn set_prereq(&mut self, source: &str, target: &str, cross_author: bool) {
        self.get_or_create(source)
            .prereqs
            .insert(target.to_owned(), cross_author);
    }

    /// Record that `dependent` uses `target`, overwriting its flag
    pub fn set_used_by(&mut self, target: &str, dependent: &str, cross_author: bool) {
        self.get_or_create(target)
            .used_by
            .insert(dependent.to_owned(), cross_author);
    }

    /// Add to a record's score
    pub fn add_to_score(&mut self, id: &str, amount: u64) {
        let record = self.get_or_create(id);
        record.score = record.score.saturating_add(amount);
    }

    /// Zero every score and drop every reverse edge
    pub fn reset_scores(&mut self) {
        for record in self.records.values_mut() {
            record.score = 0;
            record.used_by.clear();
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All records keyed by id
    #[must_use]
    pub fn records(&self) -> &BTreeMap<String, PackageRecord> {
        &self.records
    }

    /// All record ids in sorted order
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// Mapping of id to score
    #[must_use]
    pub fn scores(&self) -> BTreeMap<String, u64> {
        self.records
            .iter()
            .map(|(id, record)| (id.clone(), record.score))
            .collect()
    }

    /// Ids with their scores, highest first, ties broken by id
    #[must_use]
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<_> = self
            .records
            .iter()
            .map(|(id, record)| (id.as_str(), record.score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the graph is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total number of prerequisite edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.records.values().map(|r| r.prereqs.len()).sum()
    }

    /// Strongly connected groups of records that depend on each other
    ///
    /// Each cycle is sorted by id, and the list is sorted too. Edges to ids
    /// without a record are ignored.
    #[must_use]
    pub fn dependency_cycles(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraph<&str, bool> = DiGraph::new();
        let mut indices: HashMap<&str, NodeIndex> = HashMap::new();

        for id in self.records.keys() {
            indices.insert(id.as_str(), graph.add_node(id.as_str()));
        }

        for (id, record) in &self.records {
            let from = indices[id.as_str()];
            for (target, &cross) in &record.prereqs {
                if let Some(&to) = indices.get(target.as_str()) {
                    graph.add_edge(from, to, cross);
                }
            }
        }

        let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut ids: Vec<String> = scc.iter().map(|&n| graph[n].to_string()).collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }

    // =========================================================================
    // Scoring
    // =========================================================================

    /// Recompute every score from scratch
    pub fn score(&mut self) -> ScoreSummary {
        scorer::calculate_score(self)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Render the graph snapshot as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Parse a graph snapshot
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content).map(Self::from_records)
    }

    /// Read a graph snapshot from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| DepGraphError::io(e, path))?;
        let graph = Self::from_json(&content).map_err(|e| DepGraphError::MalformedSnapshotFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        info!("Loaded {} records from {}", graph.len(), path.display());
        Ok(graph)
    }

    /// Replace the whole store with a snapshot from disk
    ///
    /// On error the current contents are left untouched.
    pub fn import(&mut self, path: &Path) -> Result<()> {
        *self = Self::load(path)?;
        Ok(())
    }

    /// Write the graph snapshot to `path`
    ///
    /// The snapshot is written to a sibling temporary file and renamed over
    /// the target, so readers see either the old or the new file.
    pub fn export(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| DepGraphError::io(e, dir))?;

        let json = self.to_json()?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| DepGraphError::io(e, dir))?;
        if let Err(e) = writeln!(tmp, "{json}") {
            return Err(DepGraphError::io(e, tmp.path()));
        }
        tmp.persist(path).map_err(|e| DepGraphError::io(e.error, path))?;

        info!("Exported {} records to {}", self.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_graph() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph.insert(
            "App-Thing",
            PackageRecord::new("Ann Author", "ANN")
                .with_prereq("Foo-Bar", true)
                .with_prereq("App-Thing-Util", false),
        );
        graph.insert("Foo-Bar", PackageRecord::new("Bob Builder", "BOB"));
        graph.insert("App-Thing-Util", PackageRecord::new("Ann Author", "ANN"));
        graph
    }

    #[test]
    fn test_set_prereq_overwrites_flag() {
        let mut graph = DependencyGraph::new();
        graph.set_prereq("A", "B", true);
        graph.set_prereq("A", "B", false);

        let record = graph.get("A").unwrap();
        assert_eq!(record.prereqs.len(), 1);
        assert!(!record.prereqs["B"]);
    }

    #[test]
    fn test_set_used_by_creates_partial_record() {
        let mut graph = DependencyGraph::new();
        graph.set_used_by("Target", "User", true);

        let record = graph.get("Target").unwrap();
        assert!(record.cpanid.is_empty());
        assert!(record.used_by["User"]);
    }

    #[test]
    fn test_add_to_score_accumulates() {
        let mut graph = DependencyGraph::new();
        graph.add_to_score("A", 2);
        graph.add_to_score("A", 3);
        assert_eq!(graph.get("A").unwrap().score, 5);
    }

    #[test]
    fn test_ranked_orders_by_score_then_id() {
        let mut graph = sample_graph();
        graph.add_to_score("Foo-Bar", 4);
        graph.add_to_score("App-Thing-Util", 4);

        let ranked = graph.ranked();
        assert_eq!(ranked[0], ("App-Thing-Util", 4));
        assert_eq!(ranked[1], ("Foo-Bar", 4));
        assert_eq!(ranked[2], ("App-Thing", 0));
    }

    #[test]
    fn test_export_import_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("prereqs.json");

        let mut graph = sample_graph();
        graph.score();
        graph.export(&path).unwrap();

        let mut loaded = DependencyGraph::new();
        loaded.import(&path).unwrap();
        assert_eq!(loaded, graph);
    }

    #[test]
    fn test_export_overwrites_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prereqs.json");
        fs::write(&path, "stale").unwrap();

        sample_graph().export(&path).unwrap();

        let loaded = DependencyGraph::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn test_snapshot_field_layout() {
        let json = sample_graph().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let record = value["App-Thing"].as_object().unwrap();
        let mut keys: Vec<_> = record.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["author", "cpanid", "prereqs", "score", "used_by"]);
        assert_eq!(value["App-Thing"]["prereqs"]["Foo-Bar"], 1);
        assert_eq!(value["App-Thing"]["prereqs"]["App-Thing-Util"], 0);
    }

    #[test]
    fn test_malformed_import_keeps_state() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, r#"{"A": {"author": "x"}"#).unwrap();

        let mut graph = sample_graph();
        let err = graph.import(&path).unwrap_err();

        assert!(matches!(err, DepGraphError::MalformedSnapshotFile { .. }));
        assert_eq!(graph, sample_graph());
    }

    #[test]
    fn test_missing_import_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = DependencyGraph::load(&temp_dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, DepGraphError::Io { .. }));
    }

    #[test]
    fn test_dependency_cycles() {
        let mut graph = sample_graph();
        graph.set_prereq("Foo-Bar", "App-Thing", true);
        graph.set_prereq("Loner", "Loner", false);
        graph.set_prereq("Loner", "Not-Ingested", true);

        let cycles = graph.dependency_cycles();
        assert_eq!(
            cycles,
            vec![
                vec!["App-Thing".to_string(), "Foo-Bar".to_string()],
                vec!["Loner".to_string()],
            ]
        );
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        assert!(sample_graph().dependency_cycles().is_empty());
    }
}
