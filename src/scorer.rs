// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Depth-weighted importance scoring
//!
//! Every record is used as a root and its prerequisites are walked depth
//! first. Each edge credits its target with the current depth when the edge
//! crosses authors, and nothing when it stays with the same author. Depth
//! grows by one per cross-author hop, so a distribution deep inside other
//! people's stacks is worth more than one used directly.
//!
//! Only records on the active path are guarded against re-entry. A record
//! reached again through another branch is walked again, so diamonds
//! accumulate one contribution per path.

use crate::graph::DependencyGraph;
use std::collections::HashSet;
use tracing::{debug, info, trace};

/// Counters from one scoring pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreSummary {
    /// Records used as walk roots
    pub roots: usize,
    /// Prerequisite edges followed, counting repeats
    pub edges_walked: u64,
    /// Re-entries refused because the record was on the active path
    pub cycles_cut: u64,
}

/// Reset all scores and recompute them by walking from every record
///
/// Scores and `used_by` edges are cleared first, so calling this twice on the
/// same graph gives the same result.
pub fn calculate_score(graph: &mut DependencyGraph) -> ScoreSummary {
    graph.reset_scores();

    let mut summary = ScoreSummary::default();
    for root in graph.ids() {
        debug!("Scoring from root {}", root);
        walk_root(graph, &root, &mut summary);
        summary.roots += 1;
    }

    info!(
        "Scored {} records ({} edges walked, {} cycle re-entries cut)",
        summary.roots, summary.edges_walked, summary.cycles_cut
    );
    summary
}

/// Walk from a single root without resetting existing scores
pub fn score_from_root(graph: &mut DependencyGraph, root: &str) -> ScoreSummary {
    let mut summary = ScoreSummary {
        roots: 1,
        ..ScoreSummary::default()
    };
    walk_root(graph, root, &mut summary);
    summary
}

fn walk_root(graph: &mut DependencyGraph, root: &str, summary: &mut ScoreSummary) {
    let mut visiting = HashSet::new();
    walk(graph, root, 1, &mut visiting, summary);
    debug_assert!(visiting.is_empty());
}

fn walk(
    graph: &mut DependencyGraph,
    id: &str,
    depth: u64,
    visiting: &mut HashSet<String>,
    summary: &mut ScoreSummary,
) {
    if !visiting.insert(id.to_owned()) {
        trace!("{} is already on the active path", id);
        summary.cycles_cut += 1;
        return;
    }

    let Some(record) = graph.get(id) else {
        visiting.remove(id);
        return;
    };
    let author_id = record.cpanid.clone();
    let edges: Vec<(String, bool)> = record
        .prereqs
        .iter()
        .map(|(target, &cross)| (target.clone(), cross))
        .collect();

    for (target, cross) in edges {
        summary.edges_walked += 1;
        let weight = u64::from(cross);

        graph.add_to_score(&target, depth * weight);

        let used_by_cross = graph.get_or_create(&target).cpanid != author_id;
        graph.set_used_by(&target, id, used_by_cross);

        walk(graph, &target, depth + weight, visiting, summary);
    }

    visiting.remove(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PackageRecord;

    fn record(cpanid: &str) -> PackageRecord {
        PackageRecord::new(format!("{cpanid} Author"), cpanid)
    }

    fn chain() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph.insert("A", record("AAA").with_prereq("B", true));
        graph.insert("B", record("BBB").with_prereq("C", true));
        graph.insert("C", record("CCC"));
        graph
    }

    #[test]
    fn test_chain_from_single_root() {
        let mut graph = chain();
        score_from_root(&mut graph, "A");

        let scores = graph.scores();
        assert_eq!(scores["A"], 0);
        assert_eq!(scores["B"], 1);
        assert_eq!(scores["C"], 2);
    }

    #[test]
    fn test_chain_full_pass() {
        let mut graph = chain();
        let summary = calculate_score(&mut graph);

        let scores = graph.scores();
        assert_eq!(scores["A"], 0);
        assert_eq!(scores["B"], 1);
        // 2 via A -> B -> C, 1 via B -> C
        assert_eq!(scores["C"], 3);
        assert_eq!(summary.roots, 3);
        assert_eq!(summary.edges_walked, 3);
    }

    #[test]
    fn test_diamond() {
        let mut graph = DependencyGraph::new();
        graph.insert("A", record("AAA").with_prereq("C", true));
        graph.insert("B", record("BBB").with_prereq("C", true));
        graph.insert("C", record("CCC"));

        calculate_score(&mut graph);

        let c = graph.get("C").unwrap();
        assert_eq!(c.score, 2);
        assert_eq!(c.used_by.len(), 2);
        assert!(c.used_by["A"]);
        assert!(c.used_by["B"]);
    }

    #[test]
    fn test_same_author_edge_contributes_nothing() {
        let mut graph = DependencyGraph::new();
        graph.insert("A", record("SAME").with_prereq("B", false));
        graph.insert("B", record("SAME"));

        calculate_score(&mut graph);

        let b = graph.get("B").unwrap();
        assert_eq!(b.score, 0);
        assert!(!b.used_by["A"]);
        assert!(graph.get("A").unwrap().prereqs.contains_key("B"));
    }

    #[test]
    fn test_same_author_hop_keeps_depth() {
        let mut graph = DependencyGraph::new();
        graph.insert("A", record("ONE").with_prereq("B", false));
        graph.insert("B", record("ONE").with_prereq("C", true));
        graph.insert("C", record("TWO"));

        score_from_root(&mut graph, "A");

        assert_eq!(graph.get("C").unwrap().score, 1);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut graph = DependencyGraph::new();
        graph.insert("A", record("AAA").with_prereq("B", true));
        graph.insert("B", record("BBB").with_prereq("A", true));

        let summary = calculate_score(&mut graph);

        // Root A: B += 1, A += 2. Root B: A += 1, B += 2.
        assert_eq!(graph.get("A").unwrap().score, 3);
        assert_eq!(graph.get("B").unwrap().score, 3);
        assert_eq!(summary.cycles_cut, 2);
    }

    #[test]
    fn test_self_dependency_terminates() {
        let mut graph = DependencyGraph::new();
        graph.insert("A", record("AAA").with_prereq("A", false));

        calculate_score(&mut graph);

        let a = graph.get("A").unwrap();
        assert_eq!(a.score, 0);
        assert!(!a.used_by["A"]);
    }

    #[test]
    fn test_rescoring_is_stable() {
        let mut graph = chain();
        calculate_score(&mut graph);
        let first = graph.clone();

        calculate_score(&mut graph);
        assert_eq!(graph, first);
    }

    #[test]
    fn test_missing_target_becomes_partial_record() {
        let mut graph = DependencyGraph::new();
        graph.insert("A", record("AAA").with_prereq("Unknown::Module", true));

        calculate_score(&mut graph);

        let partial = graph.get("Unknown::Module").unwrap();
        assert_eq!(partial.score, 1);
        assert!(partial.cpanid.is_empty());
        assert!(partial.prereqs.is_empty());
        assert!(partial.used_by["A"]);
    }

    #[test]
    fn test_used_by_with_both_authors_empty_is_same_author() {
        let mut graph = DependencyGraph::new();
        graph.insert("A", PackageRecord::default().with_prereq("B", true));
        graph.insert("B", PackageRecord::default());

        calculate_score(&mut graph);

        let b = graph.get("B").unwrap();
        assert_eq!(b.score, 1);
        assert!(!b.used_by["A"]);
    }

    #[test]
    fn test_empty_graph() {
        let mut graph = DependencyGraph::new();
        let summary = calculate_score(&mut graph);
        assert_eq!(summary, ScoreSummary::default());
    }
}
