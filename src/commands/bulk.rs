// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Bulk command - rebuilds the graph from a relational snapshot

use crate::config::Config;
use crate::graph::DependencyGraph;
use crate::ingest::Ingestor;
use crate::resolver::LocalMirror;
use crate::snapshot::{RelationalSnapshot, SnapshotResolver};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Run the bulk command
///
/// With a mirror configured its index is the live resolver; otherwise the
/// snapshot answers lookups itself.
pub fn run(config: &Config, database: &Path, score: bool) -> Result<()> {
    let snapshot = RelationalSnapshot::read_sqlite(database)
        .with_context(|| format!("Failed to read snapshot {}", database.display()))?;

    let mut graph = DependencyGraph::new();
    let report = match config.mirror.as_deref() {
        Some(root) => {
            let mirror = LocalMirror::open(root)
                .with_context(|| format!("Failed to open mirror {}", root.display()))?;
            Ingestor::new(&mirror, &config.ingest).ingest_bulk(&mut graph, &snapshot)
        }
        None => {
            info!("No mirror configured, resolving against the snapshot");
            let resolver = SnapshotResolver::new(&snapshot);
            Ingestor::new(&resolver, &config.ingest).ingest_bulk(&mut graph, &snapshot)
        }
    };

    if score {
        graph.score();
    }

    let graph_path = config.graph_path();
    graph
        .export(&graph_path)
        .with_context(|| format!("Failed to save graph to {}", graph_path.display()))?;

    println!(
        "Imported {} distributions ({} skipped, {} prerequisite edges)",
        report.ingested.len(),
        report.skipped.len(),
        graph.edge_count()
    );
    println!("Graph saved to {}", graph_path.display());

    Ok(())
}
