// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Discover command - reads prerequisites of packages from the local mirror

use crate::config::Config;
use crate::ingest::Ingestor;
use crate::resolver::LocalMirror;
use crate::types::Worklist;
use anyhow::{Context, Result};
use tracing::info;

/// Run the discover command
pub fn run(config: &Config, worklist: &Worklist, score: bool) -> Result<()> {
    let mirror_root = config.mirror.as_deref().ok_or_else(|| {
        anyhow::anyhow!("No mirror configured. Pass --mirror or set CPAN_DEPGRAPH__MIRROR.")
    })?;
    let mirror = LocalMirror::open(mirror_root)
        .with_context(|| format!("Failed to open mirror {}", mirror_root.display()))?;

    let graph_path = config.graph_path();
    let mut graph = super::load_or_new(&graph_path)?;
    info!("Merging into graph with {} records", graph.len());

    let mut ingestor = Ingestor::new(&mirror, &config.ingest);
    let report = ingestor.ingest_discovery(&mut graph, worklist);

    for (name, err) in &report.failed {
        eprintln!("  Failed {}: {}", name, err);
    }

    if score {
        graph.score();
    }

    graph
        .export(&graph_path)
        .with_context(|| format!("Failed to save graph to {}", graph_path.display()))?;

    println!(
        "Ingested {} packages ({} skipped, {} failed)",
        report.ingested.len(),
        report.skipped.len(),
        report.failed.len()
    );
    println!("Graph saved to {}", graph_path.display());

    Ok(())
}
