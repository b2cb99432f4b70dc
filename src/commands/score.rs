// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Score command - recomputes every score in the saved graph

use crate::config::Config;
use anyhow::{Context, Result};

/// Run the score command
pub fn run(config: &Config) -> Result<()> {
    let graph_path = config.graph_path();
    let mut graph = super::load_existing(&graph_path)?;

    let summary = graph.score();

    graph
        .export(&graph_path)
        .with_context(|| format!("Failed to save graph to {}", graph_path.display()))?;

    println!(
        "Scored {} distributions ({} edges walked)",
        summary.roots, summary.edges_walked
    );
    Ok(())
}
