// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Scores command - lists distributions by score

use crate::config::Config;
use anyhow::Result;

/// Run the scores command
pub fn run(config: &Config, top: usize) -> Result<()> {
    let graph = super::load_existing(&config.graph_path())?;

    if graph.is_empty() {
        println!("Graph is empty.");
        return Ok(());
    }

    for (id, score) in graph.ranked().into_iter().take(top) {
        let dependents = graph.get(id).map_or(0, |r| r.used_by.len());
        println!("{score:>10}  {id} ({dependents} dependents)");
    }

    Ok(())
}
