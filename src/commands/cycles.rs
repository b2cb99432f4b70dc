// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Cycles command - reports distributions that depend on each other

use crate::config::Config;
use anyhow::Result;

/// Run the cycles command
pub fn run(config: &Config) -> Result<()> {
    let graph = super::load_existing(&config.graph_path())?;
    let cycles = graph.dependency_cycles();

    if cycles.is_empty() {
        println!("No dependency cycles.");
        return Ok(());
    }

    println!("Dependency cycles ({}):", cycles.len());
    for cycle in &cycles {
        println!("  {}", cycle.join(" <-> "));
    }

    Ok(())
}
