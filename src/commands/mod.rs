// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod bulk;
pub mod completions;
pub mod cycles;
pub mod discover;
pub mod score;
pub mod scores;

use crate::graph::DependencyGraph;
use anyhow::{Context, Result};
use std::path::Path;

/// Load the graph at `path`, or start an empty one if there is none yet
pub fn load_or_new(path: &Path) -> Result<DependencyGraph> {
    if path.exists() {
        DependencyGraph::load(path).with_context(|| format!("Failed to load graph from {}", path.display()))
    } else {
        Ok(DependencyGraph::new())
    }
}

/// Load the graph at `path`, failing if it has not been built yet
pub fn load_existing(path: &Path) -> Result<DependencyGraph> {
    if !path.exists() {
        anyhow::bail!(
            "No graph at {}. Run 'cpan-depgraph discover' or 'cpan-depgraph bulk' first.",
            path.display()
        );
    }
    DependencyGraph::load(path).with_context(|| format!("Failed to load graph from {}", path.display()))
}
