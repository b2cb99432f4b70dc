// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Package index lookups and distribution retrieval
//!
//! [`Resolver`] is the seam between the graph builder and whatever knows
//! about packages. [`LocalMirror`] implements it over a mirror directory
//! whose distributions are already unpacked:
//!
//! ```text
//! <root>/index.json
//! <root>/<path of each distribution>/...
//! ```

use crate::error::{DepGraphError, Result};
use crate::extract::{self, RawPrereqs};
use crate::types::Resolution;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Everything the graph builder needs to know from the outside world
pub trait Resolver {
    /// Map a module or distribution name to its distribution
    fn resolve(&self, name: &str) -> Option<Resolution>;

    /// Every distribution id the index knows about
    fn all_packages(&self) -> Vec<String>;

    /// Place the unpacked distribution inside `workspace` and return its root
    fn fetch_and_extract(&self, id: &str, workspace: &Path) -> Result<PathBuf>;

    /// Read the declared prerequisite names from an unpacked distribution
    fn extract_declared_prereqs(&self, dir: &Path) -> Result<RawPrereqs> {
        extract::declared_prereqs(dir)
    }

    /// Whether `name` ships with the language itself
    fn is_standard_library(&self, name: &str) -> bool;
}

/// One distribution entry of `index.json`
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorDistribution {
    /// Author short id
    #[serde(default)]
    pub cpanid: String,
    /// Author display name
    #[serde(default)]
    pub author: String,
    /// Location of the unpacked tree, relative to the mirror root
    pub path: PathBuf,
    /// Aggregate with no code of its own
    #[serde(default)]
    pub bundle: bool,
}

/// The parsed `index.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MirrorIndex {
    /// Distributions keyed by canonical id
    #[serde(default)]
    pub distributions: BTreeMap<String, MirrorDistribution>,
    /// Module name -> distribution id
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
    /// Module names that ship with perl
    #[serde(default)]
    pub core: BTreeSet<String>,
}

/// A resolver backed by a local mirror directory
#[derive(Debug, Clone)]
pub struct LocalMirror {
    root: PathBuf,
    index: MirrorIndex,
}

impl LocalMirror {
    /// Name of the index file at the mirror root
    pub const INDEX_FILE: &'static str = "index.json";

    /// Open the mirror at `root`
    pub fn open(root: &Path) -> Result<Self> {
        let index_path = root.join(Self::INDEX_FILE);
        let content = fs::read_to_string(&index_path).map_err(|e| {
            DepGraphError::ResolverUnavailable(format!("cannot read {}: {e}", index_path.display()))
        })?;
        let index: MirrorIndex = serde_json::from_str(&content).map_err(|e| {
            DepGraphError::ResolverUnavailable(format!("cannot parse {}: {e}", index_path.display()))
        })?;

        info!(
            "Opened mirror {} ({} distributions, {} modules)",
            root.display(),
            index.distributions.len(),
            index.modules.len()
        );
        Ok(Self::from_index(root, index))
    }

    /// Use an already parsed index
    #[must_use]
    pub fn from_index(root: &Path, index: MirrorIndex) -> Self {
        Self {
            root: root.to_path_buf(),
            index,
        }
    }

    fn distribution_id(&self, name: &str) -> Option<String> {
        if let Some(id) = self.index.modules.get(name) {
            return Some(id.clone());
        }
        let id = name.replace("::", "-");
        self.index.distributions.contains_key(&id).then_some(id)
    }
}

impl Resolver for LocalMirror {
    fn resolve(&self, name: &str) -> Option<Resolution> {
        let id = self.distribution_id(name)?;
        let dist = self.index.distributions.get(&id)?;

        Some(Resolution {
            is_core_library: self.index.core.contains(name),
            is_meta_bundle: dist.bundle || id.starts_with("Bundle-"),
            canonical_id: id,
            author_id: dist.cpanid.clone(),
            author_name: dist.author.clone(),
        })
    }

    fn all_packages(&self) -> Vec<String> {
        self.index.distributions.keys().cloned().collect()
    }

    fn fetch_and_extract(&self, id: &str, workspace: &Path) -> Result<PathBuf> {
        let fetch_err = |message: String| DepGraphError::FetchExtractFailed {
            id: id.to_string(),
            message,
        };

        let dist = self
            .index
            .distributions
            .get(id)
            .ok_or_else(|| fetch_err("not in mirror index".into()))?;
        let source = self.root.join(&dist.path);
        if !source.is_dir() {
            return Err(fetch_err(format!("{} is not a directory", source.display())));
        }

        let target = workspace.join(id);
        for entry in WalkDir::new(&source) {
            let entry = entry.map_err(|e| fetch_err(e.to_string()))?;
            let relative = entry
                .path()
                .strip_prefix(&source)
                .map_err(|e| fetch_err(e.to_string()))?;
            let dest = target.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest).map_err(|e| DepGraphError::io(e, &dest))?;
            } else if entry.file_type().is_file() {
                fs::copy(entry.path(), &dest).map_err(|e| DepGraphError::io(e, &dest))?;
            }
        }

        debug!("Copied {} into {}", source.display(), target.display());
        Ok(target)
    }

    fn is_standard_library(&self, name: &str) -> bool {
        self.index.core.contains(name)
    }
}
