// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types for graph building, scoring and persistence

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the dependency-graph library
#[derive(Debug, Error)]
pub enum DepGraphError {
    /// The package resolver could not be constructed at all
    #[error("package resolver unavailable: {0}")]
    ResolverUnavailable(String),

    /// A package name did not resolve to a known distribution
    #[error("could not resolve package '{name}'")]
    PackageResolutionFailed {
        /// Name as it was requested
        name: String,
    },

    /// The distribution could not be fetched or unpacked
    #[error("failed to fetch or extract '{id}': {message}")]
    FetchExtractFailed {
        /// Canonical distribution id
        id: String,
        /// What went wrong
        message: String,
    },

    /// Every prerequisite extraction strategy came up empty
    #[error("no prerequisite information found in {}", path.display())]
    DependencyExtractionFailed {
        /// Unpacked distribution directory
        path: PathBuf,
    },

    /// A snapshot file could not be parsed
    #[error("malformed snapshot {}: {message}", path.display())]
    MalformedSnapshotFile {
        /// Snapshot location
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// An entry point was called with unusable arguments
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Filesystem failure
    #[error("I/O error: {source} (path: {})", path.display())]
    Io {
        /// Underlying error
        source: std::io::Error,
        /// Path being accessed
        path: PathBuf,
    },

    /// Graph could not be rendered as JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SQLite failure while reading a relational snapshot
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DepGraphError {
    /// Wrap an I/O error together with the path it concerns
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, DepGraphError>;
