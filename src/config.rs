// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Sources, later ones winning:
//! - built-in defaults
//! - a TOML file (`--config`, else `<config dir>/config.toml` if present)
//! - environment variables prefixed `CPAN_DEPGRAPH__`, e.g.
//!   `CPAN_DEPGRAPH__MIRROR=/srv/minicpan`

use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime and meta package names that are never treated as dependencies
pub const DEFAULT_IGNORE: [&str; 6] = ["perl", "perl5", "parrot", "ponie", "kurila", "pugs"];

/// Modules shipped with perl itself, treated as standard library whatever
/// the resolver says
pub const DEFAULT_CORE_MODULES: [&str; 48] = [
    "strict", "warnings", "utf8", "lib", "constant", "vars", "base", "parent",
    "overload", "integer", "bytes", "feature", "Carp", "Exporter", "Scalar::Util",
    "List::Util", "File::Spec", "File::Spec::Functions", "File::Basename",
    "File::Path", "File::Temp", "File::Find", "File::Copy", "Cwd", "Data::Dumper",
    "Storable", "Encode", "Getopt::Long", "Time::HiRes", "Time::Local", "POSIX",
    "IO::File", "IO::Handle", "Test::More", "Test::Simple", "Test::Builder",
    "ExtUtils::MakeMaker", "Fcntl", "Errno", "FindBin", "Socket", "Digest::MD5",
    "MIME::Base64", "Pod::Usage", "Text::Wrap", "Term::ANSIColor", "Benchmark",
    "JSON::PP",
];

/// File name of the graph snapshot inside the data directory
pub const GRAPH_FILE_NAME: &str = "prereqs.json";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for persistent data
    pub data_dir: PathBuf,
    /// Graph snapshot location; defaults to `<data_dir>/prereqs.json`
    #[serde(default)]
    pub graph_file: Option<PathBuf>,
    /// Root of the local mirror used for discovery
    #[serde(default)]
    pub mirror: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Options handed to the ingestor
    #[serde(default)]
    pub ingest: IngestOptions,
}

/// Settings for the ingestor, passed in at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Packages that are never processed and never recorded as prerequisites
    pub ignore: Vec<String>,
    /// Extra packages that discovery should not process
    pub skip: Vec<String>,
    /// Standard-library module names, never recorded as prerequisites
    pub core: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            ignore: DEFAULT_IGNORE.iter().map(|s| (*s).to_string()).collect(),
            skip: Vec::new(),
            core: DEFAULT_CORE_MODULES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "hyperpolymath", "cpan-depgraph")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: project_dirs()
                .map(|d| d.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".cpan-depgraph")),
            graph_file: None,
            mirror: None,
            log_level: "info".to_string(),
            ingest: IngestOptions::default(),
        }
    }
}

impl Config {
    /// Where the graph snapshot is read from and written to
    #[must_use]
    pub fn graph_path(&self) -> PathBuf {
        self.graph_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(GRAPH_FILE_NAME))
    }
}

/// Default location of the configuration file
#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

/// Load configuration, layering an optional file and the environment over defaults
///
/// An explicitly given file must exist; the default file is optional.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder().add_source(config::Config::try_from(&Config::default())?);

    builder = match path {
        Some(path) => builder.add_source(File::from(path.to_path_buf()).required(true)),
        None => match default_config_file() {
            Some(default) => builder.add_source(File::from(default).required(false)),
            None => builder,
        },
    };

    builder
        .add_source(
            Environment::with_prefix("CPAN_DEPGRAPH")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
