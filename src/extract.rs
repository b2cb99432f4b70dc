// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Declared-prerequisite extraction from an unpacked distribution
//!
//! Strategies are tried in a fixed order and the first one that finds any
//! prerequisite information wins. A manifest declaring zero prerequisites
//! counts as a success.

use crate::error::{DepGraphError, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Raw prerequisite names as written by the distribution author
pub type RawPrereqs = BTreeSet<String>;

/// One way of reading declared prerequisites out of a distribution
pub trait PrereqStrategy {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Prerequisite names, or `None` when this strategy has nothing to say
    fn extract(&self, dir: &Path) -> Option<RawPrereqs>;
}

/// Reads `META.json`
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaManifest;

/// Scans `Makefile.PL` for `PREREQ_PM`-style hashes
#[derive(Debug, Clone, Copy, Default)]
pub struct MakefilePl;

/// Scans `Build.PL` for `requires`-style hashes
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildPl;

const META_PHASES: [&str; 4] = ["configure", "build", "test", "runtime"];
const META_V1_KEYS: [&str; 3] = ["requires", "build_requires", "configure_requires"];

static MAKEFILE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\b(?:PREREQ_PM|BUILD_REQUIRES|CONFIGURE_REQUIRES|TEST_REQUIRES)\s*=>\s*\{([^}]*)\}")
        .expect("valid regex")
});

static BUILD_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\b(?:requires|build_requires|configure_requires|test_requires)\s*=>\s*\{([^}]*)\}")
        .expect("valid regex")
});

static HASH_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]?([A-Za-z_][\w:]*)['"]?\s*=>"#).expect("valid regex")
});

impl PrereqStrategy for MetaManifest {
    fn name(&self) -> &'static str {
        "META.json"
    }

    fn extract(&self, dir: &Path) -> Option<RawPrereqs> {
        let content = fs::read_to_string(dir.join("META.json")).ok()?;
        let meta: Value = match serde_json::from_str(&content) {
            Ok(meta) => meta,
            Err(e) => {
                debug!("Unreadable META.json in {}: {}", dir.display(), e);
                return None;
            }
        };

        let mut names = RawPrereqs::new();
        if let Some(prereqs) = meta.get("prereqs") {
            for phase in META_PHASES {
                collect_keys(&prereqs[phase]["requires"], &mut names);
            }
        } else {
            for key in META_V1_KEYS {
                collect_keys(&meta[key], &mut names);
            }
        }
        Some(names)
    }
}

impl PrereqStrategy for MakefilePl {
    fn name(&self) -> &'static str {
        "Makefile.PL"
    }

    fn extract(&self, dir: &Path) -> Option<RawPrereqs> {
        let source = fs::read_to_string(dir.join("Makefile.PL")).ok()?;
        scan_blocks(&MAKEFILE_BLOCK_RE, &source)
    }
}

impl PrereqStrategy for BuildPl {
    fn name(&self) -> &'static str {
        "Build.PL"
    }

    fn extract(&self, dir: &Path) -> Option<RawPrereqs> {
        let source = fs::read_to_string(dir.join("Build.PL")).ok()?;
        scan_blocks(&BUILD_BLOCK_RE, &source)
    }
}

fn collect_keys(value: &Value, names: &mut RawPrereqs) {
    if let Some(map) = value.as_object() {
        names.extend(map.keys().cloned());
    }
}

fn scan_blocks(block_re: &Regex, source: &str) -> Option<RawPrereqs> {
    let mut found = false;
    let mut names = RawPrereqs::new();

    for block in block_re.captures_iter(source) {
        found = true;
        for key in HASH_KEY_RE.captures_iter(&block[1]) {
            names.insert(key[1].to_string());
        }
    }

    found.then_some(names)
}

/// The default strategy order: manifest, then Makefile.PL, then Build.PL
#[must_use]
pub fn default_strategies() -> Vec<Box<dyn PrereqStrategy>> {
    vec![Box::new(MetaManifest), Box::new(MakefilePl), Box::new(BuildPl)]
}

/// Run `strategies` in order against `dir`, returning the first hit
pub fn extract_with(strategies: &[Box<dyn PrereqStrategy>], dir: &Path) -> Result<RawPrereqs> {
    for strategy in strategies {
        if let Some(names) = strategy.extract(dir) {
            debug!(
                "{} prerequisites read from {} in {}",
                names.len(),
                strategy.name(),
                dir.display()
            );
            return Ok(names);
        }
        trace!("{} found nothing in {}", strategy.name(), dir.display());
    }

    Err(DepGraphError::DependencyExtractionFailed {
        path: dir.to_path_buf(),
    })
}

/// Extract declared prerequisites using the default strategies
pub fn declared_prereqs(dir: &Path) -> Result<RawPrereqs> {
    extract_with(&default_strategies(), dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dist_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn set(names: &[&str]) -> RawPrereqs {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_meta_json_v2() {
        let dir = dist_with(&[(
            "META.json",
            r#"{
                "name": "Foo-Bar",
                "prereqs": {
                    "runtime": { "requires": { "perl": "5.008", "Moo": "2" } },
                    "test": { "requires": { "Test::More": "0.88" } },
                    "develop": { "requires": { "Dist::Zilla": "0" } }
                }
            }"#,
        )]);

        let names = declared_prereqs(dir.path()).unwrap();
        assert_eq!(names, set(&["Moo", "Test::More", "perl"]));
    }

    #[test]
    fn test_meta_json_v1() {
        let dir = dist_with(&[(
            "META.json",
            r#"{ "requires": { "LWP::UserAgent": 0 }, "build_requires": { "Test::Simple": 0 } }"#,
        )]);

        let names = declared_prereqs(dir.path()).unwrap();
        assert_eq!(names, set(&["LWP::UserAgent", "Test::Simple"]));
    }

    #[test]
    fn test_manifest_without_prereqs_wins_over_build_script() {
        let dir = dist_with(&[
            ("META.json", r#"{ "name": "Empty" }"#),
            ("Makefile.PL", "WriteMakefile(PREREQ_PM => { 'Carp' => 0 });"),
        ]);

        assert!(declared_prereqs(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_makefile_pl_fallback() {
        let dir = dist_with(&[
            ("META.json", "not json at all"),
            (
                "Makefile.PL",
                r#"
use ExtUtils::MakeMaker;
WriteMakefile(
    NAME      => 'Foo::Bar',
    PREREQ_PM => {
        'Scalar::Util' => '1.0',
        "JSON::PP"     => 0,
        Moose          => 2,
    },
    BUILD_REQUIRES => { 'Test::More' => 0 },
);
"#,
            ),
        ]);

        let names = declared_prereqs(dir.path()).unwrap();
        assert_eq!(names, set(&["JSON::PP", "Moose", "Scalar::Util", "Test::More"]));
    }

    #[test]
    fn test_build_pl_fallback() {
        let dir = dist_with(&[(
            "Build.PL",
            r"
my $build = Module::Build->new(
    module_name => 'Foo::Bar',
    requires => { 'File::Temp' => 0, 'DBI' => '1.6' },
    build_requires => { 'Test::Exception' => 0 },
);
",
        )]);

        let names = declared_prereqs(dir.path()).unwrap();
        assert_eq!(names, set(&["DBI", "File::Temp", "Test::Exception"]));
    }

    #[test]
    fn test_makefile_tried_before_build_pl() {
        let dir = dist_with(&[
            ("Makefile.PL", "WriteMakefile(PREREQ_PM => { 'From::Makefile' => 0 });"),
            ("Build.PL", "Module::Build->new(requires => { 'From::Build' => 0 });"),
        ]);

        let names = declared_prereqs(dir.path()).unwrap();
        assert_eq!(names, set(&["From::Makefile"]));
    }

    #[test]
    fn test_nothing_found_is_an_error() {
        let dir = dist_with(&[("Makefile.PL", "WriteMakefile(NAME => 'Foo');")]);

        let err = declared_prereqs(dir.path()).unwrap_err();
        assert!(matches!(err, DepGraphError::DependencyExtractionFailed { .. }));
    }
}
