// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! cpan-depgraph CLI - prerequisite graph and importance scores for CPAN

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use cpan_depgraph::commands;
use cpan_depgraph::config::{self, Config};
use cpan_depgraph::types::Worklist;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cpan-depgraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "CPAN_DEPGRAPH_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Graph snapshot override
    #[arg(long, global = true)]
    graph: Option<PathBuf>,

    /// Local mirror root override
    #[arg(long, global = true)]
    mirror: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read prerequisites of packages from the mirror and merge them into the graph
    Discover {
        /// Module or distribution names
        packages: Vec<String>,

        /// Discover every distribution in the mirror index
        #[arg(long, conflicts_with = "packages")]
        all: bool,

        /// Score the graph before saving it
        #[arg(long)]
        score: bool,
    },

    /// Rebuild the graph from a SQLite snapshot of the package index
    Bulk {
        /// SQLite snapshot path
        database: PathBuf,

        /// Score the graph before saving it
        #[arg(long)]
        score: bool,
    },

    /// Recompute all scores in the saved graph
    Score,

    /// List distributions by score
    Scores {
        /// How many to show
        #[arg(short = 'n', long, default_value_t = 20)]
        top: usize,
    },

    /// List groups of distributions that depend on each other
    Cycles,

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: clap_complete::Shell,
    },
}

fn init_logging(verbose: u8, quiet: bool, configured: &str) {
    let level = match verbose {
        0 if quiet => "error",
        0 => configured,
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        return commands::completions::run(shell, &mut Cli::command());
    }

    let mut config: Config = config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(graph) = cli.graph {
        config.graph_file = Some(graph);
    }
    if let Some(mirror) = cli.mirror {
        config.mirror = Some(mirror);
    }

    init_logging(cli.verbose, cli.quiet, &config.log_level);

    // Execute command
    match cli.command {
        Commands::Discover { packages, all, score } => {
            let worklist = Worklist::from_args(all, packages);
            commands::discover::run(&config, &worklist, score)
        }
        Commands::Bulk { database, score } => commands::bulk::run(&config, &database, score),
        Commands::Score => commands::score::run(&config),
        Commands::Scores { top } => commands::scores::run(&config, top),
        Commands::Cycles => commands::cycles::run(&config),
        Commands::Completions { .. } => Ok(()),
    }
}
