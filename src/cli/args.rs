//! Command-line argument parsing for minisdk
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use crate::agent::{FailurePolicy, TerminationPolicy};
use crate::cli::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// minisdk - routed agents exchanging messages in rounds
#[derive(Parser, Debug)]
#[command(name = "minisdk")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Run routed agents through state-machine-gated message rounds", long_about = None)]
pub struct Args {
    /// Round budget (overrides the config file)
    #[arg(short, long)]
    pub rounds: Option<usize>,

    /// Seed for the requester's random choices
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after the first round in which no agent sends
    #[arg(long)]
    pub until_quiet: bool,

    /// Abort on the first handler failure instead of skipping the agent
    #[arg(long)]
    pub fail_fast: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except final result)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the sorting demo (default)
    Run,

    /// Display effective configuration as TOML
    Config,

    /// Display the state graph and priority order
    Graph,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Selected subcommand, `Run` when none was given
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }

    /// Fold command-line overrides into a loaded config
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(rounds) = self.rounds {
            config.orchestrator.rounds = rounds;
        }
        if let Some(seed) = self.seed {
            config.demo.seed = Some(seed);
        }
        if self.until_quiet {
            config.orchestrator.termination = TerminationPolicy::UntilQuiet;
        }
        if self.fail_fast {
            config.orchestrator.on_handler_failure = FailurePolicy::Propagate;
        }
        if self.verbosity() == Verbosity::VeryVerbose {
            config.orchestrator.verbose = true;
        }
    }
}

impl Verbosity {
    /// Parse a config-file verbosity name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "quiet" => Some(Verbosity::Quiet),
            "normal" => Some(Verbosity::Normal),
            "verbose" => Some(Verbosity::Verbose),
            "very_verbose" => Some(Verbosity::VeryVerbose),
            _ => None,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Check if should show the run summary
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show the event trace
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }

    /// Check if should show every single delivery
    pub fn show_deliveries(&self) -> bool {
        matches!(self, Verbosity::VeryVerbose)
    }
}
