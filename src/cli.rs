//! CLI argument parsing for Vatio

use crate::process_tree::Pid;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for analysis results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report (default)
    Text,
    /// The `comparison.json` document on stdout
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "vatio")]
#[command(version)]
#[command(
    about = "Energy attribution and cross-run comparison for containerized benchmarks",
    long_about = None
)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyse every captured run and compare the images
    Analyze {
        /// Experiment config (TOML)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Output format
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Check captured run inputs without analysing them
    Preflight {
        /// Experiment config (TOML)
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Print every PID descended from a root in a fork trace
    Descendants {
        /// Fork/exit trace file
        #[arg(long = "trace", value_name = "FILE")]
        trace: PathBuf,

        /// Root PID of the workload
        #[arg(long = "root", value_name = "PID")]
        root: Pid,
    },
}
