//! CLI command definitions for the `refarch` binary.
//!
//! Uses clap derive macros for argument parsing. The batch subcommands take
//! no job-shaping flags: they always walk the current working directory.

pub mod batch;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Workflow batch runner and HTTP test fixture.
#[derive(Parser)]
#[command(name = "refarch", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run `ensure` then `teardown` for every workflow under the current directory.
    RunAll,

    /// Regenerate README.md for every workflow under the current directory.
    GenDocs,

    /// Start the plaintext (8080) and TLS (8443) test listeners.
    Serve {
        /// Honour the `x-error-rate` header on the plaintext listener.
        #[arg(long)]
        fault_injection: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
