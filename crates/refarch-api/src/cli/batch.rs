//! `run-all` and `gen-docs`: walk the current directory and run the
//! workflow tool once per marker file, stopping at the first failure.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use refarch_core::walker::{BatchWalker, JobPlan};
use refarch_infra::config::load_batch_config;
use refarch_infra::fs_tree::LocalTree;
use refarch_infra::process::TokioCommandRunner;
use refarch_types::config::BatchConfig;
use refarch_types::walk::WalkReport;

/// The two batch tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchCommand {
    RunAll,
    GenDocs,
}

impl BatchCommand {
    pub fn name(self) -> &'static str {
        match self {
            BatchCommand::RunAll => "run-all",
            BatchCommand::GenDocs => "gen-docs",
        }
    }

    pub fn plan(self, config: &BatchConfig) -> JobPlan {
        match self {
            BatchCommand::RunAll => JobPlan::run_all(config),
            BatchCommand::GenDocs => JobPlan::gen_docs(config),
        }
    }
}

/// Walk `root` with the real filesystem and subprocess runner.
pub async fn run_batch(command: BatchCommand, root: &Path) -> Result<WalkReport> {
    let config = load_batch_config(root).await;
    tracing::debug!(
        tool = %config.tool,
        marker_file = %config.marker_file,
        "starting {} in {}",
        command.name(),
        root.display()
    );

    let mut walker = BatchWalker::new(
        LocalTree::new(),
        TokioCommandRunner::with_tracing(),
        command.plan(&config),
    );
    walker
        .walk(root)
        .await
        .with_context(|| format!("{} aborted under {}", command.name(), root.display()))
}

/// Entry point for both batch subcommands.
///
/// The walk starts at `.`, so marker paths in logs and reports are relative
/// to the current directory.
pub async fn handle_batch(command: BatchCommand, json: bool, quiet: bool) -> Result<()> {
    let report = run_batch(command, Path::new(".")).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if !quiet {
        print_summary(command, &report);
    }
    Ok(())
}

fn print_summary(command: BatchCommand, report: &WalkReport) {
    let count = report.jobs.len();
    let noun = if count == 1 { "workflow" } else { "workflows" };
    println!();
    println!(
        "  {} {} processed {} {noun} under {}",
        style("✓").green().bold(),
        style(command.name()).bold(),
        style(count).cyan(),
        style(report.root.display()).dim()
    );
    println!();
}
