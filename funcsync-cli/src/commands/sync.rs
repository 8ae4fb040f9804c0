//! `funcsync sync` — diff a local checkout and update the registry.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use funcsync_sync::{pipeline, AddAction, GitCli, SyncOutcome};

use super::{RevisionArgs, Workspace};

/// Arguments for `funcsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub revisions: RevisionArgs,

    /// Print the full outcome as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let source = GitCli::new(&self.revisions.repo);
        let registry = workspace.registry();
        let outcome = pipeline::run(
            &source,
            &registry,
            &workspace.config,
            ".",
            &self.revisions.revisions(),
        )
        .with_context(|| format!("sync failed for {}", self.revisions.repo.display()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            print_outcome(&outcome);
        }
        Ok(())
    }
}

fn print_outcome(outcome: &SyncOutcome) {
    let report = &outcome.report;
    for registration in &report.registrations {
        let d = &registration.descriptor;
        let verb = match registration.action {
            AddAction::TableCreated => "created table".green(),
            AddAction::ItemCreated => "created item".green(),
            AddAction::FunctionAdded => "added".green(),
            AddAction::AlreadyPresent => "present".bright_black(),
        };
        println!(
            "  {} {} → {}/{} ({})",
            verb,
            d.function_name,
            d.handler_module,
            d.file_name(),
            registration.file
        );
    }
    for removal in &report.removals {
        for (table, file_name) in &removal.updated {
            println!(
                "  {} {} from {}/{}",
                "removed".red(),
                removal.function_name,
                table,
                file_name
            );
        }
        for (table, error) in &removal.failures {
            println!("  {} {} in {}: {}", "✗".red(), removal.function_name, table, error);
        }
    }
    for failure in &report.failures {
        println!("  {} {}: {}", "✗".red(), failure.unit, failure.error);
    }

    let elapsed = outcome.finished_at - outcome.started_at;
    println!(
        "✓ {}..{} synced ({} registered, {} removed, {} failed) in {}ms",
        outcome.before.as_deref().unwrap_or("<root>"),
        outcome.after,
        report.registered(),
        report.removed(),
        report.failed(),
        elapsed.num_milliseconds()
    );
}
