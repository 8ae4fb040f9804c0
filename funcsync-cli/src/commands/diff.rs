//! `funcsync diff` — show the change set between two revisions.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use funcsync_core::{ChangeSet, Config};
use funcsync_sync::{compute_changes, GitCli};
use funcsync_template::{IdentityStrategy, RemovedLineNames};

use super::{RevisionArgs, Workspace};

/// Arguments for `funcsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub revisions: RevisionArgs,

    /// Emit the change set as JSON.
    #[arg(long)]
    pub json: bool,
}

impl DiffArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let source = GitCli::new(&self.revisions.repo);
        let (before, after) = self
            .revisions
            .revisions()
            .resolve(&source, ".")
            .context("failed to resolve revisions")?;
        let changes = compute_changes(&source, ".", before.as_deref(), &after)
            .with_context(|| format!("diff failed for {}", self.revisions.repo.display()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&changes)?);
            return Ok(());
        }
        print_changes(&changes, &workspace.config);
        Ok(())
    }
}

/// Template paths are tagged: those are the files a sync reads.
fn print_changes(changes: &ChangeSet, config: &Config) {
    if changes.is_empty() && changes.skipped.is_empty() {
        println!("No differences.");
        return;
    }

    let mut paths: Vec<&String> = changes.added.keys().chain(changes.removed.keys()).collect();
    paths.sort();
    paths.dedup();
    for path in paths {
        println!("{}{}", path.bold(), template_tag(config, path));
        for line in changes.removed.get(path).into_iter().flatten() {
            println!("{}", format!("-{line}").red());
        }
        for line in changes.added.get(path).into_iter().flatten() {
            println!("{}", format!("+{line}").green());
        }
    }
    for path in &changes.new_files {
        println!("{} {}{}", "new".cyan(), path, template_tag(config, path));
    }
    for (path, reason) in &changes.skipped {
        println!("{} {}: {}", "skipped".yellow(), path, reason);
    }

    let removed = RemovedLineNames.extract(&changes.removed);
    if !removed.is_empty() {
        println!("Functions to unregister: {}", removed.join(", "));
    }
}

fn template_tag(config: &Config, path: &str) -> String {
    if config.is_template(path) {
        format!(" {}", "(template)".magenta())
    } else {
        String::new()
    }
}
