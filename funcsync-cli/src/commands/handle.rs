//! `funcsync handle <event.json>` — process one commit trigger event.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use funcsync_sync::{handle_event_json, GitCli};

use super::Workspace;

/// Arguments for `funcsync handle`.
#[derive(Args, Debug)]
pub struct HandleArgs {
    /// Trigger event JSON file.
    pub event: PathBuf,

    /// Directory holding one checkout per repository, named after it.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub repos_root: PathBuf,
}

impl HandleArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let json = std::fs::read_to_string(&self.event)
            .with_context(|| format!("failed to read event file {}", self.event.display()))?;

        let source = GitCli::new(&self.repos_root);
        let registry = workspace.registry();
        let result = handle_event_json(&source, &registry, &workspace.config, &json);

        println!("{}", serde_json::to_string_pretty(&result)?);
        if !result.is_success() {
            bail!("invocation failed with status {}", result.status_code);
        }
        Ok(())
    }
}
