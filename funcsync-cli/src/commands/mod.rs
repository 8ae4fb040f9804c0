//! Subcommands and the state they share.

pub mod diff;
pub mod handle;
pub mod registry;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use funcsync_core::{config, Config, Registry, YamlStore};
use funcsync_sync::Revisions;

/// Home directory and the configuration loaded from it.
#[derive(Debug)]
pub struct Workspace {
    pub home: PathBuf,
    pub config: Config,
}

impl Workspace {
    pub fn resolve(home: Option<PathBuf>) -> Result<Self> {
        let home = match home {
            Some(home) => home,
            None => dirs::home_dir().context("could not determine home directory")?,
        };
        let config = config::load_at(&home)
            .with_context(|| format!("failed to load configuration under {}", home.display()))?;
        Ok(Self { home, config })
    }

    /// Registry over the YAML store at the configured root.
    pub fn registry(&self) -> Registry<YamlStore> {
        let root = self.config.registry_root_at(&self.home);
        tracing::debug!("registry root: {}", root.display());
        Registry::new(YamlStore::new(root), self.config.readiness.clone())
    }
}

/// Revision selection shared by `sync` and `diff`.
#[derive(Args, Debug)]
pub struct RevisionArgs {
    /// Local git checkout to read.
    #[arg(long, value_name = "DIR")]
    pub repo: PathBuf,

    /// Revision to sync to.
    #[arg(long, value_name = "REV")]
    pub after: String,

    /// Revision to diff against. Defaults to the first parent of `--after`.
    #[arg(long, value_name = "REV")]
    pub before: Option<String>,
}

impl RevisionArgs {
    pub fn revisions(&self) -> Revisions {
        match &self.before {
            Some(before) => Revisions::Range {
                before: Some(before.clone()),
                after: self.after.clone(),
            },
            None => Revisions::Commit(self.after.clone()),
        }
    }
}
