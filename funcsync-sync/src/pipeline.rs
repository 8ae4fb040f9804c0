//! Invocation pipeline shared by the CLI commands.
//!
//! `revisions → Line Differ → Synchronizer → report`. [`handle_event`] is the
//! outermost boundary: it never returns an error, only an
//! [`InvocationResult`] with a coarse status.

use chrono::{DateTime, Utc};
use serde::Serialize;

use funcsync_core::{ChangeSet, Config, Registry, RegistryStore};

use crate::diff::compute_changes;
use crate::event::TriggerEvent;
use crate::source::SourceControl;
use crate::synchronizer::{SyncReport, Synchronizer};
use crate::SyncError;

/// Which revisions of a repository to compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revisions {
    /// A commit against its first parent (or the empty tree for a root commit).
    Commit(String),
    /// An explicit pair. No `before` means the empty tree.
    Range { before: Option<String>, after: String },
}

impl Revisions {
    /// Resolve to a concrete `(before, after)` pair.
    pub fn resolve<C>(
        &self,
        source: &C,
        repository: &str,
    ) -> Result<(Option<String>, String), SyncError>
    where
        C: SourceControl + ?Sized,
    {
        match self {
            Revisions::Commit(id) => Ok((previous_commit(source, repository, id)?, id.clone())),
            Revisions::Range { before, after } => Ok((before.clone(), after.clone())),
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub repository: String,
    pub before: Option<String>,
    pub after: String,
    pub changes: ChangeSet,
    pub report: SyncReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// First parent of `commit_id`, `None` for a root commit.
pub fn previous_commit<C>(
    source: &C,
    repository: &str,
    commit_id: &str,
) -> Result<Option<String>, SyncError>
where
    C: SourceControl + ?Sized,
{
    let commit = source.get_commit(repository, commit_id)?;
    let parent = commit.first_parent().map(str::to_owned);
    if parent.is_none() {
        tracing::info!("{} is a root commit, diffing against the empty tree", commit_id);
    }
    Ok(parent)
}

/// Diff the revisions and apply the changes to the registry.
pub fn run<C, S>(
    source: &C,
    registry: &Registry<S>,
    config: &Config,
    repository: &str,
    revisions: &Revisions,
) -> Result<SyncOutcome, SyncError>
where
    C: SourceControl + ?Sized,
    S: RegistryStore,
{
    let started_at = Utc::now();
    let (before, after) = revisions.resolve(source, repository)?;
    let changes = compute_changes(source, repository, before.as_deref(), &after)?;
    let report = Synchronizer::new(source, registry, config, repository, &after).apply(&changes);
    Ok(SyncOutcome {
        repository: repository.to_string(),
        before,
        after,
        changes,
        report,
        started_at,
        finished_at: Utc::now(),
    })
}

// ---------------------------------------------------------------------------
// Event handling
// ---------------------------------------------------------------------------

pub const SUCCESS_MESSAGE: &str = "Operation completed successfully";

/// Coarse status returned to the trigger source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    fn completed(report: &SyncReport) -> Self {
        Self {
            status_code: 200,
            body: format!(
                "{SUCCESS_MESSAGE} ({} registered, {} removed, {} failed)",
                report.registered(),
                report.removed(),
                report.failed()
            ),
        }
    }

    fn unexpected(err: &SyncError) -> Self {
        Self {
            status_code: 500,
            body: format!("Unexpected error: {err}"),
        }
    }
}

/// Run the pipeline for the commit named by `event`.
pub fn handle_event<C, S>(
    source: &C,
    registry: &Registry<S>,
    config: &Config,
    event: &TriggerEvent,
) -> InvocationResult
where
    C: SourceControl + ?Sized,
    S: RegistryStore,
{
    tracing::info!(
        "commit {} on {}/{} ({})",
        event.commit_id,
        event.repository,
        event.branch,
        event.region
    );
    let revisions = Revisions::Commit(event.commit_id.clone());
    match run(source, registry, config, &event.repository, &revisions) {
        Ok(outcome) => InvocationResult::completed(&outcome.report),
        Err(err) => {
            tracing::error!("invocation failed: {}", err);
            InvocationResult::unexpected(&err)
        }
    }
}

/// [`handle_event`] for a raw JSON trigger document.
pub fn handle_event_json<C, S>(
    source: &C,
    registry: &Registry<S>,
    config: &Config,
    json: &str,
) -> InvocationResult
where
    C: SourceControl + ?Sized,
    S: RegistryStore,
{
    match TriggerEvent::from_json(json) {
        Ok(event) => handle_event(source, registry, config, &event),
        Err(err) => {
            tracing::error!("rejected trigger event: {}", err);
            InvocationResult::unexpected(&err)
        }
    }
}
