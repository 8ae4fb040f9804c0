//! # funcsync-sync
//!
//! Change-driven registry synchronization.
//!
//! [`compute_changes`] diffs two revisions through a [`SourceControl`]
//! collaborator, and a [`Synchronizer`] applies the resulting change set to a
//! [`funcsync_core::Registry`]. [`pipeline::run`] and
//! [`pipeline::handle_event`] tie the two together.

pub mod diff;
pub mod error;
pub mod event;
pub mod git;
pub mod pipeline;
pub mod source;
pub mod synchronizer;

pub use diff::{compute_changes, diff_lines, LineChanges};
pub use error::{SourceError, SyncError};
pub use event::TriggerEvent;
pub use git::GitCli;
pub use pipeline::{handle_event, handle_event_json, InvocationResult, Revisions, SyncOutcome};
pub use source::{Commit, Difference, MemorySource, SourceControl};
pub use synchronizer::{AddAction, Failure, Phase, Registration, SyncReport, Synchronizer};
