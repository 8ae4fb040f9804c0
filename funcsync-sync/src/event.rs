//! Commit trigger events.
//!
//! The repository host delivers one JSON document per push:
//!
//! ```json
//! {"Records": [{
//!   "awsRegion": "us-east-1",
//!   "eventSourceARN": "arn:aws:codecommit:us-east-1:123456789012:orders",
//!   "codecommit": {"references": [{"ref": "refs/heads/main", "commit": "5e1a..."}]}
//! }]}
//! ```
//!
//! Only the first record and its first reference are used.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// A commit pushed to a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub region: String,
    pub repository: String,
    pub branch: String,
    pub commit_id: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Records", default)]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "awsRegion", default)]
    region: String,
    #[serde(rename = "eventSourceARN")]
    source_arn: String,
    codecommit: RecordReferences,
}

#[derive(Debug, Deserialize)]
struct RecordReferences {
    #[serde(default)]
    references: Vec<Reference>,
}

#[derive(Debug, Deserialize)]
struct Reference {
    #[serde(rename = "ref")]
    name: String,
    commit: String,
}

impl TriggerEvent {
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        let envelope: Envelope = serde_json::from_str(json)?;
        let record = envelope
            .records
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::Event("no records".to_string()))?;
        let reference = record
            .codecommit
            .references
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::Event("record has no references".to_string()))?;

        let repository = repository_from_arn(&record.source_arn)?;
        let branch = branch_from_ref(&reference.name).to_string();
        if reference.commit.is_empty() {
            return Err(SyncError::Event("reference has an empty commit id".to_string()));
        }

        Ok(Self {
            region: record.region,
            repository,
            branch,
            commit_id: reference.commit,
        })
    }
}

/// Repository name: the sixth `:` segment of the source ARN.
fn repository_from_arn(arn: &str) -> Result<String, SyncError> {
    match arn.split(':').nth(5) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(SyncError::Event(format!(
            "cannot read a repository name from '{arn}'"
        ))),
    }
}

/// Branch name after `heads/`; other refs are kept whole.
fn branch_from_ref(reference: &str) -> &str {
    reference
        .split_once("heads/")
        .map(|(_, branch)| branch)
        .unwrap_or(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(arn: &str, reference: &str) -> String {
        format!(
            r#"{{"Records":[{{"awsRegion":"eu-west-1","eventSourceARN":"{arn}",
               "codecommit":{{"references":[{{"ref":"{reference}","commit":"abc123"}}]}}}}]}}"#
        )
    }

    #[test]
    fn parses_push_record() {
        let json = event(
            "arn:aws:codecommit:eu-west-1:123456789012:orders",
            "refs/heads/feature/x",
        );
        let parsed = TriggerEvent::from_json(&json).unwrap();
        assert_eq!(
            parsed,
            TriggerEvent {
                region: "eu-west-1".into(),
                repository: "orders".into(),
                branch: "feature/x".into(),
                commit_id: "abc123".into(),
            }
        );
    }

    #[test]
    fn non_branch_ref_is_kept_whole() {
        let json = event("arn:aws:codecommit:r:1:orders", "refs/tags/v1");
        assert_eq!(TriggerEvent::from_json(&json).unwrap().branch, "refs/tags/v1");
    }

    #[test]
    fn short_arn_is_rejected() {
        let json = event("arn:aws:codecommit", "refs/heads/main");
        assert!(matches!(
            TriggerEvent::from_json(&json),
            Err(SyncError::Event(_))
        ));
    }

    #[test]
    fn empty_records_are_rejected() {
        assert!(matches!(
            TriggerEvent::from_json(r#"{"Records":[]}"#),
            Err(SyncError::Event(_))
        ));
        assert!(matches!(
            TriggerEvent::from_json("not json"),
            Err(SyncError::Json(_))
        ));
    }
}
