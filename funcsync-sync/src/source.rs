//! Revision-control collaborator interface.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// One file touched between two revisions.
///
/// `after_path` is `None` when the file was deleted, `before_path` is `None`
/// when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    pub before_path: Option<String>,
    pub after_path: Option<String>,
}

impl Difference {
    pub fn added(path: impl Into<String>) -> Self {
        Self {
            before_path: None,
            after_path: Some(path.into()),
        }
    }

    pub fn modified(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            before_path: Some(path.clone()),
            after_path: Some(path),
        }
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self {
            before_path: Some(path.into()),
            after_path: None,
        }
    }
}

/// Commit metadata needed to find the previous revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub parents: Vec<String>,
}

impl Commit {
    /// First parent, or `None` for a root commit.
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

/// Read access to a repository host.
pub trait SourceControl {
    /// Files that differ between `before` and `after`. With no `before`,
    /// every file of `after` is reported as added.
    fn get_differences(
        &self,
        repository: &str,
        before: Option<&str>,
        after: &str,
    ) -> Result<Vec<Difference>, SourceError>;

    /// Raw content of `path` at `revision`.
    ///
    /// Fails with [`SourceError::FileDoesNotExist`] when the path is absent.
    fn get_file_content(
        &self,
        repository: &str,
        revision: &str,
        path: &str,
    ) -> Result<Vec<u8>, SourceError>;

    fn get_commit(&self, repository: &str, commit_id: &str) -> Result<Commit, SourceError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct MemoryCommit {
    parents: Vec<String>,
    files: BTreeMap<String, Vec<u8>>,
}

/// In-memory repositories for tests.
///
/// Differences are computed by comparing the two commits' file maps.
/// Reads of paths registered with [`MemorySource::fail_reads_of`] fail with a
/// transport error, and [`MemorySource::list_extra_difference`] adds entries
/// that do not correspond to real content changes.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    repositories: BTreeMap<String, BTreeMap<String, MemoryCommit>>,
    failing_paths: BTreeSet<String>,
    extra_differences: BTreeMap<String, Vec<Difference>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a commit whose tree is exactly `files`.
    pub fn add_commit(
        &mut self,
        repository: &str,
        commit_id: &str,
        parents: &[&str],
        files: &[(&str, &str)],
    ) -> &mut Self {
        let commit = MemoryCommit {
            parents: parents.iter().map(|p| p.to_string()).collect(),
            files: files
                .iter()
                .map(|(path, content)| (path.to_string(), content.as_bytes().to_vec()))
                .collect(),
        };
        self.repositories
            .entry(repository.to_string())
            .or_default()
            .insert(commit_id.to_string(), commit);
        self
    }

    /// Record a commit with raw byte content for one file.
    pub fn add_raw_file(
        &mut self,
        repository: &str,
        commit_id: &str,
        path: &str,
        content: Vec<u8>,
    ) -> &mut Self {
        self.repositories
            .entry(repository.to_string())
            .or_default()
            .entry(commit_id.to_string())
            .or_default()
            .files
            .insert(path.to_string(), content);
        self
    }

    pub fn fail_reads_of(&mut self, path: &str) -> &mut Self {
        self.failing_paths.insert(path.to_string());
        self
    }

    pub fn list_extra_difference(&mut self, repository: &str, diff: Difference) -> &mut Self {
        self.extra_differences
            .entry(repository.to_string())
            .or_default()
            .push(diff);
        self
    }

    fn commit(&self, repository: &str, commit_id: &str) -> Result<&MemoryCommit, SourceError> {
        self.repositories
            .get(repository)
            .ok_or_else(|| SourceError::RepositoryNotFound {
                repository: repository.to_string(),
            })?
            .get(commit_id)
            .ok_or_else(|| SourceError::CommitNotFound {
                commit: commit_id.to_string(),
            })
    }
}

impl SourceControl for MemorySource {
    fn get_differences(
        &self,
        repository: &str,
        before: Option<&str>,
        after: &str,
    ) -> Result<Vec<Difference>, SourceError> {
        let after_files = &self.commit(repository, after)?.files;
        let empty = BTreeMap::new();
        let before_files = match before {
            Some(rev) => &self.commit(repository, rev)?.files,
            None => &empty,
        };

        let paths: BTreeSet<&String> = before_files.keys().chain(after_files.keys()).collect();
        let mut diffs = Vec::new();
        for path in paths {
            match (before_files.get(path), after_files.get(path)) {
                (Some(old), Some(new)) if old == new => {}
                (Some(_), Some(_)) => diffs.push(Difference::modified(path.as_str())),
                (None, Some(_)) => diffs.push(Difference::added(path.as_str())),
                (Some(_), None) => diffs.push(Difference::deleted(path.as_str())),
                (None, None) => {}
            }
        }
        if let Some(extra) = self.extra_differences.get(repository) {
            diffs.extend(extra.iter().cloned());
        }
        Ok(diffs)
    }

    fn get_file_content(
        &self,
        repository: &str,
        revision: &str,
        path: &str,
    ) -> Result<Vec<u8>, SourceError> {
        if self.failing_paths.contains(path) {
            return Err(SourceError::Transport(format!("simulated failure reading {path}")));
        }
        self.commit(repository, revision)?
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::FileDoesNotExist {
                revision: revision.to_string(),
                path: path.to_string(),
            })
    }

    fn get_commit(&self, repository: &str, commit_id: &str) -> Result<Commit, SourceError> {
        let commit = self.commit(repository, commit_id)?;
        Ok(Commit {
            id: commit_id.to_string(),
            parents: commit.parents.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MemorySource {
        let mut s = MemorySource::new();
        s.add_commit("repo", "c1", &[], &[("a.yaml", "a"), ("gone.yaml", "g")])
            .add_commit("repo", "c2", &["c1"], &[("a.yaml", "a2"), ("new.yaml", "n")]);
        s
    }

    #[test]
    fn differences_classify_added_modified_deleted() {
        let diffs = source().get_differences("repo", Some("c1"), "c2").unwrap();
        assert_eq!(
            diffs,
            vec![
                Difference::modified("a.yaml"),
                Difference::deleted("gone.yaml"),
                Difference::added("new.yaml"),
            ]
        );
    }

    #[test]
    fn differences_without_before_list_everything_as_added() {
        let diffs = source().get_differences("repo", None, "c1").unwrap();
        assert!(diffs.iter().all(|d| d.before_path.is_none()));
        assert_eq!(diffs.len(), 2);
    }

    #[test]
    fn missing_file_is_distinguishable() {
        let err = source().get_file_content("repo", "c1", "new.yaml").unwrap_err();
        assert!(err.is_not_found());
        let err = source().get_file_content("repo", "nope", "a.yaml").unwrap_err();
        assert!(!err.is_not_found());
    }

    #[test]
    fn commit_reports_parents() {
        let s = source();
        assert_eq!(s.get_commit("repo", "c2").unwrap().first_parent(), Some("c1"));
        assert_eq!(s.get_commit("repo", "c1").unwrap().first_parent(), None);
    }
}
