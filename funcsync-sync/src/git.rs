//! [`SourceControl`] backed by the `git` command line.
//!
//! Repositories are directories under a root: repository `orders` lives at
//! `<root>/orders`, repository `.` is the root itself.

use std::path::{Component, Path, PathBuf};
use std::process::Command;

use crate::error::SourceError;
use crate::source::{Commit, Difference, SourceControl};

/// Git checkout(s) on the local filesystem.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn repo_dir(&self, repository: &str) -> Result<PathBuf, SourceError> {
        let dir = if repository == "." || repository.is_empty() {
            self.root.clone()
        } else {
            validate_repository_name(repository)?;
            self.root.join(repository)
        };
        if !dir.is_dir() {
            return Err(SourceError::RepositoryNotFound {
                repository: repository.to_string(),
            });
        }
        Ok(dir)
    }

    /// Run `git <args>` in `dir`, returning stdout on success.
    fn git(&self, dir: &Path, args: &[&str]) -> Result<Vec<u8>, SourceError> {
        tracing::debug!("git {} (in {})", args.join(" "), dir.display());
        let output = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .output()
            .map_err(|source| SourceError::Spawn {
                program: "git",
                source,
            })?;

        if output.status.success() {
            return Ok(output.stdout);
        }
        Err(SourceError::Git {
            args: args.join(" "),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn commit_exists(&self, dir: &Path, revision: &str) -> bool {
        let spec = format!("{revision}^{{commit}}");
        self.git(dir, &["rev-parse", "--verify", "--quiet", &spec])
            .is_ok()
    }
}

/// Repository names are relative paths made only of normal components.
fn validate_repository_name(repository: &str) -> Result<(), SourceError> {
    let valid = Path::new(repository)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if valid {
        Ok(())
    } else {
        Err(SourceError::InvalidRepository(repository.to_string()))
    }
}

impl SourceControl for GitCli {
    fn get_differences(
        &self,
        repository: &str,
        before: Option<&str>,
        after: &str,
    ) -> Result<Vec<Difference>, SourceError> {
        let dir = self.repo_dir(repository)?;
        let stdout = match before {
            Some(before) => self.git(
                &dir,
                &["diff", "--name-status", "-z", "--no-renames", before, after],
            )?,
            None => self.git(
                &dir,
                &[
                    "diff-tree",
                    "--root",
                    "-r",
                    "--no-commit-id",
                    "--name-status",
                    "-z",
                    "--no-renames",
                    after,
                ],
            )?,
        };
        Ok(parse_name_status(&String::from_utf8_lossy(&stdout)))
    }

    fn get_file_content(
        &self,
        repository: &str,
        revision: &str,
        path: &str,
    ) -> Result<Vec<u8>, SourceError> {
        let dir = self.repo_dir(repository)?;
        let object = format!("{revision}:{path}");
        match self.git(&dir, &["cat-file", "blob", &object]) {
            Ok(content) => Ok(content),
            // The revision resolves, so the path is what is missing.
            Err(SourceError::Git { .. }) if self.commit_exists(&dir, revision) => {
                Err(SourceError::FileDoesNotExist {
                    revision: revision.to_string(),
                    path: path.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    fn get_commit(&self, repository: &str, commit_id: &str) -> Result<Commit, SourceError> {
        let dir = self.repo_dir(repository)?;
        if !self.commit_exists(&dir, commit_id) {
            return Err(SourceError::CommitNotFound {
                commit: commit_id.to_string(),
            });
        }
        let stdout = self.git(&dir, &["rev-list", "--parents", "-n", "1", commit_id])?;
        let line = String::from_utf8_lossy(&stdout);
        let mut ids = line.split_whitespace().map(str::to_owned);
        let id = ids.next().ok_or_else(|| SourceError::CommitNotFound {
            commit: commit_id.to_string(),
        })?;
        Ok(Commit {
            id,
            parents: ids.collect(),
        })
    }
}

/// Parse NUL-separated `--name-status -z` output into differences.
///
/// Records alternate `<status>\0<path>\0`. `A` is an addition, `D` a
/// deletion, anything else a modification of the same path.
pub fn parse_name_status(output: &str) -> Vec<Difference> {
    let mut fields = output.split('\0').filter(|f| !f.is_empty());
    let mut diffs = Vec::new();
    while let (Some(status), Some(path)) = (fields.next(), fields.next()) {
        let diff = match status.chars().next() {
            Some('A') => Difference::added(path),
            Some('D') => Difference::deleted(path),
            _ => Difference::modified(path),
        };
        diffs.push(diff);
    }
    diffs
}
