//! Line differ: classifies changed lines between two revisions.
//!
//! Lines are classified purely by membership. A line present only in the
//! after revision is an addition, a line present only in the before revision
//! is a removal. Modified lines show up once on each side; no hunk pairing is
//! attempted.

use similar::{ChangeTag, TextDiff};

use funcsync_core::ChangeSet;

use crate::error::SyncError;
use crate::source::{Difference, SourceControl};

/// Added and removed lines of one file, without line terminators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineChanges {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl LineChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Line-level diff of two texts.
pub fn diff_lines(before: &str, after: &str) -> LineChanges {
    let diff = TextDiff::from_lines(before, after);
    let mut changes = LineChanges::default();
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches('\n').to_string();
        match change.tag() {
            ChangeTag::Insert => changes.added.push(line),
            ChangeTag::Delete => changes.removed.push(line),
            ChangeTag::Equal => {}
        }
    }
    changes
}

/// Decode file content as UTF-8 with CRLF line endings normalised to LF.
pub fn decode_content(bytes: Vec<u8>, revision: &str, path: &str) -> Result<String, SyncError> {
    let text = String::from_utf8(bytes).map_err(|_| SyncError::Decode {
        path: path.to_string(),
        revision: revision.to_string(),
    })?;
    Ok(normalize_line_endings(&text))
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

/// Compute the [`ChangeSet`] between `before` and `after` of `repository`.
///
/// With no `before` revision every file of `after` is compared against
/// empty content. Only listing the differences can fail; problems reading
/// individual files are recorded in [`ChangeSet::skipped`].
pub fn compute_changes<C>(
    source: &C,
    repository: &str,
    before: Option<&str>,
    after: &str,
) -> Result<ChangeSet, SyncError>
where
    C: SourceControl + ?Sized,
{
    let differences = source.get_differences(repository, before, after)?;
    tracing::info!(
        "{}: {} file(s) differ between {} and {}",
        repository,
        differences.len(),
        before.unwrap_or("<empty tree>"),
        after
    );

    let mut changes = ChangeSet::default();
    for difference in differences {
        match FileReader::new(source, repository, before, after).classify(&difference) {
            Ok(Classified::Lines(path, lines)) => {
                tracing::debug!(
                    "{}: +{} -{} line(s)",
                    path,
                    lines.added.len(),
                    lines.removed.len()
                );
                if !lines.added.is_empty() {
                    changes.added.insert(path.clone(), lines.added);
                }
                if !lines.removed.is_empty() {
                    changes.removed.insert(path, lines.removed);
                }
            }
            Ok(Classified::New(path)) => {
                tracing::debug!("{}: not readable at {}, treating as new", path, after);
                changes.new_files.push(path);
            }
            Ok(Classified::Nothing) => {}
            Err((path, err)) => {
                tracing::warn!("skipping {}: {}", path, err);
                changes.skipped.insert(path, err.to_string());
            }
        }
    }
    Ok(changes)
}

enum Classified {
    Lines(String, LineChanges),
    New(String),
    Nothing,
}

struct FileReader<'a, C: ?Sized> {
    source: &'a C,
    repository: &'a str,
    before: Option<&'a str>,
    after: &'a str,
}

impl<'a, C: SourceControl + ?Sized> FileReader<'a, C> {
    fn new(source: &'a C, repository: &'a str, before: Option<&'a str>, after: &'a str) -> Self {
        Self {
            source,
            repository,
            before,
            after,
        }
    }

    fn classify(&self, difference: &Difference) -> Result<Classified, (String, SyncError)> {
        match (&difference.before_path, &difference.after_path) {
            (_, Some(after_path)) => {
                let after_text = match self.read(self.after, after_path) {
                    Ok(Some(text)) => text,
                    Ok(None) => return Ok(Classified::New(after_path.clone())),
                    Err(err) => return Err((after_path.clone(), err)),
                };
                let before_path = difference.before_path.as_deref().unwrap_or(after_path);
                let before_text = match self.before {
                    Some(rev) => self
                        .read(rev, before_path)
                        .map_err(|err| (after_path.clone(), err))?
                        .unwrap_or_default(),
                    None => String::new(),
                };
                Ok(Classified::Lines(
                    after_path.clone(),
                    diff_lines(&before_text, &after_text),
                ))
            }
            (Some(before_path), None) => {
                let Some(rev) = self.before else {
                    return Ok(Classified::Nothing);
                };
                match self.read(rev, before_path) {
                    Ok(Some(text)) => Ok(Classified::Lines(
                        before_path.clone(),
                        diff_lines(&text, ""),
                    )),
                    Ok(None) => Ok(Classified::Nothing),
                    Err(err) => Err((before_path.clone(), err)),
                }
            }
            (None, None) => Ok(Classified::Nothing),
        }
    }

    /// Content at `revision`, `None` when the path does not exist there.
    fn read(&self, revision: &str, path: &str) -> Result<Option<String>, SyncError> {
        match self.source.get_file_content(self.repository, revision, path) {
            Ok(bytes) => decode_content(bytes, revision, path).map(Some),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(SyncError::Source(err)),
        }
    }
}
