//! Domain types for the function registry.
//!
//! All types are serializable/deserializable via serde + serde_yaml. Registry
//! items keep the attribute names the deployed store has always used
//! (`file_name`, `folder_name`, `function_name`).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identity of a registry table: the handler module of the functions it holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableName(pub String);

impl TableName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TableName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TableName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Ordered set of function names, persisted as comma-joined text.
///
/// Order is insertion order. [`FunctionNames::append`] does not deduplicate;
/// callers gate it with [`FunctionNames::contains`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FunctionNames(Vec<String>);

impl FunctionNames {
    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Parse the comma-joined attribute. Empty segments are dropped.
    pub fn parse(joined: &str) -> Self {
        Self(
            joined
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn append(&mut self, name: impl Into<String>) {
        self.0.push(name.into());
    }

    /// Remove every occurrence of `name`. Returns `true` if anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|n| n != name);
        self.0.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl fmt::Display for FunctionNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl From<String> for FunctionNames {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<FunctionNames> for String {
    fn from(names: FunctionNames) -> Self {
        names.joined()
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One row of a registry table, keyed by `file_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryItem {
    pub file_name: String,
    pub folder_name: String,
    #[serde(rename = "function_name", default)]
    pub function_names: FunctionNames,
}

impl RegistryItem {
    pub fn new(
        file_name: impl Into<String>,
        folder_name: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            folder_name: folder_name.into(),
            function_names: FunctionNames::single(function_name),
        }
    }
}

/// A deployable function unit found in a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Handler reference truncated to its module segment.
    pub handler_module: String,
    pub function_name: String,
    /// Folder label of the template the function was declared in.
    pub source_folder: String,
}

impl FunctionDescriptor {
    pub fn table(&self) -> TableName {
        TableName::from(self.handler_module.as_str())
    }

    /// Item key inside the table. Equal to the handler module by convention.
    pub fn file_name(&self) -> &str {
        &self.handler_module
    }
}

/// Line-level changes between two revisions, aggregated over every file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Lines present only in the after revision, per file.
    pub added: BTreeMap<String, Vec<String>>,
    /// Lines present only in the before revision, per file.
    pub removed: BTreeMap<String, Vec<String>>,
    /// Files that could not be read at the after revision.
    pub new_files: Vec<String>,
    /// Files skipped because of transport or decode errors, with the reason.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub skipped: BTreeMap<String, String>,
}

impl ChangeSet {
    /// `true` if any removed line carries non-whitespace content.
    pub fn has_removals(&self) -> bool {
        has_content(&self.removed)
    }

    /// `true` if any added line carries non-whitespace content.
    pub fn has_additions(&self) -> bool {
        has_content(&self.added)
    }

    /// Files whose added lines carry non-whitespace content, in path order.
    pub fn files_with_additions(&self) -> Vec<&str> {
        self.added
            .iter()
            .filter(|(_, lines)| lines.iter().any(|l| !l.trim().is_empty()))
            .map(|(path, _)| path.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.new_files.is_empty()
    }
}

fn has_content(lines: &BTreeMap<String, Vec<String>>) -> bool {
    lines
        .values()
        .any(|lines| lines.iter().any(|l| !l.trim().is_empty()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
