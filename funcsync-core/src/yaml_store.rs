//! Per-table YAML file store.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   <table>.yaml      (one file per table, mode 0600)
//! ```
//!
//! Each file holds a [`TableFile`]. Writes serialize to a `.yaml.tmp`
//! sibling, then rename over the target, so readers never observe a partial
//! table. Tables are active as soon as their file exists.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, StoreError};
use crate::store::{RegistryStore, TableStatus};
use crate::types::{FunctionNames, RegistryItem, TableName};

const KEY_ATTRIBUTE: &str = "file_name";

/// On-disk payload of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFile {
    pub name: TableName,
    pub key_attribute: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: BTreeMap<String, RegistryItem>,
}

/// [`RegistryStore`] persisted as YAML files under a root directory.
#[derive(Debug, Clone)]
pub struct YamlStore {
    root: PathBuf,
}

impl YamlStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<table>.yaml` — pure, no I/O.
    pub fn table_path(&self, table: &TableName) -> PathBuf {
        self.root.join(format!("{}.yaml", table.0))
    }

    fn load_table(&self, table: &TableName) -> Result<Option<TableFile>, StoreError> {
        validate_table_name(table)?;
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        serde_yaml::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Parse { path, source })
    }

    fn require_table(&self, table: &TableName) -> Result<TableFile, StoreError> {
        self.load_table(table)?
            .ok_or_else(|| StoreError::TableNotFound {
                table: table.clone(),
            })
    }

    fn save_table(&self, file: &TableFile) -> Result<(), StoreError> {
        ensure_dir(&self.root)?;
        let path = self.table_path(&file.name);
        let tmp_path = path.with_file_name(format!("{}.yaml.tmp", file.name.0));

        let yaml = serde_yaml::to_string(file)?;
        std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
        set_file_permissions(&tmp_path)?;
        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(io_err(&path, e));
        }
        Ok(())
    }
}

impl RegistryStore for YamlStore {
    fn table_status(&self, table: &TableName) -> Result<Option<TableStatus>, StoreError> {
        validate_table_name(table)?;
        Ok(self
            .table_path(table)
            .exists()
            .then_some(TableStatus::Active))
    }

    fn create_table(&self, table: &TableName) -> Result<(), StoreError> {
        if self.load_table(table)?.is_some() {
            return Err(StoreError::TableAlreadyExists {
                table: table.clone(),
            });
        }
        self.save_table(&TableFile {
            name: table.clone(),
            key_attribute: KEY_ATTRIBUTE.to_string(),
            created_at: Utc::now(),
            items: BTreeMap::new(),
        })
    }

    fn list_tables(&self) -> Result<Vec<TableName>, StoreError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut names: Vec<TableName> = std::fs::read_dir(&self.root)
            .map_err(|e| io_err(&self.root, e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| {
                let fname = e.file_name();
                let name = fname.to_string_lossy();
                name.strip_suffix(".yaml").map(TableName::from)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn get_item(
        &self,
        table: &TableName,
        file_name: &str,
    ) -> Result<Option<RegistryItem>, StoreError> {
        Ok(self.require_table(table)?.items.remove(file_name))
    }

    fn put_item(&self, table: &TableName, item: &RegistryItem) -> Result<(), StoreError> {
        let mut file = self.require_table(table)?;
        file.items.insert(item.file_name.clone(), item.clone());
        self.save_table(&file)
    }

    fn update_function_names(
        &self,
        table: &TableName,
        file_name: &str,
        names: &FunctionNames,
    ) -> Result<(), StoreError> {
        let mut file = self.require_table(table)?;
        let item = file
            .items
            .get_mut(file_name)
            .ok_or_else(|| StoreError::ItemNotFound {
                table: table.clone(),
                file_name: file_name.to_string(),
            })?;
        item.function_names = names.clone();
        self.save_table(&file)
    }

    fn scan_contains(
        &self,
        table: &TableName,
        needle: &str,
    ) -> Result<Vec<RegistryItem>, StoreError> {
        Ok(self
            .require_table(table)?
            .items
            .into_values()
            .filter(|item| item.function_names.joined().contains(needle))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Table names become file names: `[A-Za-z0-9_.-]`, 1-255 chars, never `.`/`..`.
fn validate_table_name(table: &TableName) -> Result<(), StoreError> {
    let name = table.as_str();
    let valid = !name.is_empty()
        && name.len() <= 255
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}

fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        set_dir_permissions(dir)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
