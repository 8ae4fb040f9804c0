//! Key-value store collaborator interface.
//!
//! The registry sees the store as a set of tables, each keyed by
//! `file_name`. Table identity is not known ahead of time, so the store must
//! be able to enumerate its tables. Table creation may complete
//! asynchronously: a freshly created table reports [`TableStatus::Creating`]
//! until it accepts writes.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::{FunctionNames, RegistryItem, TableName};

/// Lifecycle state of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Creating,
    Active,
}

/// Low-level table and item operations.
pub trait RegistryStore {
    /// Status of `table`, or `None` if it does not exist.
    fn table_status(&self, table: &TableName) -> Result<Option<TableStatus>, StoreError>;

    /// Create `table` keyed by `file_name`.
    ///
    /// Fails with [`StoreError::TableAlreadyExists`] if it is already present.
    fn create_table(&self, table: &TableName) -> Result<(), StoreError>;

    /// Every table in the store, sorted by name.
    fn list_tables(&self) -> Result<Vec<TableName>, StoreError>;

    fn get_item(
        &self,
        table: &TableName,
        file_name: &str,
    ) -> Result<Option<RegistryItem>, StoreError>;

    /// Insert or replace the item keyed by `item.file_name`.
    fn put_item(&self, table: &TableName, item: &RegistryItem) -> Result<(), StoreError>;

    /// Overwrite the function-name attribute of an existing item.
    fn update_function_names(
        &self,
        table: &TableName,
        file_name: &str,
        names: &FunctionNames,
    ) -> Result<(), StoreError>;

    /// Items whose serialized function-name attribute contains `needle` as a
    /// substring. Callers re-check exact membership.
    fn scan_contains(&self, table: &TableName, needle: &str)
        -> Result<Vec<RegistryItem>, StoreError>;
}

impl<S: RegistryStore + ?Sized> RegistryStore for &S {
    fn table_status(&self, table: &TableName) -> Result<Option<TableStatus>, StoreError> {
        (**self).table_status(table)
    }

    fn create_table(&self, table: &TableName) -> Result<(), StoreError> {
        (**self).create_table(table)
    }

    fn list_tables(&self) -> Result<Vec<TableName>, StoreError> {
        (**self).list_tables()
    }

    fn get_item(
        &self,
        table: &TableName,
        file_name: &str,
    ) -> Result<Option<RegistryItem>, StoreError> {
        (**self).get_item(table, file_name)
    }

    fn put_item(&self, table: &TableName, item: &RegistryItem) -> Result<(), StoreError> {
        (**self).put_item(table, item)
    }

    fn update_function_names(
        &self,
        table: &TableName,
        file_name: &str,
        names: &FunctionNames,
    ) -> Result<(), StoreError> {
        (**self).update_function_names(table, file_name, names)
    }

    fn scan_contains(
        &self,
        table: &TableName,
        needle: &str,
    ) -> Result<Vec<RegistryItem>, StoreError> {
        (**self).scan_contains(table, needle)
    }
}
