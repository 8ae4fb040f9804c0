//! In-process [`RegistryStore`] used by tests and dry runs.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::store::{RegistryStore, TableStatus};
use crate::types::{FunctionNames, RegistryItem, TableName};

#[derive(Debug, Default)]
struct MemoryTable {
    /// Status polls remaining before the table turns active.
    pending_polls: u32,
    items: BTreeMap<String, RegistryItem>,
}

impl MemoryTable {
    fn status(&self) -> TableStatus {
        if self.pending_polls == 0 {
            TableStatus::Active
        } else {
            TableStatus::Creating
        }
    }
}

/// Mutex-guarded map of tables.
///
/// With [`MemoryStore::with_creation_polls`], newly created tables stay in
/// [`TableStatus::Creating`] for that many `table_status` calls and reject
/// writes until then.
#[derive(Debug, Default)]
pub struct MemoryStore {
    creation_polls: u32,
    tables: Mutex<BTreeMap<TableName, MemoryTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_creation_polls(polls: u32) -> Self {
        Self {
            creation_polls: polls,
            tables: Mutex::default(),
        }
    }

    /// Snapshot of one table's items, sorted by file name.
    pub fn items(&self, table: &TableName) -> Vec<RegistryItem> {
        self.lock()
            .map(|tables| {
                tables
                    .get(table)
                    .map(|t| t.items.values().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<TableName, MemoryTable>>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

fn active_table<'a>(
    tables: &'a mut BTreeMap<TableName, MemoryTable>,
    table: &TableName,
) -> Result<&'a mut MemoryTable, StoreError> {
    let entry = tables.get_mut(table).ok_or_else(|| StoreError::TableNotFound {
        table: table.clone(),
    })?;
    if entry.status() != TableStatus::Active {
        return Err(StoreError::TableNotActive {
            table: table.clone(),
        });
    }
    Ok(entry)
}

impl RegistryStore for MemoryStore {
    fn table_status(&self, table: &TableName) -> Result<Option<TableStatus>, StoreError> {
        let mut tables = self.lock()?;
        Ok(tables.get_mut(table).map(|t| {
            let status = t.status();
            t.pending_polls = t.pending_polls.saturating_sub(1);
            status
        }))
    }

    fn create_table(&self, table: &TableName) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.contains_key(table) {
            return Err(StoreError::TableAlreadyExists {
                table: table.clone(),
            });
        }
        tables.insert(
            table.clone(),
            MemoryTable {
                pending_polls: self.creation_polls,
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<TableName>, StoreError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn get_item(
        &self,
        table: &TableName,
        file_name: &str,
    ) -> Result<Option<RegistryItem>, StoreError> {
        let tables = self.lock()?;
        let entry = tables.get(table).ok_or_else(|| StoreError::TableNotFound {
            table: table.clone(),
        })?;
        Ok(entry.items.get(file_name).cloned())
    }

    fn put_item(&self, table: &TableName, item: &RegistryItem) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let entry = active_table(&mut tables, table)?;
        entry.items.insert(item.file_name.clone(), item.clone());
        Ok(())
    }

    fn update_function_names(
        &self,
        table: &TableName,
        file_name: &str,
        names: &FunctionNames,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let entry = active_table(&mut tables, table)?;
        let item = entry
            .items
            .get_mut(file_name)
            .ok_or_else(|| StoreError::ItemNotFound {
                table: table.clone(),
                file_name: file_name.to_string(),
            })?;
        item.function_names = names.clone();
        Ok(())
    }

    fn scan_contains(
        &self,
        table: &TableName,
        needle: &str,
    ) -> Result<Vec<RegistryItem>, StoreError> {
        let tables = self.lock()?;
        let entry = tables.get(table).ok_or_else(|| StoreError::TableNotFound {
            table: table.clone(),
        })?;
        Ok(entry
            .items
            .values()
            .filter(|item| item.function_names.joined().contains(needle))
            .cloned()
            .collect())
    }
}
