//! Registry adapter over a [`RegistryStore`].
//!
//! # Data model
//!
//! ```text
//! table  <handler module>
//!   item  file_name = <handler module>
//!         folder_name = <template stem>
//!         function_name = "fnA,fnB,..."
//! ```
//!
//! Tables are created lazily and never deleted. Items are updated in place
//! and never deleted; only their function-name set changes.
//!
//! All read-modify-write operations assume a single writer per table.

use std::thread::sleep;

use serde::Serialize;

use crate::config::ReadinessPolicy;
use crate::error::{RegistryError, StoreError};
use crate::store::{RegistryStore, TableStatus};
use crate::types::{RegistryItem, TableName};

/// Outcome of [`Registry::remove_function_everywhere`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemovalReport {
    pub function_name: String,
    pub tables_scanned: usize,
    /// `(table, file_name)` of every item the name was stripped from.
    pub updated: Vec<(TableName, String)>,
    /// Tables whose scan or update failed, with the error message.
    pub failures: Vec<(TableName, String)>,
}

/// Table and item operations used by the synchronizer.
#[derive(Debug)]
pub struct Registry<S> {
    store: S,
    readiness: ReadinessPolicy,
}

impl<S: RegistryStore> Registry<S> {
    pub fn new(store: S, readiness: ReadinessPolicy) -> Self {
        Self { store, readiness }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Tables
    // -----------------------------------------------------------------------

    pub fn table_exists(&self, table: &TableName) -> Result<bool, RegistryError> {
        Ok(self.store.table_status(table)?.is_some())
    }

    /// Create `table`. An existing table is not an error.
    pub fn create_table(&self, table: &TableName) -> Result<(), RegistryError> {
        match self.store.create_table(table) {
            Ok(()) => {
                tracing::info!("created table '{}'", table);
                Ok(())
            }
            Err(StoreError::TableAlreadyExists { .. }) => {
                tracing::debug!("table '{}' already exists", table);
                Ok(())
            }
            Err(err) => {
                tracing::error!("failed to create table '{}': {}", table, err);
                Err(err.into())
            }
        }
    }

    /// Poll until `table` is active, backing off between attempts.
    pub fn wait_until_ready(&self, table: &TableName) -> Result<(), RegistryError> {
        let attempts = self.readiness.max_attempts.max(1);
        for attempt in 0..attempts {
            if self.store.table_status(table)? == Some(TableStatus::Active) {
                tracing::debug!("table '{}' active after {} poll(s)", table, attempt + 1);
                return Ok(());
            }
            if attempt + 1 < attempts {
                sleep(self.readiness.delay_for(attempt));
            }
        }
        Err(RegistryError::TableNotReady {
            table: table.clone(),
            attempts,
        })
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    pub fn item_exists(&self, table: &TableName, file_name: &str) -> Result<bool, RegistryError> {
        match self.store.get_item(table, file_name) {
            Ok(item) => Ok(item.is_some()),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Write a new item holding a single function name.
    pub fn create_item(
        &self,
        table: &TableName,
        file_name: &str,
        folder_name: &str,
        function_name: &str,
    ) -> Result<(), RegistryError> {
        let item = RegistryItem::new(file_name, folder_name, function_name);
        self.store.put_item(table, &item)?;
        tracing::info!(
            "created item '{}' in '{}' (folder '{}', function '{}')",
            file_name,
            table,
            folder_name,
            function_name
        );
        Ok(())
    }

    pub fn function_exists(
        &self,
        table: &TableName,
        file_name: &str,
        function_name: &str,
    ) -> Result<bool, RegistryError> {
        match self.store.get_item(table, file_name) {
            Ok(Some(item)) => Ok(item.function_names.contains(function_name)),
            Ok(None) => Ok(false),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Append `function_name` to the item's set.
    ///
    /// Performs no deduplication: callers check [`Registry::function_exists`]
    /// first.
    pub fn add_function_to_item(
        &self,
        table: &TableName,
        file_name: &str,
        function_name: &str,
    ) -> Result<(), RegistryError> {
        let mut item = self
            .store
            .get_item(table, file_name)?
            .ok_or_else(|| StoreError::ItemNotFound {
                table: table.clone(),
                file_name: file_name.to_string(),
            })?;
        item.function_names.append(function_name);
        self.store
            .update_function_names(table, file_name, &item.function_names)?;
        tracing::info!(
            "added function '{}' to item '{}' in '{}'",
            function_name,
            file_name,
            table
        );
        Ok(())
    }

    /// Strip `function_name` from every item of every table.
    ///
    /// Scans the whole store. A failing table is recorded in the report and
    /// the scan moves on; only failing to enumerate tables is an error.
    pub fn remove_function_everywhere(
        &self,
        function_name: &str,
    ) -> Result<RemovalReport, RegistryError> {
        let tables = self.store.list_tables()?;
        let mut report = RemovalReport {
            function_name: function_name.to_string(),
            ..RemovalReport::default()
        };

        for table in tables {
            report.tables_scanned += 1;
            match self.remove_from_table(&table, function_name) {
                Ok(files) if files.is_empty() => {
                    tracing::debug!("no item in '{}' holds '{}'", table, function_name);
                }
                Ok(files) => {
                    for file_name in files {
                        tracing::info!(
                            "removed function '{}' from item '{}' in '{}'",
                            function_name,
                            file_name,
                            table
                        );
                        report.updated.push((table.clone(), file_name));
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        "failed to remove '{}' from table '{}': {}",
                        function_name,
                        table,
                        err
                    );
                    report.failures.push((table, err.to_string()));
                }
            }
        }
        Ok(report)
    }

    fn remove_from_table(
        &self,
        table: &TableName,
        function_name: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut updated = Vec::new();
        for candidate in self.store.scan_contains(table, function_name)? {
            // Re-read: the scan filter is a substring match on stale data.
            let Some(mut item) = self.store.get_item(table, &candidate.file_name)? else {
                continue;
            };
            if item.function_names.remove(function_name) {
                self.store
                    .update_function_names(table, &item.file_name, &item.function_names)?;
                updated.push(item.file_name);
            }
        }
        Ok(updated)
    }

    /// Every table with its items, sorted by table then file name.
    pub fn list_entries(&self) -> Result<Vec<(TableName, Vec<RegistryItem>)>, RegistryError> {
        let mut entries = Vec::new();
        for table in self.store.list_tables()? {
            let mut items = self.store.scan_contains(&table, "")?;
            items.sort_by(|a, b| a.file_name.cmp(&b.file_name));
            entries.push((table, items));
        }
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
