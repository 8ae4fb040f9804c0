//! `funcsync registry` — list and edit registry entries.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use funcsync_core::RegistryItem;

use super::Workspace;

#[derive(Subcommand, Debug)]
pub enum RegistryCommand {
    /// List every table with its items.
    List {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Remove a function name from every item of every table.
    Remove {
        /// Function name to remove.
        function: String,
    },
}

#[derive(Serialize)]
struct TableJson {
    table: String,
    items: Vec<RegistryItem>,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "table")]
    table: String,
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "folder")]
    folder: String,
    #[tabled(rename = "functions")]
    functions: String,
}

pub fn run(command: RegistryCommand, workspace: &Workspace) -> Result<()> {
    let registry = workspace.registry();
    match command {
        RegistryCommand::List { json } => {
            let entries = registry
                .list_entries()
                .context("failed to read the registry")?;
            if json {
                let payload: Vec<TableJson> = entries
                    .into_iter()
                    .map(|(table, items)| TableJson {
                        table: table.0,
                        items,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("Registry is empty.");
                return Ok(());
            }
            let rows: Vec<EntryRow> = entries
                .into_iter()
                .flat_map(|(table, items)| {
                    items.into_iter().map(move |item| EntryRow {
                        table: table.to_string(),
                        file: item.file_name,
                        folder: item.folder_name,
                        functions: item.function_names.joined(),
                    })
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        RegistryCommand::Remove { function } => {
            let report = registry
                .remove_function_everywhere(&function)
                .with_context(|| format!("failed to remove '{function}'"))?;
            for (table, file_name) in &report.updated {
                println!("{} '{}' from {}/{}", "removed".red(), function, table, file_name);
            }
            for (table, error) in &report.failures {
                println!("{} {}: {}", "✗".red(), table, error);
            }
            println!(
                "✓ scanned {} table(s), updated {} item(s)",
                report.tables_scanned,
                report.updated.len()
            );
        }
    }
    Ok(())
}
