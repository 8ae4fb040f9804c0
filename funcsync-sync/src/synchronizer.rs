//! Applies a [`ChangeSet`] to the registry.
//!
//! Phases run in a fixed order: removals, then added lines, then new files.
//! Every failure is contained to its unit of work (one function name, one
//! file, one resource) and recorded in the [`SyncReport`].
//!
//! With [`ResourceScope::FirstMatch`] the first resource carrying a `Handler`
//! ends its whole phase: later resources and later files are not visited.

use std::ops::ControlFlow;

use serde::Serialize;

use funcsync_core::{
    ChangeSet, Config, FunctionDescriptor, Registry, RegistryError, RegistryStore, RemovalReport,
    ResourceScope,
};
use funcsync_template::identity::HANDLER_PROPERTY;
use funcsync_template::{
    extract_resources, folder_label, IdentityStrategy, RemovedLineNames, ResourceFunctions,
};

use crate::diff::decode_content;
use crate::source::SourceControl;

/// Which part of the change set a unit of work came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Removal,
    Addition,
    NewFile,
}

/// What registering one descriptor did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddAction {
    /// Table was missing; created and seeded with the item.
    TableCreated,
    /// Table existed, item was missing.
    ItemCreated,
    /// Item existed without the function name.
    FunctionAdded,
    /// Nothing to do.
    AlreadyPresent,
}

impl AddAction {
    pub fn changed_registry(self) -> bool {
        self != AddAction::AlreadyPresent
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub file: String,
    pub descriptor: FunctionDescriptor,
    pub action: AddAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub phase: Phase,
    /// File path or function name the failure belongs to.
    pub unit: String,
    pub error: String,
}

/// Everything one [`Synchronizer::apply`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub removals: Vec<RemovalReport>,
    pub registrations: Vec<Registration>,
    pub failures: Vec<Failure>,
    /// Added or new files that no longer exist at the revision.
    pub files_skipped: Vec<String>,
}

impl SyncReport {
    /// Registrations that changed the registry.
    pub fn registered(&self) -> usize {
        self.registrations
            .iter()
            .filter(|r| r.action.changed_registry())
            .count()
    }

    /// Items a function name was stripped from.
    pub fn removed(&self) -> usize {
        self.removals.iter().map(|r| r.updated.len()).sum()
    }

    /// Failed units, including per-table removal failures.
    pub fn failed(&self) -> usize {
        self.failures.len() + self.removals.iter().map(|r| r.failures.len()).sum::<usize>()
    }
}

/// Reconciles the registry with one revision of one repository.
pub struct Synchronizer<'a, C: ?Sized, S> {
    source: &'a C,
    registry: &'a Registry<S>,
    config: &'a Config,
    repository: &'a str,
    revision: &'a str,
}

impl<'a, C, S> Synchronizer<'a, C, S>
where
    C: SourceControl + ?Sized,
    S: RegistryStore,
{
    /// `revision` is the after revision; added and new files are read there.
    pub fn new(
        source: &'a C,
        registry: &'a Registry<S>,
        config: &'a Config,
        repository: &'a str,
        revision: &'a str,
    ) -> Self {
        Self {
            source,
            registry,
            config,
            repository,
            revision,
        }
    }

    pub fn apply(&self, changes: &ChangeSet) -> SyncReport {
        let mut report = SyncReport::default();

        if changes.has_removals() {
            self.remove_functions(changes, &mut report);
        } else {
            tracing::debug!("no removal work");
        }

        if changes.has_additions() {
            for file in changes.files_with_additions() {
                if self.register_file(Phase::Addition, file, &mut report).is_break() {
                    break;
                }
            }
        }

        for file in &changes.new_files {
            if self.register_file(Phase::NewFile, file, &mut report).is_break() {
                break;
            }
        }

        tracing::info!(
            "{}@{}: {} registered, {} removed, {} failed",
            self.repository,
            self.revision,
            report.registered(),
            report.removed(),
            report.failed()
        );
        report
    }

    // -----------------------------------------------------------------------
    // Removal phase
    // -----------------------------------------------------------------------

    fn remove_functions(&self, changes: &ChangeSet, report: &mut SyncReport) {
        let names = RemovedLineNames.extract(&changes.removed);
        tracing::debug!("removed lines mention {} function name(s)", names.len());
        for name in names {
            match self.registry.remove_function_everywhere(&name) {
                Ok(removal) => report.removals.push(removal),
                Err(err) => {
                    tracing::error!("could not remove function '{}': {}", name, err);
                    report.failures.push(Failure {
                        phase: Phase::Removal,
                        unit: name,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Addition phase
    // -----------------------------------------------------------------------

    /// Register the functions of one template.
    ///
    /// Breaks when the rest of the phase must be skipped.
    fn register_file(&self, phase: Phase, path: &str, report: &mut SyncReport) -> ControlFlow<()> {
        if !self.config.is_template(path) {
            tracing::debug!("{}: not a template, ignored", path);
            return ControlFlow::Continue(());
        }

        let bytes = match self
            .source
            .get_file_content(self.repository, self.revision, path)
        {
            Ok(bytes) => bytes,
            Err(err) if err.is_not_found() => {
                tracing::debug!("{}: absent at {}, nothing to register", path, self.revision);
                report.files_skipped.push(path.to_string());
                return ControlFlow::Continue(());
            }
            Err(err) => {
                tracing::warn!("{}: could not read template: {}", path, err);
                report.failures.push(Failure {
                    phase,
                    unit: path.to_string(),
                    error: err.to_string(),
                });
                return ControlFlow::Continue(());
            }
        };
        let text = match decode_content(bytes, self.revision, path) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("{}: {}", path, err);
                report.failures.push(Failure {
                    phase,
                    unit: path.to_string(),
                    error: err.to_string(),
                });
                return ControlFlow::Continue(());
            }
        };

        tracing::debug!("{}: extracting resources", path);
        let resources = extract_resources(&text);
        let strategy = ResourceFunctions::new(folder_label(path));
        let first_match = self.config.resource_scope == ResourceScope::FirstMatch;
        for resource in &resources {
            let Some(descriptor) = strategy.descriptor(resource) else {
                if first_match && resource.has_property(HANDLER_PROPERTY) {
                    tracing::error!(
                        "{}: resource '{}' has a Handler but no usable FunctionName",
                        path,
                        resource.name
                    );
                    report.failures.push(Failure {
                        phase,
                        unit: format!("{}#{}", path, resource.name),
                        error: "resource has a Handler but no usable FunctionName".to_string(),
                    });
                    return ControlFlow::Break(());
                }
                continue;
            };
            match self.register(&descriptor) {
                Ok(action) => report.registrations.push(Registration {
                    file: path.to_string(),
                    descriptor,
                    action,
                }),
                Err(err) => {
                    tracing::error!(
                        "{}: failed to register '{}': {}",
                        path,
                        descriptor.function_name,
                        err
                    );
                    report.failures.push(Failure {
                        phase,
                        unit: format!("{}#{}", path, resource.name),
                        error: err.to_string(),
                    });
                }
            }
            if first_match {
                tracing::debug!("{}: first match reached, ending the phase", path);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Ensure table, item and function name exist for `descriptor`.
    fn register(&self, descriptor: &FunctionDescriptor) -> Result<AddAction, RegistryError> {
        let table = descriptor.table();
        let file_name = descriptor.file_name();
        let function_name = descriptor.function_name.as_str();

        if !self.registry.table_exists(&table)? {
            self.registry.create_table(&table)?;
            self.registry.wait_until_ready(&table)?;
            self.registry
                .create_item(&table, file_name, &descriptor.source_folder, function_name)?;
            return Ok(AddAction::TableCreated);
        }
        if !self.registry.item_exists(&table, file_name)? {
            self.registry
                .create_item(&table, file_name, &descriptor.source_folder, function_name)?;
            return Ok(AddAction::ItemCreated);
        }
        if self
            .registry
            .function_exists(&table, file_name, function_name)?
        {
            tracing::debug!("'{}' already registered in '{}'", function_name, table);
            return Ok(AddAction::AlreadyPresent);
        }
        self.registry
            .add_function_to_item(&table, file_name, function_name)?;
        Ok(AddAction::FunctionAdded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funcsync_core::{MemoryStore, ReadinessPolicy, TableName};

    use crate::source::MemorySource;

    const TWO_FUNCTIONS: &str = "Resources:
  A:
    Properties:
      Handler: index.a
      FunctionName: alpha
  B:
    Properties:
      Handler: index.b
      FunctionName: beta
";

    fn added(path: &str) -> ChangeSet {
        let mut changes = ChangeSet::default();
        changes
            .added
            .insert(path.to_string(), vec!["Resources:".to_string()]);
        changes
    }

    fn source() -> MemorySource {
        let mut s = MemorySource::new();
        s.add_commit(
            "repo",
            "c1",
            &[],
            &[("svc/template.yaml", TWO_FUNCTIONS), ("README.md", "FunctionName: x")],
        );
        s
    }

    fn registry() -> Registry<MemoryStore> {
        Registry::new(MemoryStore::new(), ReadinessPolicy::immediate(1))
    }

    #[test]
    fn all_scope_registers_every_resource() {
        let (src, reg, config) = (source(), registry(), Config::default());
        let report =
            Synchronizer::new(&src, &reg, &config, "repo", "c1").apply(&added("svc/template.yaml"));
        let actions: Vec<_> = report.registrations.iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![AddAction::TableCreated, AddAction::FunctionAdded]);
        let item = reg.store().items(&TableName::from("index")).remove(0);
        assert_eq!(item.function_names.joined(), "alpha,beta");
        assert_eq!(item.folder_name, "template");
    }

    #[test]
    fn first_match_scope_stops_after_first_descriptor() {
        let (src, reg) = (source(), registry());
        let config = Config {
            resource_scope: ResourceScope::FirstMatch,
            ..Config::default()
        };
        let report =
            Synchronizer::new(&src, &reg, &config, "repo", "c1").apply(&added("svc/template.yaml"));
        assert_eq!(report.registrations.len(), 1);
        assert_eq!(report.registrations[0].descriptor.function_name, "alpha");
    }

    #[test]
    fn non_template_files_are_ignored() {
        let (src, reg, config) = (source(), registry(), Config::default());
        let report =
            Synchronizer::new(&src, &reg, &config, "repo", "c1").apply(&added("README.md"));
        assert!(report.registrations.is_empty());
        assert!(reg.store().list_tables().unwrap().is_empty());
    }

    #[test]
    fn new_file_missing_at_revision_is_skipped() {
        let (src, reg, config) = (source(), registry(), Config::default());
        let changes = ChangeSet {
            new_files: vec!["gone.yaml".to_string()],
            ..ChangeSet::default()
        };
        let report = Synchronizer::new(&src, &reg, &config, "repo", "c1").apply(&changes);
        assert_eq!(report.files_skipped, vec!["gone.yaml"]);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn table_that_never_becomes_ready_is_a_failure() {
        let src = source();
        let reg = Registry::new(
            MemoryStore::with_creation_polls(10),
            ReadinessPolicy::immediate(2),
        );
        let config = Config::default();
        let report =
            Synchronizer::new(&src, &reg, &config, "repo", "c1").apply(&added("svc/template.yaml"));
        assert!(report.registrations.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].phase, Phase::Addition);
        assert_eq!(report.failures[0].unit, "svc/template.yaml#A");
    }

    #[test]
    fn read_failure_is_recorded_per_file() {
        let mut src = source();
        src.fail_reads_of("svc/template.yaml");
        let (reg, config) = (registry(), Config::default());
        let report =
            Synchronizer::new(&src, &reg, &config, "repo", "c1").apply(&added("svc/template.yaml"));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].unit, "svc/template.yaml");
    }

    fn single_function(handler: &str, name: &str) -> String {
        format!(
            "Resources:
  F:
    Properties:
      Handler: {handler}
      FunctionName: {name}
"
        )
    }

    fn added_all(paths: &[&str]) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for path in paths {
            changes
                .added
                .insert(path.to_string(), vec!["Resources:".to_string()]);
        }
        changes
    }

    fn first_match() -> Config {
        Config {
            resource_scope: ResourceScope::FirstMatch,
            ..Config::default()
        }
    }

    #[test]
    fn first_match_ends_the_addition_phase_across_files() {
        let (a, b) = (single_function("alpha.h", "fa"), single_function("beta.h", "fb"));
        let mut src = MemorySource::new();
        src.add_commit("repo", "c1", &[], &[("a.yaml", &a), ("b.yaml", &b)]);
        let (reg, config) = (registry(), first_match());

        let report = Synchronizer::new(&src, &reg, &config, "repo", "c1")
            .apply(&added_all(&["a.yaml", "b.yaml"]));
        assert_eq!(report.registrations.len(), 1);
        assert_eq!(report.registrations[0].file, "a.yaml");
        assert_eq!(reg.store().list_tables().unwrap(), vec![TableName::from("alpha")]);
    }

    #[test]
    fn first_match_handler_without_name_is_a_failure() {
        let unnamed = "Resources:
  X:
    Properties:
      Handler: gamma.h
  Y:
    Properties:
      Handler: delta.h
      FunctionName: fy
";
        let later = single_function("omega.h", "fz");
        let mut src = MemorySource::new();
        src.add_commit("repo", "c1", &[], &[("c.yaml", unnamed), ("d.yaml", &later)]);
        let (reg, config) = (registry(), first_match());

        let report = Synchronizer::new(&src, &reg, &config, "repo", "c1")
            .apply(&added_all(&["c.yaml", "d.yaml"]));
        assert!(report.registrations.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].unit, "c.yaml#X");
        assert!(reg.store().list_tables().unwrap().is_empty());
    }

    #[test]
    fn all_scope_keeps_going_past_unnamed_handlers() {
        let unnamed = "Resources:
  X:
    Properties:
      Handler: gamma.h
  Y:
    Properties:
      Handler: delta.h
      FunctionName: fy
";
        let mut src = MemorySource::new();
        src.add_commit("repo", "c1", &[], &[("c.yaml", unnamed)]);
        let (reg, config) = (registry(), Config::default());

        let report =
            Synchronizer::new(&src, &reg, &config, "repo", "c1").apply(&added("c.yaml"));
        assert!(report.failures.is_empty());
        assert_eq!(report.registrations.len(), 1);
        assert_eq!(report.registrations[0].descriptor.function_name, "fy");
    }

    #[test]
    fn first_match_ends_the_new_file_phase() {
        let (a, b) = (single_function("alpha.h", "fa"), single_function("beta.h", "fb"));
        let mut src = MemorySource::new();
        src.add_commit("repo", "c1", &[], &[("a.yaml", &a), ("b.yaml", &b)]);
        let (reg, config) = (registry(), first_match());
        let changes = ChangeSet {
            new_files: vec!["a.yaml".to_string(), "b.yaml".to_string()],
            ..ChangeSet::default()
        };

        let report = Synchronizer::new(&src, &reg, &config, "repo", "c1").apply(&changes);
        assert_eq!(report.registrations.len(), 1);
        assert_eq!(report.registrations[0].descriptor.function_name, "fa");
    }
}
