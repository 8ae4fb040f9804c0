//! funcsync core library — domain types, store collaborator, registry adapter.
//!
//! - [`types`] — newtypes and domain structs
//! - [`error`] — [`StoreError`], [`RegistryError`], [`ConfigError`]
//! - [`store`] — the [`RegistryStore`] trait
//! - [`memory`] / [`yaml_store`] — store implementations
//! - [`registry`] — table/item operations over any store
//! - [`config`] — runtime configuration

pub mod config;
pub mod error;
pub mod memory;
pub mod registry;
pub mod store;
pub mod types;
pub mod yaml_store;

pub use config::{Config, ReadinessPolicy, ResourceScope};
pub use error::{ConfigError, RegistryError, StoreError};
pub use memory::MemoryStore;
pub use registry::{Registry, RemovalReport};
pub use store::{RegistryStore, TableStatus};
pub use types::{ChangeSet, FunctionDescriptor, FunctionNames, RegistryItem, TableName};
pub use yaml_store::YamlStore;
