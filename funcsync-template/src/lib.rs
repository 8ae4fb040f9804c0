//! # funcsync-template
//!
//! Reads deployable function units out of infrastructure templates.
//!
//! [`extract_resources`] parses a template into its `Resources` after
//! neutralizing intrinsic tags. The [`identity`] module turns either parsed
//! resources or raw removed diff lines into function identities.

pub mod error;
pub mod identity;
pub mod resources;

pub use error::TemplateError;
pub use identity::{
    folder_label, handler_module, IdentityStrategy, RemovedLineNames, ResourceFunctions,
};
pub use resources::{
    extract_resources, neutralize_intrinsic_tags, parse_resources, Resource, TAG_PLACEHOLDER,
};
