//! Error types for funcsync-template.

use thiserror::Error;

/// Errors from parsing template content.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The neutralized text is not valid YAML.
    #[error("template is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document root is not a mapping.
    #[error("template root must be a mapping")]
    NotAMapping,

    /// `Resources` is present but is not a mapping.
    #[error("`Resources` must be a mapping of resource name to definition")]
    InvalidResources,
}
