//! Template resource extraction.
//!
//! Infrastructure templates use short-form intrinsic tags (`!Ref Bucket`,
//! `!Sub "${Env}-api"`, `!GetAtt Role.Arn`). Each inline tag invocation is
//! replaced by [`TAG_PLACEHOLDER`] before parsing, then the `Resources`
//! mapping is read from the generic YAML document.

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::error::TemplateError;

/// Literal substituted for every inline intrinsic tag invocation.
pub const TAG_PLACEHOLDER: &str = "dummy-value";

/// `!Tag <argument>` where the argument is a quoted string, a flat flow
/// sequence, or a bare token. The first group is the preceding delimiter.
static INTRINSIC_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)(^|[\s\[,])!\w+[ \t]+(?:"[^"\n]*"|'[^'\n]*'|\[[^\]\n]*\]|[^\s,\]]+)"#,
    )
    .expect("intrinsic tag pattern is valid")
});

/// One entry of the `Resources` mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    /// The `Type` field, if it is a string.
    pub resource_type: Option<String>,
    /// The `Properties` mapping; empty when absent.
    pub properties: Mapping,
}

impl Resource {
    /// String value of a property, if present and a string.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }
}

/// Replace every inline `!Tag argument` with [`TAG_PLACEHOLDER`].
pub fn neutralize_intrinsic_tags(template: &str) -> String {
    INTRINSIC_TAG_REGEX
        .replace_all(template, format!("${{1}}{TAG_PLACEHOLDER}"))
        .into_owned()
}

/// Parse `template` and return its resources in document order.
///
/// A document without `Resources` (or an empty document) yields an empty
/// list.
pub fn parse_resources(template: &str) -> Result<Vec<Resource>, TemplateError> {
    let neutralized = neutralize_intrinsic_tags(template);
    if neutralized.trim().is_empty() {
        return Ok(vec![]);
    }
    let root: Value = serde_yaml::from_str(&neutralized)?;
    let root = match root {
        Value::Null => return Ok(vec![]),
        Value::Mapping(map) => map,
        _ => return Err(TemplateError::NotAMapping),
    };

    let resources = match root.get("Resources") {
        None | Some(Value::Null) => return Ok(vec![]),
        Some(Value::Mapping(map)) => map,
        Some(_) => return Err(TemplateError::InvalidResources),
    };

    let mut out = Vec::with_capacity(resources.len());
    for (name, body) in resources {
        let Some(name) = name.as_str() else {
            tracing::warn!("skipping resource with non-string name: {:?}", name);
            continue;
        };
        out.push(resource_from_body(name, body));
    }
    Ok(out)
}

/// [`parse_resources`] that reports failures in the log and returns an empty
/// list instead of an error.
pub fn extract_resources(template: &str) -> Vec<Resource> {
    match parse_resources(template) {
        Ok(resources) => resources,
        Err(err) => {
            tracing::warn!("could not extract resources: {}", err);
            vec![]
        }
    }
}

fn resource_from_body(name: &str, body: &Value) -> Resource {
    let resource_type = body
        .get("Type")
        .and_then(Value::as_str)
        .map(str::to_owned);
    let properties = match body.get("Properties") {
        Some(Value::Mapping(map)) => map.clone(),
        _ => Mapping::new(),
    };
    Resource {
        name: name.to_string(),
        resource_type,
        properties,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
