//! Function identity extraction.
//!
//! Two strategies share the [`IdentityStrategy`] capability:
//!
//! - [`RemovedLineNames`] scans raw diff lines for `FunctionName:` markers.
//!   Removal only needs a name, and removed lines may no longer parse as a
//!   template.
//! - [`ResourceFunctions`] reads handler + function-name pairs from parsed
//!   resources. Registration needs the handler module too, which only the
//!   structured form carries reliably.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use funcsync_core::FunctionDescriptor;

use crate::resources::{Resource, TAG_PLACEHOLDER};

/// Property holding the handler reference (`module.function`).
pub const HANDLER_PROPERTY: &str = "Handler";
/// Property holding the deployed function name.
pub const FUNCTION_NAME_PROPERTY: &str = "FunctionName";

static FUNCTION_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"FunctionName:\s*(\S+)").expect("function name pattern is valid")
});

/// Derives function identities from some input shape.
pub trait IdentityStrategy {
    type Input: ?Sized;
    type Identity;

    fn extract(&self, input: &Self::Input) -> Vec<Self::Identity>;
}

// ---------------------------------------------------------------------------
// Removal path
// ---------------------------------------------------------------------------

/// Function names mentioned by removed diff lines, keyed by file path.
///
/// Names are unique across the whole input, in first-seen order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemovedLineNames;

impl RemovedLineNames {
    /// Names mentioned by a single line.
    pub fn names_in_line(line: &str) -> impl Iterator<Item = &str> {
        FUNCTION_NAME_REGEX
            .captures_iter(line)
            .filter_map(|caps| caps.get(1))
            .map(|m| strip_quotes(m.as_str()))
            .filter(|name| !name.is_empty() && !name.starts_with('!'))
    }
}

impl IdentityStrategy for RemovedLineNames {
    type Input = BTreeMap<String, Vec<String>>;
    type Identity = String;

    fn extract(&self, input: &Self::Input) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for line in input.values().flatten() {
            for name in Self::names_in_line(line) {
                if seen.insert(name.to_string()) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }
}

fn strip_quotes(token: &str) -> &str {
    let token = token.trim_end_matches(',');
    for quote in ['"', '\''] {
        if let Some(inner) = token
            .strip_prefix(quote)
            .and_then(|t| t.strip_suffix(quote))
        {
            return inner;
        }
    }
    token
}

// ---------------------------------------------------------------------------
// Addition path
// ---------------------------------------------------------------------------

/// Function descriptors declared by parsed resources of one template.
#[derive(Debug, Clone, Copy)]
pub struct ResourceFunctions<'a> {
    /// Folder label recorded on every descriptor.
    pub source_folder: &'a str,
}

impl<'a> ResourceFunctions<'a> {
    pub fn new(source_folder: &'a str) -> Self {
        Self { source_folder }
    }

    /// Descriptor for one resource, or `None` if it is not a function unit.
    ///
    /// Resources without a `Handler` are other infrastructure and are skipped
    /// silently. A handler without a usable `FunctionName` is skipped with a
    /// warning.
    pub fn descriptor(&self, resource: &Resource) -> Option<FunctionDescriptor> {
        if !resource.has_property(HANDLER_PROPERTY) {
            return None;
        }
        let Some(handler) = resource.property_str(HANDLER_PROPERTY) else {
            tracing::warn!("resource '{}': Handler is not a string", resource.name);
            return None;
        };
        let module = handler_module(handler);
        if module.is_empty() || module == TAG_PLACEHOLDER {
            tracing::warn!(
                "resource '{}': cannot derive a module from handler '{}'",
                resource.name,
                handler
            );
            return None;
        }
        let function_name = match resource.property_str(FUNCTION_NAME_PROPERTY) {
            Some(name) if !name.is_empty() && name != TAG_PLACEHOLDER => name,
            _ => {
                tracing::warn!(
                    "resource '{}': handler '{}' has no literal FunctionName",
                    resource.name,
                    handler
                );
                return None;
            }
        };
        Some(FunctionDescriptor {
            handler_module: module.to_string(),
            function_name: function_name.to_string(),
            source_folder: self.source_folder.to_string(),
        })
    }
}

impl IdentityStrategy for ResourceFunctions<'_> {
    type Input = [Resource];
    type Identity = FunctionDescriptor;

    fn extract(&self, input: &[Resource]) -> Vec<FunctionDescriptor> {
        input.iter().filter_map(|r| self.descriptor(r)).collect()
    }
}

/// Module segment of a handler reference: text before the first `.`.
pub fn handler_module(handler: &str) -> &str {
    handler.split('.').next().unwrap_or_default().trim()
}

/// Folder label of a changed file: the stem of its last path segment.
///
/// `service/template.yaml` → `template`. The containing directory is not
/// used.
pub fn folder_label(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.split('.').next().unwrap_or(file)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::parse_resources;
    use rstest::rstest;

    fn removed(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(path, lines)| {
                (
                    path.to_string(),
                    lines.iter().map(|l| l.to_string()).collect(),
                )
            })
            .collect()
    }

    #[rstest]
    #[case("      FunctionName: orderProcessor", Some("orderProcessor"))]
    #[case("FunctionName:listBugs", Some("listBugs"))]
    #[case(r#"  FunctionName: "quoted-name""#, Some("quoted-name"))]
    #[case("  FunctionName: 'single'", Some("single"))]
    #[case("  FunctionName: !Sub ${Env}-api", None)]
    #[case("  Handler: index.handler", None)]
    #[case("  FunctionName:", None)]
    fn names_in_line(#[case] line: &str, #[case] expected: Option<&str>) {
        assert_eq!(RemovedLineNames::names_in_line(line).next(), expected);
    }

    #[test]
    fn removed_names_are_unique_in_first_seen_order() {
        let input = removed(&[
            ("a.yaml", &["FunctionName: beta", "FunctionName: alpha"]),
            ("b.yaml", &["FunctionName: beta", "Handler: x.y"]),
        ]);
        assert_eq!(RemovedLineNames.extract(&input), vec!["beta", "alpha"]);
    }

    #[test]
    fn removed_lines_without_marker_yield_nothing() {
        let input = removed(&[("a.yaml", &["Timeout: 30", "   "])]);
        assert!(RemovedLineNames.extract(&input).is_empty());
    }

    #[rstest]
    #[case("index.handler", "index")]
    #[case("app.lambda.main", "app")]
    #[case("plain", "plain")]
    #[case(".handler", "")]
    fn handler_module_truncates_at_first_dot(#[case] handler: &str, #[case] module: &str) {
        assert_eq!(handler_module(handler), module);
    }

    #[rstest]
    #[case("service/template.yaml", "template")]
    #[case("template.yml", "template")]
    #[case("a/b/orders.stack.yaml", "orders")]
    #[case("nested/dir/", "")]
    fn folder_label_uses_file_stem(#[case] path: &str, #[case] label: &str) {
        assert_eq!(folder_label(path), label);
    }

    #[test]
    fn structured_extraction_pairs_handler_with_function_name() {
        let resources = parse_resources(
            r#"
Resources:
  Orders:
    Type: AWS::Serverless::Function
    Properties:
      Handler: index.handler
      FunctionName: orderProcessor
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      BucketName: orders
  Bugs:
    Type: AWS::Serverless::Function
    Properties:
      Handler: bugs.list
      FunctionName: listBugs
"#,
        )
        .unwrap();

        let found = ResourceFunctions::new("template").extract(&resources);
        assert_eq!(
            found,
            vec![
                FunctionDescriptor {
                    handler_module: "index".into(),
                    function_name: "orderProcessor".into(),
                    source_folder: "template".into(),
                },
                FunctionDescriptor {
                    handler_module: "bugs".into(),
                    function_name: "listBugs".into(),
                    source_folder: "template".into(),
                },
            ]
        );
    }

    #[rstest]
    #[case::no_handler("FunctionName: orphan\n")]
    #[case::no_function_name("Handler: index.handler\n")]
    #[case::tagged_function_name("Handler: index.handler\n      FunctionName: !Sub ${Env}-fn\n")]
    #[case::tagged_handler("Handler: !Ref HandlerParam\n      FunctionName: fn\n")]
    fn incomplete_resources_are_skipped(#[case] properties: &str) {
        let text = format!("Resources:\n  Fn:\n    Properties:\n      {properties}");
        let resources = parse_resources(&text).unwrap();
        assert_eq!(resources.len(), 1);
        assert!(ResourceFunctions::new("f").extract(&resources).is_empty());
    }
}
