//! Service descriptor types.
//!
//! The descriptor is the machine-readable interface description a Reef
//! service publishes. Field names follow the JSON documents bundled with
//! each CLI service module.

use serde::{Deserialize, Serialize};

use crate::error::SpecError;

/// A complete service descriptor: one service, all of its API versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Short service name, used as the top-level command name (e.g. `cfg`).
    pub service: String,
    /// Human-readable service title for help output.
    pub title: String,
    /// Path prefix every operation path is joined onto (e.g. `/apis/cfg`).
    pub base_path: String,
    /// The version tag whose subtree is merged onto the service root.
    pub current_version: String,
    /// All published API versions, in registration order.
    pub versions: Vec<VersionSpec>,
}

/// One API version of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSpec {
    /// Version tag (e.g. `v2`). Becomes a sub-command name.
    pub tag: String,
    /// Resources exposed by this version.
    pub resources: Vec<ResourceSpec>,
}

/// A named resource grouping operations (e.g. `components`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Resource name. Becomes a sub-command group.
    pub name: String,
    /// Operations on this resource.
    pub operations: Vec<OperationSpec>,
}

/// A single REST operation, derived into one CLI command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Operation name (e.g. `list`, `update`). Becomes the command name.
    pub name: String,
    /// HTTP method the default callback issues.
    pub method: HttpMethod,
    /// Path template relative to the version root; `{name}` segments bind
    /// to declared path parameters.
    pub path: String,
    /// Declared parameters, in display order.
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
    /// One-line help text.
    #[serde(default)]
    pub help: String,
}

/// A declared operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name, unique within its operation. Body and query
    /// parameters surface as `--name` flags; path parameters surface as
    /// positional arguments.
    pub name: String,
    /// Declared value type.
    #[serde(default)]
    pub kind: ParamKind,
    /// Where the value lands in the request.
    pub location: ParamLocation,
    /// Whether the user must supply the value.
    #[serde(default)]
    pub required: bool,
    /// Dot-path into the request body for body parameters. Defaults to the
    /// parameter name with dashes mapped to underscores.
    #[serde(default)]
    pub destination: Option<String>,
    /// One-line help text.
    #[serde(default)]
    pub help: String,
}

impl ParamSpec {
    /// The body destination path for this parameter.
    #[must_use]
    pub fn destination_path(&self) -> String {
        self.destination
            .clone()
            .unwrap_or_else(|| self.name.replace('-', "_"))
    }
}

/// Declared parameter value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Free-form string value.
    #[default]
    Text,
    /// Integer value.
    Integer,
    /// Explicit boolean value (`true`/`false` must be spelled out).
    Boolean,
    /// Presence-only flag, no value token.
    Flag,
}

/// Where a parameter's value lands in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    /// Substituted into a `{segment}` of the operation path.
    Path,
    /// Appended to the query string.
    Query,
    /// Written into the request body at the destination dot-path.
    Body,
}

/// HTTP methods a descriptor operation may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET request.
    Get,
    /// PUT request.
    Put,
    /// POST request.
    Post,
    /// PATCH request.
    Patch,
    /// DELETE request.
    Delete,
}

impl HttpMethod {
    /// The method as an uppercase wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServiceSpec {
    /// Parse a descriptor from its JSON document and validate it.
    pub fn from_json(document: &str) -> Result<Self, SpecError> {
        let spec: Self = serde_json::from_str(document)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Look up a version by tag.
    #[must_use]
    pub fn version(&self, tag: &str) -> Option<&VersionSpec> {
        self.versions.iter().find(|v| v.tag == tag)
    }

    /// Structural validation: the current tag must exist, names must be
    /// unique at every level, and path templates must agree with declared
    /// path parameters.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.version(&self.current_version).is_none() {
            return Err(SpecError::MissingCurrentVersion(
                self.current_version.clone(),
            ));
        }
        check_unique(
            self.versions.iter().map(|v| v.tag.as_str()),
            "version",
            &self.service,
        )?;
        for version in &self.versions {
            let owner = format!("{} {}", self.service, version.tag);
            check_unique(
                version.resources.iter().map(|r| r.name.as_str()),
                "resource",
                &owner,
            )?;
            for resource in &version.resources {
                let owner = format!("{owner} {}", resource.name);
                check_unique(
                    resource.operations.iter().map(|o| o.name.as_str()),
                    "operation",
                    &owner,
                )?;
                for operation in &resource.operations {
                    operation.validate(&owner)?;
                }
            }
        }
        Ok(())
    }
}

impl OperationSpec {
    fn validate(&self, owner: &str) -> Result<(), SpecError> {
        let name = format!("{owner} {}", self.name);
        check_unique(
            self.parameters.iter().map(|p| p.name.as_str()),
            "parameter",
            &name,
        )?;
        for segment in template_segments(&self.path) {
            let declared = self
                .parameters
                .iter()
                .any(|p| p.location == ParamLocation::Path && p.name == segment);
            if !declared {
                return Err(SpecError::UndeclaredPathParam {
                    operation: name,
                    segment: segment.to_string(),
                });
            }
        }
        for param in &self.parameters {
            if param.location == ParamLocation::Path
                && !template_segments(&self.path).any(|s| s == param.name)
            {
                return Err(SpecError::UnusedPathParam {
                    operation: name,
                    parameter: param.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Iterate the `{name}` segments of a path template.
pub fn template_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter_map(|seg| seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
}

fn check_unique<'a>(
    names: impl Iterator<Item = &'a str>,
    kind: &'static str,
    owner: &str,
) -> Result<(), SpecError> {
    let mut seen = std::collections::BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(SpecError::Duplicate {
                kind,
                name: name.to_string(),
                owner: owner.to_string(),
            });
        }
    }
    Ok(())
}
