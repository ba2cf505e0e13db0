//! Error types for descriptor parsing and validation.

use thiserror::Error;

/// Errors raised while parsing or validating a service descriptor.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The descriptor document could not be deserialized.
    #[error("descriptor parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The designated current version has no matching version entry.
    #[error("current version '{0}' has no matching version entry")]
    MissingCurrentVersion(String),

    /// Two entries at the same level share a name.
    #[error("duplicate {kind} '{name}' in {owner}")]
    Duplicate {
        /// What kind of entry collided (version, resource, operation, parameter).
        kind: &'static str,
        /// The colliding name.
        name: String,
        /// The entry that owns the colliding names.
        owner: String,
    },

    /// A `{segment}` in an operation path has no declared path parameter.
    #[error("operation '{operation}' references undeclared path parameter '{segment}'")]
    UndeclaredPathParam {
        /// The owning operation.
        operation: String,
        /// The path template segment with no matching parameter.
        segment: String,
    },

    /// A declared path parameter never appears in the operation path.
    #[error("operation '{operation}' declares unused path parameter '{parameter}'")]
    UnusedPathParam {
        /// The owning operation.
        operation: String,
        /// The parameter missing from the path template.
        parameter: String,
    },
}
