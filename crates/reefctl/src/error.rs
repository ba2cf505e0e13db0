//! CLI error taxonomy.
//!
//! Two families with very different audiences: `SpecMismatch` is a
//! build-time contract violation (an override and the service descriptor
//! have drifted apart) that aborts startup and should never reach a user
//! of a released binary; the remaining variants are invocation-time
//! failures that are always surfaced and never partially applied.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors produced while building the command tree or running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The generated command shape no longer matches what an override
    /// expects. Fatal at startup; names the owning command and the detail
    /// so the drift is easy to locate.
    #[error("spec mismatch in '{command}': {detail}")]
    SpecMismatch {
        /// Space-joined path of the command the override targets.
        command: String,
        /// What was expected and missing.
        detail: String,
    },

    /// The supplied options violate a documented precondition. Reported
    /// before any request is sent.
    #[error("{0}")]
    InvalidUsage(String),

    /// The HTTP exchange could not be completed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response could not be rendered in the requested output format.
    /// The underlying detail is logged at debug level, not echoed here.
    #[error("error parsing results")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Invalid-usage error with a formatted message.
    pub fn invalid_usage(message: impl Into<String>) -> Self {
        Self::InvalidUsage(message.into())
    }

    /// Spec-mismatch error for a command path.
    pub fn spec_mismatch(path: &[&str], detail: impl Into<String>) -> Self {
        Self::SpecMismatch {
            command: path.join(" "),
            detail: detail.into(),
        }
    }

    /// Spec-mismatch error for a missing command path segment.
    pub fn not_found(path: &[&str], segment: &str) -> Self {
        Self::SpecMismatch {
            command: path.join(" "),
            detail: format!("no such command '{segment}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_mismatch_names_command_and_detail() {
        let err = CliError::spec_mismatch(
            &["v2", "sessions", "create"],
            "expected parameter 'target-groups-name' to remove, but it is missing",
        );
        let msg = err.to_string();
        assert!(msg.contains("v2 sessions create"));
        assert!(msg.contains("target-groups-name"));
    }

    #[test]
    fn format_error_does_not_echo_detail() {
        let err = CliError::Format("unexpected token at line 3".into());
        assert_eq!(err.to_string(), "error parsing results");
    }

    #[test]
    fn invalid_usage_displays_message_verbatim() {
        let err = CliError::invalid_usage("at least one filter must be set for updates");
        assert_eq!(
            err.to_string(),
            "at least one filter must be set for updates"
        );
    }
}
