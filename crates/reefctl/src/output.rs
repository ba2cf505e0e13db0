//! Result rendering.
//!
//! Responses print as pretty JSON by default; `--format` switches to YAML
//! or TOML. Formatting failures are reported with a deliberately generic
//! message (the raw serializer error can leak response fragments into
//! scripts that parse stderr); the detail goes to the debug log instead.

use std::str::FromStr;

use serde_json::{json, Value};
use tracing::debug;

use crate::error::CliError;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputKind {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// YAML document.
    Yaml,
    /// TOML document. Top-level lists are wrapped under a `results` key,
    /// since TOML has no top-level array form.
    Toml,
}

impl FromStr for OutputKind {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            other => Err(CliError::invalid_usage(format!(
                "unknown output format '{other}'"
            ))),
        }
    }
}

/// Render a response value in the requested format.
pub fn format_result(value: &Value, kind: OutputKind) -> Result<String, CliError> {
    let rendered = match kind {
        OutputKind::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        OutputKind::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        OutputKind::Toml => {
            let document = match value {
                Value::Object(_) => value.clone(),
                other => json!({ "results": other }),
            };
            toml::to_string_pretty(&document).map_err(|e| e.to_string())
        }
    };
    rendered.map_err(|detail| {
        debug!(%detail, "failed to render response");
        CliError::Format(detail)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_pretty_printed() {
        let out = format_result(&json!({"name": "session-1"}), OutputKind::Json).unwrap();
        assert_eq!(out, "{\n  \"name\": \"session-1\"\n}");
    }

    #[test]
    fn yaml_renders_nested_values() {
        let out = format_result(
            &json!({"target": {"groups": ["g1"]}}),
            OutputKind::Yaml,
        )
        .unwrap();
        assert!(out.contains("target:"));
        assert!(out.contains("- g1"));
    }

    #[test]
    fn toml_wraps_top_level_lists() {
        let out = format_result(&json!([{"id": "a"}, {"id": "b"}]), OutputKind::Toml).unwrap();
        assert!(out.contains("[[results]]"));
    }

    #[test]
    fn unrenderable_value_reports_generic_message() {
        // TOML has no null.
        let err = format_result(&json!({"field": null}), OutputKind::Toml).unwrap_err();
        assert_eq!(err.to_string(), "error parsing results");
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("yaml".parse::<OutputKind>().unwrap(), OutputKind::Yaml);
        assert!("xml".parse::<OutputKind>().is_err());
    }
}
