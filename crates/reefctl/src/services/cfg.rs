//! The Configuration Management Service (`cfg`) command module.
//!
//! The generated tree gives every operation a flat `--option-per-field`
//! surface. The overrides here rebuild the commands whose payloads are
//! structural: configuration updates replace the whole layer list, session
//! creation composes a nested target block, and `updatemany` patches every
//! component matching a filter set. The overrides run against the explicit
//! version subtrees after the current version is merged onto the root, so
//! `cfg components updatemany` and `cfg v2 components updatemany` resolve
//! to the same command.

use std::rc::Rc;

use reef_spec::{HttpMethod, ServiceSpec};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::coerce::Coercer;
use crate::command::{Command, CommandTree, MergePolicy};
use crate::error::CliError;
use crate::generator::{self, encode_segment};
use crate::overrides::Override;
use crate::param::{Destination, ParamKind, Parameter};
use crate::shim::{insert_at_path, Invocation, PayloadStage};
use crate::transport::Transport;

const DESCRIPTOR: &str = include_str!("descriptors/cfg.json");

const VERSION_TAGS: [&str; 2] = ["v2", "v3"];

/// Build the `cfg` command tree: generate from the descriptor, merge the
/// current version onto the root, then apply the overrides.
pub fn build(transport: Rc<dyn Transport>) -> Result<CommandTree, CliError> {
    let spec = ServiceSpec::from_json(DESCRIPTOR)
        .map_err(|e| CliError::spec_mismatch(&["cfg"], e.to_string()))?;
    let tree = generator::generate(&spec, transport);
    // Merge first: the merged entries alias the versioned nodes, so every
    // override below is visible through the bare path as well.
    tree.merge_current(MergePolicy::Merged)?;
    setup(&tree)?;
    Ok(tree)
}

fn setup(tree: &CommandTree) -> Result<(), CliError> {
    debug!(service = tree.name(), "applying command overrides");
    for tag in VERSION_TAGS {
        setup_configurations_update(tree, tag)?;
        setup_sessions_create(tree, tag)?;
        // The session status record is maintained by the service itself;
        // the CLI never updates it.
        tree.delete(&[tag, "sessions", "update"])?;
        setup_components_update(tree, tag)?;
        setup_components_updatemany(tree, tag)?;
    }
    setup_sources(tree)?;
    Ok(())
}

/// Per-version spellings of the component patch fields.
struct VersionFields {
    desired_config: &'static str,
    retry_policy: &'static str,
    error_count: &'static str,
}

fn version_fields(tag: &str) -> VersionFields {
    if tag == "v2" {
        VersionFields {
            desired_config: "desiredConfig",
            retry_policy: "retryPolicy",
            error_count: "errorCount",
        }
    } else {
        VersionFields {
            desired_config: "desired_config",
            retry_policy: "retry_policy",
            error_count: "error_count",
        }
    }
}

/// `configurations update` replaces the whole layer list, which has no
/// sensible flat-option form. `--file` sends a complete configuration
/// document verbatim; `--update-branches` instead asks the service to
/// refresh commits from the layers' tracked branches (a PATCH with no
/// body). `--file` wins when both are given.
fn setup_configurations_update(tree: &CommandTree, tag: &str) -> Result<(), CliError> {
    Override::command(&[tag, "configurations", "update"])
        .remove_prefixed("layers-")
        .add_parameter(
            Parameter::new("file", ParamKind::Text)
                .help("Path to a JSON file with the complete configuration"),
        )
        .add_parameter(
            Parameter::new("update-branches", ParamKind::Flag)
                .help("Refresh layer commits from their tracked branches"),
        )
        .stage(ConfigurationsUpdateStage)
        .apply(tree)
}

struct ConfigurationsUpdateStage;

impl PayloadStage for ConfigurationsUpdateStage {
    fn name(&self) -> &'static str {
        "configurations-update"
    }

    fn apply(&self, invocation: &mut Invocation) -> Result<(), CliError> {
        if let Some(path) = invocation.values.get_str("file").map(str::to_owned) {
            let document = std::fs::read_to_string(&path).map_err(|e| {
                CliError::invalid_usage(format!("cannot read '{path}': {e}"))
            })?;
            let payload: Value = serde_json::from_str(&document).map_err(|e| {
                CliError::invalid_usage(format!("'{path}' is not valid JSON: {e}"))
            })?;
            invocation.verbatim_payload = Some(payload);
            return Ok(());
        }
        if invocation.values.is_set("update-branches") {
            invocation.method_override = Some(HttpMethod::Patch);
            return Ok(());
        }
        Err(CliError::invalid_usage(
            "either --file or --update-branches must be set for updates",
        ))
    }
}

/// `sessions create` composes the nested `target` block from repeatable
/// two-token options instead of the generated flat fields.
fn setup_sessions_create(tree: &CommandTree, tag: &str) -> Result<(), CliError> {
    Override::command(&[tag, "sessions", "create"])
        .remove_parameter("target-groups-name")
        .remove_parameter("target-groups-members")
        .remove_parameter("target-image-map-source-id")
        .remove_parameter("target-image-map-result-name")
        .add_parameter(
            Parameter::new("target-group", ParamKind::PairList)
                .value_names(["GROUPNAME", "MEMBERS"])
                .coercer(Coercer::named_groups("name", "members"))
                .help("Target group name and comma-separated members; repeatable"),
        )
        .add_parameter(
            Parameter::new("image-map", ParamKind::PairList)
                .value_names(["SOURCE_ID", "RESULT_NAME"])
                .coercer(Coercer::pair_objects("source_id", "result_name"))
                .help("Image id and the name for its customized result; repeatable"),
        )
        .add_parameter(
            Parameter::new("tags", ParamKind::Text)
                .destination(Destination::Body("tags".into()))
                .coercer(Coercer::key_value_map())
                .help("Comma-separated key=value tags for the session"),
        )
        .stage(SessionsCreateStage)
        .apply(tree)
}

struct SessionsCreateStage;

impl PayloadStage for SessionsCreateStage {
    fn name(&self) -> &'static str {
        "sessions-create"
    }

    fn apply(&self, invocation: &mut Invocation) -> Result<(), CliError> {
        let mut body = Map::new();
        for (_, entry) in invocation.values.iter() {
            if let Destination::Body(dest) = &entry.destination {
                if !dest.starts_with("target.") {
                    insert_at_path(&mut body, dest, entry.value.clone());
                }
            }
        }
        let mut target = Map::new();
        if let Some(definition) = invocation.values.get("target-definition") {
            target.insert("definition".into(), definition.clone());
        }
        target.insert(
            "groups".into(),
            invocation
                .values
                .get("target-group")
                .cloned()
                .unwrap_or_else(|| json!([])),
        );
        target.insert(
            "image_map".into(),
            invocation
                .values
                .get("image-map")
                .cloned()
                .unwrap_or_else(|| json!([])),
        );
        body.insert("target".into(), Value::Object(target));
        invocation.verbatim_payload = Some(Value::Object(body));
        Ok(())
    }
}

/// `components update` takes the desired state as one JSON document
/// (`--state`) rather than the generated per-field options.
fn setup_components_update(tree: &CommandTree, tag: &str) -> Result<(), CliError> {
    Override::command(&[tag, "components", "update"])
        .remove_prefixed("state-")
        .add_parameter(
            Parameter::new("state", ParamKind::Text)
                .help("Configuration state of the component, as JSON"),
        )
        .add_parameter(
            Parameter::new("tags", ParamKind::Text)
                .destination(Destination::Body("tags".into()))
                .coercer(Coercer::key_value_map())
                .help("Comma-separated key=value tags for the component"),
        )
        .stage(ComponentsUpdateStage)
        .apply(tree)
}

struct ComponentsUpdateStage;

impl PayloadStage for ComponentsUpdateStage {
    fn name(&self) -> &'static str {
        "components-update"
    }

    fn apply(&self, invocation: &mut Invocation) -> Result<(), CliError> {
        let mut body = Map::new();
        for (_, entry) in invocation.values.iter() {
            if let Destination::Body(dest) = &entry.destination {
                insert_at_path(&mut body, dest, entry.value.clone());
            }
        }
        if let Some(raw) = invocation.values.get_str("state") {
            let state: Value = serde_json::from_str(raw)
                .map_err(|e| CliError::invalid_usage(format!("--state is not valid JSON: {e}")))?;
            body.insert("state".into(), state);
        }
        invocation.verbatim_payload = Some(Value::Object(body));
        Ok(())
    }
}

/// Add `components updatemany`: one PATCH against the collection that
/// applies a patch to every component matching a filter set. The terminal
/// callback is shared with `components list` (same collection route); the
/// forced method turns it into a PATCH.
fn setup_components_updatemany(tree: &CommandTree, tag: &str) -> Result<(), CliError> {
    let list = tree.lookup(&[tag, "components", "list"])?;
    let terminal = list.borrow().callback.clone().ok_or_else(|| {
        CliError::spec_mismatch(&[tag, "components", "list"], "has no callback to wrap")
    })?;

    let mut command = Command::new(
        "updatemany",
        "Update every component matching the given filters",
    );
    command.parameters = vec![
        Parameter::new("filter-ids", ParamKind::Text)
            .coercer(Coercer::comma_list())
            .help("Comma-separated component ids to update"),
        Parameter::new("filter-status", ParamKind::Text)
            .coercer(Coercer::comma_list())
            .help("Comma-separated configuration statuses to match"),
        Parameter::new("filter-enabled", ParamKind::Boolean)
            .help("Match components by enabled state"),
        Parameter::new("filter-config-name", ParamKind::Text)
            .help("Match components by desired configuration"),
        Parameter::new("filter-tags", ParamKind::Text)
            .coercer(Coercer::key_value_map())
            .help("Comma-separated key=value tags to match"),
        Parameter::new("patch", ParamKind::Text)
            .help("Patch applied to every matching component, as JSON"),
        Parameter::new("state", ParamKind::Text)
            .help("Configuration state to patch in, as JSON"),
        Parameter::new("tags", ParamKind::Text)
            .coercer(Coercer::key_value_map())
            .help("Comma-separated key=value tags to patch in"),
        Parameter::new("enabled", ParamKind::Boolean)
            .help("Enabled state to patch in"),
        Parameter::new("desired-config", ParamKind::Text)
            .help("Desired configuration name to patch in"),
        Parameter::new("retry-policy", ParamKind::Integer)
            .help("Maximum configuration retries to patch in"),
        Parameter::new("error-count", ParamKind::Integer)
            .help("Configuration error count to patch in"),
    ];
    tree.insert(&[tag, "components"], command.into_node())?;
    Override::command(&[tag, "components", "updatemany"])
        .terminal(terminal)
        .stage(ComponentsUpdateManyStage {
            fields: version_fields(tag),
        })
        .force_method(HttpMethod::Patch)
        .apply(tree)
}

struct ComponentsUpdateManyStage {
    fields: VersionFields,
}

impl ComponentsUpdateManyStage {
    const FILTERS: [(&'static str, &'static str); 5] = [
        ("ids", "filter-ids"),
        ("status", "filter-status"),
        ("enabled", "filter-enabled"),
        ("config_name", "filter-config-name"),
        ("tags", "filter-tags"),
    ];
}

impl PayloadStage for ComponentsUpdateManyStage {
    fn name(&self) -> &'static str {
        "components-updatemany"
    }

    fn apply(&self, invocation: &mut Invocation) -> Result<(), CliError> {
        let mut filters = Map::new();
        for (key, option) in Self::FILTERS {
            // Any set value counts, explicit `--filter-enabled false`
            // included.
            if let Some(value) = invocation.values.get(option) {
                filters.insert(key.into(), value.clone());
            }
        }
        if filters.is_empty() {
            return Err(CliError::invalid_usage(
                "at least one filter must be set for updates",
            ));
        }

        let mut patch = match invocation.values.get_str("patch") {
            Some(raw) => {
                let value: Value = serde_json::from_str(raw).map_err(|e| {
                    CliError::invalid_usage(format!("--patch is not valid JSON: {e}"))
                })?;
                match value {
                    Value::Object(map) => map,
                    _ => {
                        return Err(CliError::invalid_usage("--patch must be a JSON object"));
                    }
                }
            }
            None => Map::new(),
        };
        if let Some(enabled) = invocation.values.get("enabled") {
            patch.insert("enabled".into(), enabled.clone());
        }
        if let Some(raw) = invocation.values.get_str("state") {
            let state: Value = serde_json::from_str(raw)
                .map_err(|e| CliError::invalid_usage(format!("--state is not valid JSON: {e}")))?;
            patch.insert("state".into(), state);
        }
        if let Some(tags) = invocation.values.get("tags") {
            patch.insert("tags".into(), tags.clone());
        }
        if let Some(value) = invocation.values.get("desired-config") {
            patch.insert(self.fields.desired_config.into(), value.clone());
        }
        if let Some(value) = invocation.values.get("retry-policy") {
            patch.insert(self.fields.retry_policy.into(), value.clone());
        }
        if let Some(value) = invocation.values.get("error-count") {
            patch.insert(self.fields.error_count.into(), value.clone());
        }

        invocation.verbatim_payload = Some(json!({
            "filters": filters,
            "patch": patch,
        }));
        Ok(())
    }
}

/// Source ids travel double-encoded: the gateway decodes the path once
/// when routing and the service decodes it again, so the id is encoded
/// here and a second time during path substitution.
fn setup_sources(tree: &CommandTree) -> Result<(), CliError> {
    for operation in ["describe", "update", "delete"] {
        Override::command(&["v3", "sources", operation])
            .stage(EncodeSourceIdStage)
            .apply(tree)?;
    }
    Ok(())
}

struct EncodeSourceIdStage;

impl PayloadStage for EncodeSourceIdStage {
    fn name(&self) -> &'static str {
        "encode-source-id"
    }

    fn apply(&self, invocation: &mut Invocation) -> Result<(), CliError> {
        if let Some(id) = invocation.values.get_str("source_id").map(str::to_owned) {
            invocation.values.set(
                "source_id",
                Destination::PathSegment,
                Value::String(encode_segment(&id)),
            );
        }
        Ok(())
    }
}
