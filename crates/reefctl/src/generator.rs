//! Command tree generation from a service descriptor.
//!
//! Each descriptor operation becomes one leaf command whose default
//! callback derives the request mechanically from parameter destinations:
//! path parameters substitute into the `{segment}` templates, query
//! parameters append to the query string, body parameters build a nested
//! JSON object. Overrides then rewrite the interesting commands; everything
//! the generator produces is deliberately uniform.

use std::rc::Rc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reef_spec::{HttpMethod, OperationSpec, ParamLocation, ParamSpec, ServiceSpec};
use serde_json::{Map, Value};

use crate::command::{Callback, Command, CommandTree};
use crate::param::{Destination, ParamKind, Parameter};
use crate::shim::insert_at_path;
use crate::transport::{ApiRequest, Transport};

/// Characters escaped when a value is substituted into a path segment.
/// Everything outside the RFC 3986 unreserved set is encoded.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The route a generated operation callback sends to.
#[derive(Debug, Clone)]
pub struct Route {
    /// HTTP method the descriptor declares.
    pub method: HttpMethod,
    /// Full path template including base path and version tag.
    pub path: String,
}

/// Percent-encode a value for use as one path segment. `/` is encoded,
/// so an id containing a slash stays a single segment.
#[must_use]
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Render a coerced value as the string form used in paths and queries.
#[must_use]
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_scalar)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Derive a complete command tree from a service descriptor.
///
/// Layout: service root, one child per version tag, one grandchild per
/// resource, one leaf per operation. Version merging is the caller's step;
/// the generated tree is always explicit-version only.
#[must_use]
pub fn generate(spec: &ServiceSpec, transport: Rc<dyn Transport>) -> CommandTree {
    let mut root = Command::new(&spec.service, &spec.title);
    for version in &spec.versions {
        let mut version_node = Command::new(&version.tag, &spec.title);
        for resource in &version.resources {
            let mut resource_node = Command::new(&resource.name, "");
            for operation in &resource.operations {
                let leaf = generate_operation(spec, &version.tag, operation, &transport);
                resource_node
                    .children
                    .insert(operation.name.clone(), leaf.into_node());
            }
            version_node
                .children
                .insert(resource.name.clone(), resource_node.into_node());
        }
        root.children
            .insert(version.tag.clone(), version_node.into_node());
    }
    CommandTree::new(root.into_node(), spec.current_version.clone())
}

fn generate_operation(
    spec: &ServiceSpec,
    tag: &str,
    operation: &OperationSpec,
    transport: &Rc<dyn Transport>,
) -> Command {
    let mut command = Command::new(&operation.name, &operation.help);
    command.parameters = operation.parameters.iter().map(derive_parameter).collect();
    let route = Route {
        method: operation.method,
        path: format!("{}/{}{}", spec.base_path, tag, operation.path),
    };
    command.callback = Some(operation_callback(Rc::clone(transport), route));
    command
}

fn derive_parameter(spec: &ParamSpec) -> Parameter {
    let kind = match spec.kind {
        reef_spec::ParamKind::Text => ParamKind::Text,
        reef_spec::ParamKind::Integer => ParamKind::Integer,
        reef_spec::ParamKind::Boolean => ParamKind::Boolean,
        reef_spec::ParamKind::Flag => ParamKind::Flag,
    };
    let destination = match spec.location {
        ParamLocation::Path => Destination::PathSegment,
        ParamLocation::Query => Destination::Query(spec.destination_path()),
        ParamLocation::Body => Destination::Body(spec.destination_path()),
    };
    Parameter::new(&spec.name, kind)
        .required(spec.required || spec.location == ParamLocation::Path)
        .destination(destination)
        .help(&spec.help)
}

/// The default transport-invoking callback for a generated operation.
///
/// Body derivation is skipped entirely when a shim stage installed a
/// verbatim payload; an empty derived body is sent as no body at all.
pub fn operation_callback(transport: Rc<dyn Transport>, route: Route) -> Callback {
    Rc::new(move |invocation| {
        let method = invocation.method_override.take().unwrap_or(route.method);
        let mut path = route.path.clone();
        let mut query = Vec::new();
        let mut body = Map::new();
        for (name, entry) in invocation.values.iter() {
            match &entry.destination {
                Destination::PathSegment => {
                    let rendered = encode_segment(&render_scalar(&entry.value));
                    path = path.replace(&format!("{{{name}}}"), &rendered);
                }
                Destination::Query(key) => {
                    query.push((key.clone(), render_scalar(&entry.value)));
                }
                Destination::Body(dest) => {
                    insert_at_path(&mut body, dest, entry.value.clone());
                }
                Destination::None => {}
            }
        }
        let body = match invocation.verbatim_payload.take() {
            Some(payload) => Some(payload),
            None if !body.is_empty() => Some(Value::Object(body)),
            None => None,
        };
        let response = transport.send(&ApiRequest {
            method,
            path,
            query,
            body,
        })?;
        Ok(response.body)
    })
}
