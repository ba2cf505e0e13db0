//! The payload shim engine.
//!
//! A shim wraps a command's transport-invoking callback with an explicit
//! pipeline of named [`PayloadStage`] strategies. Each stage reads the raw
//! parameter values, validates cross-field contracts, and contributes to
//! the finalized [`Invocation`] — typically by constructing the structured
//! request body and installing it as the verbatim payload. Every stage
//! completes fully in memory before the terminal callback touches the
//! transport, so a validation failure never results in a partially sent
//! request.

use std::rc::Rc;

use reef_spec::HttpMethod;
use serde_json::{Map, Value};
use tracing::debug;

use crate::command::Callback;
use crate::error::CliError;
use crate::param::ParamValues;

/// Per-invocation state handed through the shim pipeline to the terminal
/// callback.
#[derive(Debug, Default)]
pub struct Invocation {
    /// The values the user supplied, after coercion.
    pub values: ParamValues,
    /// The escape hatch the default callback reads as "send this body
    /// verbatim, do not derive one from parameter destinations".
    pub verbatim_payload: Option<Value>,
    /// Overrides the HTTP method the operation was generated with.
    pub method_override: Option<HttpMethod>,
}

impl Invocation {
    /// Start an invocation from bound parameter values.
    #[must_use]
    pub fn new(values: ParamValues) -> Self {
        Self {
            values,
            verbatim_payload: None,
            method_override: None,
        }
    }
}

/// One named payload-construction strategy.
///
/// Contract: read raw values from the invocation, write the finalized
/// payload/method onto it, and fail with [`CliError::InvalidUsage`] before
/// anything reaches the transport.
pub trait PayloadStage {
    /// Stage name for diagnostics.
    fn name(&self) -> &'static str;

    /// Apply the stage to the invocation.
    fn apply(&self, invocation: &mut Invocation) -> Result<(), CliError>;
}

/// Stage that forces the HTTP method of the final request.
pub struct ForceMethod(pub HttpMethod);

impl PayloadStage for ForceMethod {
    fn name(&self) -> &'static str {
        "force-method"
    }

    fn apply(&self, invocation: &mut Invocation) -> Result<(), CliError> {
        invocation.method_override = Some(self.0);
        Ok(())
    }
}

/// An ordered list of payload stages in front of a terminal
/// transport-invoking callback.
pub struct ShimPipeline {
    stages: Vec<Rc<dyn PayloadStage>>,
    terminal: Callback,
}

impl ShimPipeline {
    /// Start a pipeline that delegates to `terminal` once all stages ran.
    #[must_use]
    pub fn new(terminal: Callback) -> Self {
        Self {
            stages: Vec::new(),
            terminal,
        }
    }

    /// Append a stage.
    #[must_use]
    pub fn stage(mut self, stage: impl PayloadStage + 'static) -> Self {
        self.stages.push(Rc::new(stage));
        self
    }

    /// Append an already-shared stage.
    #[must_use]
    pub fn stage_rc(mut self, stage: Rc<dyn PayloadStage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Finish the pipeline into a command callback.
    #[must_use]
    pub fn into_callback(self) -> Callback {
        Rc::new(move |invocation| {
            for stage in &self.stages {
                debug!(stage = stage.name(), "applying payload stage");
                stage.apply(invocation)?;
            }
            (self.terminal)(invocation)
        })
    }
}

/// Insert `value` into a nested body at a dot-path, creating intermediate
/// objects as needed. A non-object intermediate is replaced.
pub fn insert_at_path(body: &mut Map<String, Value>, path: &str, value: Value) {
    let mut current = body;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot.as_object_mut() {
            Some(next) => current = next,
            // Unreachable: the slot was just made an object.
            None => return,
        }
    }
}
