//! Per-command override rules.
//!
//! An [`Override`] is a declarative rewrite of one generated command:
//! remove parameters the service composes structurally, add the friendlier
//! options that replace them, and wrap the callback in a shim pipeline that
//! rebuilds the structured payload. Every expectation an override states is
//! checked against the generated command when it is applied; a miss is a
//! [`CliError::SpecMismatch`] that aborts startup, so descriptor drift is
//! caught at build time instead of producing a silently wrong request.

use std::rc::Rc;

use reef_spec::HttpMethod;
use tracing::debug;

use crate::command::{Callback, CommandTree};
use crate::error::CliError;
use crate::param::Parameter;
use crate::shim::{ForceMethod, PayloadStage, ShimPipeline};

/// How a removal names its target parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ParamMatcher {
    /// Exactly one parameter with this name must exist.
    Exact(String),
    /// Every parameter whose name starts with this prefix; at least one
    /// must exist.
    Prefix(String),
}

/// A rewrite rule for one command.
pub struct Override {
    path: Vec<String>,
    removals: Vec<ParamMatcher>,
    additions: Vec<Parameter>,
    stages: Vec<Rc<dyn PayloadStage>>,
    terminal: Option<Callback>,
}

impl Override {
    /// Target the command at `path` (relative to the tree root).
    pub fn command(path: &[&str]) -> Self {
        Self {
            path: path.iter().map(ToString::to_string).collect(),
            removals: Vec::new(),
            additions: Vec::new(),
            stages: Vec::new(),
            terminal: None,
        }
    }

    /// Remove the parameter named exactly `name`.
    #[must_use]
    pub fn remove_parameter(mut self, name: impl Into<String>) -> Self {
        self.removals.push(ParamMatcher::Exact(name.into()));
        self
    }

    /// Remove every parameter whose name starts with `prefix`.
    #[must_use]
    pub fn remove_prefixed(mut self, prefix: impl Into<String>) -> Self {
        self.removals.push(ParamMatcher::Prefix(prefix.into()));
        self
    }

    /// Add a parameter at the head of the command's parameter list.
    /// Multiple additions keep their given order ahead of the generated
    /// parameters.
    #[must_use]
    pub fn add_parameter(mut self, parameter: Parameter) -> Self {
        self.additions.push(parameter);
        self
    }

    /// Wrap the command's callback with a payload stage. Stages run in the
    /// order they are attached.
    #[must_use]
    pub fn stage(mut self, stage: impl PayloadStage + 'static) -> Self {
        self.stages.push(Rc::new(stage));
        self
    }

    /// Force the HTTP method of the final request.
    #[must_use]
    pub fn force_method(self, method: HttpMethod) -> Self {
        self.stage(ForceMethod(method))
    }

    /// Replace the terminal callback the shim pipeline delegates to,
    /// instead of wrapping the command's own.
    #[must_use]
    pub fn terminal(mut self, callback: Callback) -> Self {
        self.terminal = Some(callback);
        self
    }

    /// Apply the rule to `tree`.
    pub fn apply(&self, tree: &CommandTree) -> Result<(), CliError> {
        let path: Vec<&str> = self.path.iter().map(String::as_str).collect();
        let node = tree.lookup(&path)?;
        let mut command = node.borrow_mut();
        debug!(command = path.join(" "), "applying override");

        for removal in &self.removals {
            match removal {
                ParamMatcher::Exact(name) => {
                    let index = command
                        .parameters
                        .iter()
                        .position(|p| p.name == *name)
                        .ok_or_else(|| {
                            CliError::spec_mismatch(
                                &path,
                                format!("expected parameter '{name}' to remove, but it is missing"),
                            )
                        })?;
                    command.parameters.remove(index);
                }
                ParamMatcher::Prefix(prefix) => {
                    let before = command.parameters.len();
                    command.parameters.retain(|p| !p.name.starts_with(prefix.as_str()));
                    if command.parameters.len() == before {
                        return Err(CliError::spec_mismatch(
                            &path,
                            format!(
                                "expected parameters prefixed '{prefix}' to remove, but none are present"
                            ),
                        ));
                    }
                }
            }
        }

        for (index, parameter) in self.additions.iter().enumerate() {
            if command.parameter(&parameter.name).is_some() {
                return Err(CliError::spec_mismatch(
                    &path,
                    format!("parameter '{}' already exists", parameter.name),
                ));
            }
            command.parameters.insert(index, parameter.clone());
        }

        if !self.stages.is_empty() || self.terminal.is_some() {
            let terminal = match &self.terminal {
                Some(callback) => Rc::clone(callback),
                None => command.callback.clone().ok_or_else(|| {
                    CliError::spec_mismatch(&path, "has no callback to wrap")
                })?,
            };
            let mut pipeline = ShimPipeline::new(terminal);
            for stage in &self.stages {
                pipeline = pipeline.stage_rc(Rc::clone(stage));
            }
            command.callback = Some(pipeline.into_callback());
        }
        Ok(())
    }
}
