//! Bridging the command tree onto `clap` and dispatching invocations.
//!
//! The tree is the source of truth; `clap` is derived from it at startup
//! and only handles tokenizing, type parsing, and help rendering. Binding
//! distinguishes "the user supplied this value" from a parser default by
//! checking the value source, so an explicit `--enabled false` is visible
//! to shims while an untouched option stays unset.

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};
use serde_json::Value;

use crate::coerce::RawValue;
use crate::command::{Command, CommandNode, CommandTree};
use crate::error::CliError;
use crate::param::{Destination, ParamKind, ParamValues, Parameter};
use crate::shim::Invocation;

/// Derive a `clap` command from a tree node, recursively.
#[must_use]
pub fn to_clap(node: &CommandNode) -> clap::Command {
    let node = node.borrow();
    let mut command = clap::Command::new(node.name.clone()).about(node.help.clone());
    for parameter in &node.parameters {
        command = command.arg(to_arg(parameter));
    }
    for child in node.children.values() {
        command = command.subcommand(to_clap(child));
    }
    if node.callback.is_none() && !node.children.is_empty() {
        command = command.subcommand_required(true).arg_required_else_help(true);
    }
    command
}

fn to_arg(parameter: &Parameter) -> Arg {
    let mut arg = Arg::new(parameter.name.clone())
        .help(parameter.help.clone())
        .required(parameter.required);
    if parameter.destination == Destination::PathSegment {
        // Positional argument named after the path segment it fills.
        return arg.value_name(parameter.name.to_uppercase());
    }
    arg = arg.long(parameter.name.clone());
    match parameter.kind {
        ParamKind::Text => arg,
        ParamKind::Integer => arg.value_parser(clap::value_parser!(i64)),
        ParamKind::Boolean => arg.value_parser(clap::value_parser!(bool)),
        ParamKind::Flag => arg.action(ArgAction::SetTrue),
        ParamKind::PairList => {
            let mut arg = arg.num_args(2).action(ArgAction::Append);
            if !parameter.value_names.is_empty() {
                arg = arg.value_names(parameter.value_names.clone());
            }
            arg
        }
    }
}

/// Extract the supplied values for one command from its matches.
///
/// Only values the user actually typed are bound; parser defaults (the
/// `false` a `SetTrue` flag reports when absent) are left unset.
pub fn bind(command: &Command, matches: &ArgMatches) -> Result<ParamValues, CliError> {
    let mut values = ParamValues::default();
    for parameter in &command.parameters {
        if matches.value_source(&parameter.name) != Some(ValueSource::CommandLine) {
            continue;
        }
        let raw = raw_value(parameter, matches)?;
        let value = match &parameter.coercer {
            Some(coercer) => coercer.apply(&raw)?,
            None => raw.into_value(),
        };
        values.set(&parameter.name, parameter.destination.clone(), value);
    }
    Ok(values)
}

fn raw_value(parameter: &Parameter, matches: &ArgMatches) -> Result<RawValue, CliError> {
    let missing =
        || CliError::invalid_usage(format!("option '{}' has no value", parameter.name));
    match parameter.kind {
        ParamKind::Text => matches
            .get_one::<String>(&parameter.name)
            .cloned()
            .map(RawValue::Text)
            .ok_or_else(missing),
        ParamKind::Integer => matches
            .get_one::<i64>(&parameter.name)
            .copied()
            .map(RawValue::Integer)
            .ok_or_else(missing),
        ParamKind::Boolean => matches
            .get_one::<bool>(&parameter.name)
            .copied()
            .map(RawValue::Boolean)
            .ok_or_else(missing),
        ParamKind::Flag => Ok(RawValue::Flag(matches.get_flag(&parameter.name))),
        ParamKind::PairList => {
            let mut pairs = Vec::new();
            if let Some(occurrences) = matches.get_occurrences::<String>(&parameter.name) {
                for occurrence in occurrences {
                    let tokens: Vec<&String> = occurrence.collect();
                    match tokens.as_slice() {
                        [first, second] => pairs.push(((*first).clone(), (*second).clone())),
                        _ => {
                            return Err(CliError::invalid_usage(format!(
                                "option '{}' takes exactly two values per occurrence",
                                parameter.name
                            )));
                        }
                    }
                }
            }
            Ok(RawValue::Pairs(pairs))
        }
    }
}

/// Dispatch parsed matches against the tree: walk the subcommand chain,
/// bind values at the leaf, and run its callback.
pub fn run(tree: &CommandTree, matches: &ArgMatches) -> Result<Value, CliError> {
    run_node(&tree.root(), matches)
}

fn run_node(node: &CommandNode, matches: &ArgMatches) -> Result<Value, CliError> {
    if let Some((name, sub_matches)) = matches.subcommand() {
        let child = node.borrow().children.get(name).cloned();
        if let Some(child) = child {
            return run_node(&child, sub_matches);
        }
    }
    let command = node.borrow();
    let callback = command
        .callback
        .clone()
        .ok_or_else(|| CliError::invalid_usage(format!("'{}' requires a subcommand", command.name)))?;
    let values = bind(&command, matches)?;
    drop(command);
    let mut invocation = Invocation::new(values);
    callback(&mut invocation)
}

/// Parse an argument vector (including the program name) against the tree
/// and dispatch it. Parse failures surface as usage errors.
pub fn run_line(tree: &CommandTree, args: &[&str]) -> Result<Value, CliError> {
    let matches = to_clap(&tree.root())
        .try_get_matches_from(args)
        .map_err(|e| CliError::invalid_usage(e.to_string()))?;
    run(tree, &matches)
}
