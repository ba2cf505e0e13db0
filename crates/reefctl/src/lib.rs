//! # reefctl
//!
//! Command-line client for the Reef cluster-management platform.
//!
//! Each Reef service publishes a versioned REST API described by a service
//! descriptor ([`reef_spec::ServiceSpec`]). The [`generator`] derives a
//! [`command::CommandTree`] from the descriptor, one command per operation,
//! one `--flag` per declared field. The interesting part of this crate is
//! the customization layer that rewrites that generic tree:
//!
//! - [`overrides`] — per-command rewrite rules (remove/add parameters,
//!   wrap callbacks), applied sequentially at startup;
//! - [`shim`] — the payload composition pipeline that turns flat option
//!   values into the structured request body a service expects;
//! - [`coerce`] — reusable coercers for multi-value options;
//! - [`command::CommandTree::merge_current`] — version coexistence, so
//!   `cfg components update` and `cfg v2 components update` resolve to the
//!   same command object.
//!
//! ```text
//! descriptor ──generate──► command tree ──overrides──► rewritten tree
//!                                                          │ invoke
//!                                                          ▼
//!                         transport ◄──shim pipeline── parameter values
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod coerce;
pub mod command;
pub mod error;
pub mod generator;
pub mod invoke;
pub mod output;
pub mod overrides;
pub mod param;
pub mod services;
pub mod shim;
pub mod transport;

pub use command::{Command, CommandNode, CommandTree, MergePolicy};
pub use error::CliError;
pub use param::{Destination, ParamKind, ParamValues, Parameter};
pub use shim::{Invocation, PayloadStage, ShimPipeline};
pub use transport::{ApiRequest, ApiResponse, Transport};
