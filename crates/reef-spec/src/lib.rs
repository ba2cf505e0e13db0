//! # reef-spec
//!
//! Typed model of a Reef service descriptor: the declarative description of
//! a versioned REST service from which a CLI command tree is derived.
//!
//! A descriptor names the service, its API versions, the resources each
//! version exposes, and the operations (method, path, parameters) on each
//! resource. `reefctl` consumes a validated [`ServiceSpec`] and mechanically
//! turns every operation into a command. This crate owns only the model and
//! its structural validation; it performs no I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod descriptor;
pub mod error;

pub use descriptor::{
    HttpMethod, OperationSpec, ParamKind, ParamLocation, ParamSpec, ResourceSpec, ServiceSpec,
    VersionSpec,
};
pub use error::SpecError;
