//! Bundled service modules.
//!
//! Each module owns one service: a descriptor document compiled into the
//! binary, plus the overrides that rewrite its generated command tree.

pub mod cfg;

use std::rc::Rc;

use crate::command::CommandTree;
use crate::error::CliError;
use crate::transport::Transport;

/// Build the command trees for every bundled service.
pub fn build_all(transport: Rc<dyn Transport>) -> Result<Vec<CommandTree>, CliError> {
    Ok(vec![cfg::build(transport)?])
}
