//! The root command and its global options.

use clap::{Arg, ArgMatches};

use crate::error::CliError;
use crate::output::OutputKind;

/// Default API gateway, overridable with `--base-url` or `REEFCTL_BASE_URL`.
pub const DEFAULT_BASE_URL: &str = "https://api-gw.reef.local";

/// Connection and rendering options shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    /// API gateway base URL.
    pub base_url: String,
    /// Bearer token, if any.
    pub token: Option<String>,
    /// Output format for results.
    pub format: OutputKind,
}

/// Build the root command. Service trees attach as subcommands.
#[must_use]
pub fn root_command() -> clap::Command {
    clap::Command::new("reefctl")
        .about("Command-line client for the Reef cluster-management platform")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .env("REEFCTL_BASE_URL")
                .default_value(DEFAULT_BASE_URL)
                .help("API gateway base URL"),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .global(true)
                .env("REEFCTL_TOKEN")
                .help("Bearer token for authenticated requests"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .global(true)
                .value_parser(["json", "yaml", "toml"])
                .default_value("json")
                .help("Output format for results"),
        )
}

/// Extract the global options from parsed matches.
pub fn global_args(matches: &ArgMatches) -> Result<GlobalArgs, CliError> {
    let base_url = matches
        .get_one::<String>("base-url")
        .cloned()
        .ok_or_else(|| CliError::invalid_usage("--base-url must be set"))?;
    let token = matches.get_one::<String>("token").cloned();
    let format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("json")
        .parse()?;
    Ok(GlobalArgs {
        base_url,
        token,
        format,
    })
}
