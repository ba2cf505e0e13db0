//! `reefctl` entry point.

use std::process::ExitCode;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;

use reefctl::cli;
use reefctl::error::CliError;
use reefctl::invoke;
use reefctl::output;
use reefctl::services;
use reefctl::transport::{DeferredTransport, HttpTransport, Transport};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), CliError> {
    // Service trees capture their transport before the command line is
    // parsed; the deferred wrapper is pointed at the real gateway once the
    // global options are known.
    let transport = Rc::new(DeferredTransport::new());
    let trees = services::build_all(Rc::clone(&transport) as Rc<dyn Transport>)?;

    let mut root = cli::root_command();
    for tree in &trees {
        root = root.subcommand(invoke::to_clap(&tree.root()));
    }
    let matches = root.get_matches();
    let globals = cli::global_args(&matches)?;
    transport.configure(HttpTransport::new(&globals.base_url, globals.token.clone())?);

    let (name, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| CliError::invalid_usage("a service subcommand is required"))?;
    let tree = trees
        .iter()
        .find(|tree| tree.name() == name)
        .ok_or_else(|| CliError::invalid_usage(format!("unknown service '{name}'")))?;

    let result = invoke::run(tree, sub_matches)?;
    println!("{}", output::format_result(&result, globals.format)?);
    Ok(())
}
