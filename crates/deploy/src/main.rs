//! Binary entry point for vmdeploy

use clap::Parser;

use vmdeploy::cli::Cli;
use vmdeploy::config::DeployConfig;
use vmdeploy::deploy;
use vmdeploy::error::DeployError;

/// Install and configure the tracing/logging system.
///
/// Structured logging goes to stderr, filtered by RUST_LOG and defaulting
/// to 'info'; operator-facing progress stays on stdout.
fn install_tracing() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();
}

fn real_main(cli: &Cli) -> Result<(), DeployError> {
    let config = DeployConfig::load()?;
    if cli.list_requested() {
        return deploy::list_base_images(&config);
    }
    deploy::run(cli, &config)
}

fn run() -> i32 {
    install_tracing();
    if let Err(err) = color_eyre::install() {
        eprintln!("{err:#}");
        return 1;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // clap renders its own usage/help text; --help and --version
            // land here too and exit cleanly.
            let _ = err.print();
            return if err.use_stderr() { 1 } else { 0 };
        }
    };

    match real_main(&cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            err.exit_code()
        }
    }
}

fn main() {
    std::process::exit(run())
}
