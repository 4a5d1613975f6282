pub mod acquisition;
pub mod cli;
pub mod output;

use crate::cli::Cli;
use crate::output::SampleWriter;
use clap::Parser;
use goio_device::GoIoLibrary;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_log_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Diagnostics go to stderr so they never mix with the samples on stdout
fn init_logging(verbosity: u8) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(verbosity).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());
    run_with(&cli)
}

pub fn run_with(cli: &Cli) -> anyhow::Result<()> {
    // a bad output path should fail before the SDK is even loaded
    let mut out = SampleWriter::new(output::open(cli.output.as_deref())?);

    let sdk_path = cli
        .sdk_library
        .clone()
        .unwrap_or_else(GoIoLibrary::default_path);
    let sdk = GoIoLibrary::load(&sdk_path)?;

    acquisition::run(&sdk, &cli.plan(), &mut out)
}
