//! wpsync: clean-mirror deployment for WordPress plugins, themes and sites.
//!
//! # Usage
//!
//! ```text
//! wpsync [--dry-run] [--no-backup] [--config <FILE>]
//! ```
//!
//! Exit codes: 0 success, 1 runtime failure, 2 configuration error,
//! 130 cancelled.

mod args;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use wpsync_backup::TarGzWriter;
use wpsync_core::config::discover;
use wpsync_core::{CancelFlag, ConfigError, RunOptions, TransportKind};
use wpsync_remote::{LocalTransport, SshTransport, Transport};
use wpsync_sync::Pipeline;

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "wpsync",
    version,
    about = "Mirror a WordPress plugin, theme or site onto its server",
    long_about = None,
)]
struct Cli {
    /// Show what would change without backing up, erasing or transferring.
    #[arg(long)]
    dry_run: bool,

    /// Skip the pre-deployment backup for this run.
    #[arg(long)]
    no_backup: bool,

    /// Configuration file to use instead of the discovered one.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    init_tracing();

    let (argv, dropped) = args::retain_known(std::env::args());
    for arg in &dropped {
        tracing::debug!(arg = %arg, "ignoring unrecognised argument");
    }
    let cli = Cli::parse_from(argv);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("could not determine working directory")?;

    let config = match discover(&cwd, cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return Ok(config_failure(&err)),
    };
    let target = match config.target() {
        Ok(target) => target,
        Err(err) => return Ok(config_failure(&err)),
    };
    let transport_kind = match config.transport_kind() {
        Ok(kind) => kind,
        Err(err) => return Ok(config_failure(&err)),
    };

    let mut transport: Box<dyn Transport> = match transport_kind {
        TransportKind::Ssh => Box::new(
            SshTransport::for_target(&target, config.remote_port)
                .with_password(config.password())
                .with_connect_timeout(Duration::from_secs(config.connect_timeout_secs)),
        ),
        TransportKind::Local => Box::new(LocalTransport::new()),
    };

    let options = RunOptions {
        dry_run: cli.dry_run,
        create_backup: config.create_backup && !cli.no_backup,
    };

    let cancel = CancelFlag::new();
    install_interrupt_handler(&cancel);

    output::print_header(&target, options);
    let writer = TarGzWriter::new();
    match Pipeline::new(&config, options, transport.as_mut(), &writer, cancel).run() {
        Ok(outcome) => {
            output::print_outcome(&outcome);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            output::print_failure(&err);
            let code = if err.is_cancelled() {
                EXIT_CANCELLED
            } else if err.is_config_error() {
                EXIT_CONFIG
            } else {
                EXIT_FAILURE
            };
            Ok(ExitCode::from(code))
        }
    }
}

fn config_failure(err: &ConfigError) -> ExitCode {
    eprintln!("{} configuration: {err}", "error:".red().bold());
    ExitCode::from(EXIT_CONFIG)
}

fn install_interrupt_handler(cancel: &CancelFlag) {
    let flag = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        eprintln!("interrupt received; stopping after the current operation");
        flag.cancel();
    });
    if let Err(err) = installed {
        tracing::warn!(error = %err, "could not install interrupt handler");
    }
}

/// Log to stderr so stdout carries only the report. `WPSYNC_LOG` takes
/// precedence over `RUST_LOG`; the default level is `warn`.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("WPSYNC_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
