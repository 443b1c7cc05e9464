use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{default_config_path, write_sample_config, Config};
use crate::error::{Error, Result};
use crate::locate::NameMatch;
use crate::pipeline::{Outcome, RunOptions};
use crate::poll::PollPolicy;

mod client;
mod config;
mod error;
mod locate;
mod pipeline;
mod poll;
#[cfg(test)]
mod testing;
mod vra;

const DIAGNOSTIC_TARGET: &str = "diagnostic";

const LONG_ABOUT: &str = "\
Create a snapshot of a virtual machine on a vRealize Automation platform.
Only one snapshot per VM is allowed. The default behaviour is to overwrite the existing snapshot.

After the snapshot request is sent its status is checked every 10 seconds.
The time between request and final status can take half a minute or more.

Required parameters (baseURL, tenant, domain and credentials) are read from a YAML config file,
see the generateConfig subcommand.

Exits with status 0 when the snapshot is created, 1 otherwise.";

const EXAMPLES: &str = "\
Examples:
  With tracing information and a non-default config file:
    makeSnapshot -c config.yaml -m web01 -t

  Without tracing and with the default configuration file:
    makeSnapshot -m web01

  Note: the virtual machine name is case sensitive unless --ignore-case is given.";

#[derive(Debug, Parser)]
#[command(
    name = "makeSnapshot",
    version,
    about = "Create a snapshot of a virtual machine",
    long_about = LONG_ABOUT,
    after_help = EXAMPLES,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file to read (default makeSnapshot.yaml in the working directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Login domain, overrides the domain value in the config file
    #[arg(short, long)]
    domain: Option<String>,

    /// Run authentication and lookups only, without requesting the snapshot
    #[arg(short = 'r', long)]
    dry_run: bool,

    /// Do not overwrite a possible existing snapshot
    #[arg(short, long = "keepExisting", visible_alias = "keep-existing")]
    keep_existing: bool,

    /// Name of the virtual machine to snapshot, without the tenant prefix
    #[arg(
        short,
        long = "machineName",
        visible_alias = "machine-name",
        value_name = "NAME",
        required = true
    )]
    machine_name: Option<String>,

    /// Match the machine name case-insensitively
    #[arg(short, long)]
    ignore_case: bool,

    /// Show tracing information
    #[arg(short, long)]
    trace: bool,

    /// Give up when the snapshot request has not finished after this many seconds
    #[arg(long, value_name = "SECONDS")]
    max_wait: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a sample configuration file
    #[command(name = "generateConfig", visible_alias = "generate-config")]
    GenerateConfig {
        /// Config file to create
        #[arg(short, long = "sampleConfig", default_value_os_t = default_config_path())]
        sample_config: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.trace);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(trace: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), trace))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `RUST_LOG` wins over `--trace`, but never silences the fatal diagnostic.
fn log_filter(rust_log: Option<String>, trace: bool) -> EnvFilter {
    let default_level = if trace { "info" } else { "warn" };
    let always = format!("{}=error", DIAGNOSTIC_TARGET);
    let directives = rust_log.unwrap_or_else(|| default_level.to_string());

    EnvFilter::try_new(format!("{},{}", directives, always))
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{}", default_level, always)))
}

fn report(err: &Error) {
    error!(target: DIAGNOSTIC_TARGET, "Error: {}", err.detailed_message());
}

async fn execute(cli: Cli) -> Result<()> {
    if let Some(Command::GenerateConfig { sample_config }) = cli.command {
        return write_sample_config(&sample_config);
    }

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;
    config.override_domain(cli.domain.clone());
    let credentials = config.into_credentials()?;

    let options = run_options(cli);
    match pipeline::run(&credentials, &options).await? {
        Outcome::Created => info!("Snapshot of {} created", options.machine_name),
        Outcome::DryRun => info!("Dry-run for {} finished", options.machine_name),
    }

    Ok(())
}

fn run_options(cli: Cli) -> RunOptions {
    RunOptions {
        // clap enforces the flag whenever no subcommand is given
        machine_name: cli.machine_name.unwrap_or_default(),
        keep_existing: cli.keep_existing,
        dry_run: cli.dry_run,
        name_match: NameMatch::from_flag(cli.ignore_case),
        poll: PollPolicy {
            max_wait: cli.max_wait.map(Duration::from_secs),
            ..PollPolicy::default()
        },
    }
}
