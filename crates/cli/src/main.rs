//! fanout CLI - run one operation against many hosts with bounded concurrency

mod output;
mod progress;
mod settings;
mod targets;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use fanout_core::port::{HostNetwork, ProgressObserver};
use fanout_core::{
    BatchReport, Credential, Engine, EngineConfig, LocalHostResolver, SharedContext,
    TargetOperation,
};
use fanout_infra_system::{CommandOperation, SystemHostNetwork, TcpProbeOperation};
use secrecy::SecretString;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::progress::BarProgress;
use crate::settings::Overrides;
use crate::targets::TargetArgs;

const DEFAULT_PROBE_PORT: u16 = 22;

#[derive(Parser)]
#[command(name = "fanout")]
#[command(about = "Run a task against many hosts with bounded concurrency", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (TOML); defaults to ~/.fanout/config.toml when present
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Maximum operations running at once
    #[arg(short = 'c', long, global = true)]
    capacity: Option<usize>,

    /// Per-target timeout in seconds, counted from submission
    #[arg(long = "timeout", global = true, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Show a progress bar while the batch runs
    #[arg(long, global = true)]
    progress: bool,

    /// Pass verbose mode to operations
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a local program once per target ({target}, {port}, {session} are substituted)
    Run {
        #[command(flatten)]
        targets: TargetArgs,

        /// Alternate user handed to the program for non-local targets
        #[arg(short, long, env = "FANOUT_USER")]
        user: Option<String>,

        /// Password for --user
        #[arg(long, env = "FANOUT_PASSWORD", hide_env_values = true, hide = true)]
        password: Option<String>,

        /// Program and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Check TCP reachability of every target
    Probe {
        #[command(flatten)]
        targets: TargetArgs,

        /// Port for targets that do not carry one
        #[arg(short, long, default_value_t = DEFAULT_PROBE_PORT)]
        port: u16,
    },

    /// Print the names and addresses treated as this machine
    LocalHosts,
}

fn init_logging() -> Result<()> {
    let log_format = std::env::var("FANOUT_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("fanout=info"))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

fn credential(user: Option<String>, password: Option<String>) -> Result<Option<Credential>> {
    match (user, password) {
        (Some(user), Some(password)) => Ok(Some(Credential::new(user, SecretString::from(password)))),
        (Some(_), None) => anyhow::bail!("--user requires FANOUT_PASSWORD to be set"),
        (None, Some(_)) => {
            warn!("FANOUT_PASSWORD is set without --user; ignoring it");
            Ok(None)
        }
        (None, None) => Ok(None),
    }
}

/// Resolve local hosts, run the batch and return the report
async fn run_batch<O>(
    config: EngineConfig,
    operation: O,
    targets: &TargetArgs,
    credential: Option<Credential>,
) -> Result<BatchReport<O::Output>>
where
    O: TargetOperation,
{
    let targets = targets.collect()?;
    let local_hosts = LocalHostResolver::new(Arc::new(SystemHostNetwork::new()))
        .resolve()
        .await;

    let mut engine = Engine::new(config, Arc::new(operation));
    if engine.config().show_progress {
        let observer: Arc<dyn ProgressObserver> = Arc::new(BarProgress::new());
        engine = engine.with_progress_observer(observer);
    }

    let mut context: SharedContext = engine.base_context().with_local_hosts(local_hosts);
    if let Some(credential) = credential {
        context = context.with_credential(credential);
    }

    engine
        .run(targets, context)
        .await
        .context("Batch could not be started")
}

fn exit_code<T>(report: &BatchReport<T>) -> ExitCode {
    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn finish<T: Serialize>(
    report: &BatchReport<T>,
    json: bool,
    detail: impl Fn(&T) -> String,
) -> Result<ExitCode> {
    output::print_report(report, json, detail)?;
    Ok(exit_code(report))
}

async fn print_local_hosts(json: bool) -> Result<ExitCode> {
    let network = SystemHostNetwork::new();
    let name = network.computer_name();
    let set = LocalHostResolver::new(Arc::new(network)).resolve().await;

    if json {
        let entries: Vec<&str> = set.iter().collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "computer_name": name,
                "entries": entries,
            }))?
        );
    } else {
        println!(
            "{} {}",
            "Computer name:".bold(),
            name.as_deref().unwrap_or("(unknown)")
        );
        for entry in set.iter() {
            let shown = if entry.is_empty() { "(empty)" } else { entry };
            println!("  {}", shown);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging()?;

    let overrides = Overrides {
        capacity: cli.capacity,
        timeout_secs: cli.timeout_secs,
        show_progress: cli.progress,
        verbose: cli.verbose,
    };
    let config = settings::resolve(settings::load(cli.config.as_deref())?, &overrides)?;

    info!(
        version = fanout_core::VERSION,
        capacity = config.capacity,
        timeout_secs = config.timeout_secs,
        "fanout starting"
    );

    match cli.command {
        Commands::Run {
            targets,
            user,
            password,
            command,
        } => {
            let mut parts = command.into_iter();
            let program = parts.next().context("No program given")?;
            let operation = CommandOperation::new(program, parts.collect());
            let credential = credential(user, password)?;

            let report = run_batch(config, operation, &targets, credential).await?;
            finish(&report, cli.json, |output| output.stdout.trim().to_string())
        }

        Commands::Probe { targets, port } => {
            let operation = TcpProbeOperation::new(port);

            let report = run_batch(config, operation, &targets, None).await?;
            finish(&report, cli.json, |probe| {
                format!("{} in {} ms", probe.peer, probe.connect_ms)
            })
        }

        Commands::LocalHosts => print_local_hosts(cli.json).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_collects_trailing_command() {
        let cli = Cli::try_parse_from([
            "fanout", "run", "-t", "web01", "--", "ssh", "{target}", "uptime", "-p",
        ])
        .unwrap();

        match cli.command {
            Commands::Run { command, targets, .. } => {
                assert_eq!(command, vec!["ssh", "{target}", "uptime", "-p"]);
                assert_eq!(targets.targets, vec!["web01"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["fanout", "probe", "-t", "db01", "--capacity", "4", "--json"])
            .unwrap();

        assert_eq!(cli.capacity, Some(4));
        assert!(cli.json);
    }

    #[test]
    fn test_user_without_password_is_rejected() {
        assert!(credential(Some("svc".into()), None).is_err());
        assert!(credential(None, None).unwrap().is_none());
        let cred = credential(Some("svc".into()), Some("pw".into())).unwrap().unwrap();
        assert_eq!(cred.username(), "svc");
    }
}
