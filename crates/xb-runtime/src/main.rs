//! # xbridge
//!
//! Command-line entry point.
//!
//! ```text
//! xbridge --config deployment.toml wire
//! xbridge --config deployment.toml audit --wire-first
//! xbridge --config deployment.toml send --from sepolia --to arbitrum-sepolia --amount 1.5
//! ```
//!
//! Exits non-zero when a command fails. A transfer that was submitted but not
//! yet confirmed is not a failure.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use xb_runtime::{commands, Deployment, SendArgs, SimnetRuntime};
use xb_telemetry::{gather, init_telemetry, TelemetryConfig};
use xb_transfer::{cancel_pair, OrchestratorConfig};

#[derive(Parser, Debug)]
#[command(name = "xbridge", author, version, about, long_about = None)]
struct Cli {
    /// Deployment file
    #[arg(short, long, env = "XB_DEPLOYMENT", default_value = "deployment.toml")]
    config: PathBuf,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Print Prometheus metrics after the command
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set peer bindings for every configured connection
    Wire,
    /// Report peer bindings without changing them
    Audit {
        /// Wire the mesh before auditing
        #[arg(long)]
        wire_first: bool,
    },
    /// Transfer tokens between two endpoints
    Send {
        #[command(flatten)]
        args: SendArgs,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if cli.verbose {
        telemetry = telemetry.with_log_level("debug");
    }
    let _guard = init_telemetry(telemetry).context("failed to initialize telemetry")?;

    let deployment = Deployment::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    let base = OrchestratorConfig::from_env().context("invalid XB_* environment")?;
    let config = deployment
        .orchestrator_config(base)
        .context("invalid [orchestrator] section")?;
    let config = match &cli.command {
        Command::Send { args, .. } if args.dry_run => config.with_dry_run(true),
        _ => config,
    };

    let mut runtime =
        SimnetRuntime::build(deployment, config).context("failed to build simnet")?;

    let code = match cli.command {
        Command::Wire => {
            let (lines, failures) = commands::wire(&runtime).await;
            print_lines(&lines);
            exit_code(failures == 0)
        }
        Command::Audit { wire_first } => {
            if wire_first {
                let (_, failures) = commands::wire(&runtime).await;
                if failures > 0 {
                    warn!("[xb-runtime] {} connection(s) failed to wire", failures);
                }
            }
            let (lines, unwired) = commands::audit(&runtime).await;
            print_lines(&lines);
            exit_code(unwired == 0)
        }
        Command::Send { args, json } => {
            let request = commands::build_request(&runtime, &args)
                .context("invalid transfer request")?;
            let refund = args.refund.unwrap_or_else(|| runtime.owner());

            runtime.start_relayer();
            let (handle, cancel) = cancel_pair();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("[xb-runtime] Interrupt received, stopping delivery watch");
                    handle.cancel();
                }
            });

            let outcome = commands::send(&runtime, &request, refund, &cancel).await;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome).context("failed to encode outcome")?
                );
            } else {
                print_lines(&commands::describe_outcome(&outcome));
                println!(
                    "{}",
                    commands::balance_line(&runtime, request.destination, request.recipient)
                );
            }
            exit_code(!outcome.is_failure())
        }
    };

    if cli.metrics {
        print!("{}", gather().context("failed to encode metrics")?);
    }
    Ok(code)
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
