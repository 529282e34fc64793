//! cad-bridge-mcp: HTTP command bridge and MCP tool gateway for CAD automation.
//!
//! `receiver` runs the command receiver and host-thread pump against the
//! bundled simulated host. `gateway` runs the MCP server over stdio and
//! forwards every tool call to a receiver.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use cad_bridge_mcp::bridge::{Bridge, BridgeOptions};
use cad_bridge_mcp::config::{self, Config};
use cad_bridge_mcp::gateway::BridgeClient;
use cad_bridge_mcp::host::SimulatedHost;
use cad_bridge_mcp::mcp::McpServer;

/// HTTP command bridge and MCP tool gateway for CAD automation.
#[derive(Parser, Debug)]
#[command(name = "cad-bridge-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run the command receiver and host-thread pump
    Receiver {
        /// Path to configuration file
        #[arg(value_name = "CONFIG_FILE")]
        config: Option<PathBuf>,
    },
    /// Run the MCP tool gateway over stdio
    Gateway {
        /// Path to configuration file
        #[arg(value_name = "CONFIG_FILE")]
        config: Option<PathBuf>,
    },
}

impl Mode {
    fn config_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Receiver { config } | Self::Gateway { config } => config.as_deref(),
        }
    }
}

#[allow(clippy::match_same_arms)] // explicit "warn" arm
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Logs go to stderr; stdout belongs to the MCP transport.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.mode.config_path();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nExpected config at: {}", default_path.display());
                    eprintln!("Create one based on config/example-config.json");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    init_tracing(get_log_level(args.verbose, args.quiet, &cfg.logging.level));

    eprintln!(
        "cad-bridge-mcp {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!();

    match args.mode {
        Mode::Receiver { .. } => run_receiver(&cfg),
        Mode::Gateway { .. } => run_gateway(&cfg),
    }
}

fn run_receiver(cfg: &Config) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async {
        let host = SimulatedHost::from_config(&cfg.simulation);
        let mut bridge = Bridge::new(Box::new(host), BridgeOptions::from_config(cfg));

        let addr = match bridge.start().await {
            Ok(addr) => addr,
            Err(e) => {
                error!(error = %e, "failed to start command receiver");
                eprintln!("Failed to start: {e}");
                return ExitCode::FAILURE;
            }
        };
        info!(%addr, version = env!("CARGO_PKG_VERSION"), "command receiver ready");
        eprintln!("Command receiver listening on http://{addr}");

        shutdown_signal().await;

        match bridge.stop().await {
            Ok(report) => {
                info!(
                    discarded = report.discarded,
                    cancelled = report.cancelled,
                    "shut down gracefully"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "shutdown failed");
                ExitCode::FAILURE
            }
        }
    })
}

fn run_gateway(cfg: &Config) -> ExitCode {
    let client = match BridgeClient::new(&cfg.gateway) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to create receiver client");
            return ExitCode::FAILURE;
        }
    };
    info!(
        receiver = client.base_url(),
        version = env!("CARGO_PKG_VERSION"),
        "starting MCP gateway"
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let mut server = McpServer::stdio(client);
    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("gateway shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "gateway error");
            ExitCode::FAILURE
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, stopping"),
        () = terminate => info!("received SIGTERM, stopping"),
    }
}
