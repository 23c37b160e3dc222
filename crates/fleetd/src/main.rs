//! fleetd — the storage fleet daemon.
//!
//! Single binary that assembles the fleet controller:
//! - Node registry seeded from `fleet.toml`
//! - Docker runtime client
//! - Health monitor (background polling)
//! - Load balancer, lifecycle controller, storage gateway
//! - REST API
//!
//! # Usage
//!
//! ```text
//! fleetd init --nodes file-server-1,file-server-2
//! fleetd run --config fleet.toml --port 8443
//! fleetd status --config fleet.toml
//! ```

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fleet_api::{FleetController, build_router};
use fleet_core::{FleetConfig, TracingAudit};
use fleet_runtime::DockerRuntime;
use fleet_state::Node;

const DEFAULT_FILTER: &str =
    "info,fleetd=debug,fleet_api=debug,fleet_health=debug,fleet_scheduler=debug,fleet_storage=debug";

#[derive(Parser)]
#[command(name = "fleetd", about = "Storage fleet controller daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the controller and serve the REST API until Ctrl-C.
    Run {
        /// Fleet configuration file.
        #[arg(long, default_value = "fleet.toml")]
        config: PathBuf,

        /// Port to listen on (overrides `[api].port`).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Probe every node once and print the fleet table.
    Status {
        /// Fleet configuration file.
        #[arg(long, default_value = "fleet.toml")]
        config: PathBuf,
    },
    /// Write a scaffold configuration file.
    Init {
        /// Where to write the configuration.
        #[arg(long, default_value = "fleet.toml")]
        path: PathBuf,

        /// Node (container) names, comma separated.
        #[arg(long, value_delimiter = ',', default_value = "file-server")]
        nodes: Vec<String>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run { config, port } => run(&config, port).await,
        Command::Status { config } => status(&config).await,
        Command::Init { path, nodes, force } => {
            let nodes: Vec<&str> = nodes.iter().map(String::as_str).collect();
            write_scaffold(&path, &nodes, force)?;
            println!("wrote {}", path.display());
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn controller(config: &FleetConfig) -> FleetController {
    let client = Arc::new(DockerRuntime::new(config.runtime.binary.clone()));
    FleetController::new(config, client, Arc::new(TracingAudit))
}

async fn run(config_path: &Path, port: Option<u16>) -> anyhow::Result<()> {
    info!("fleetd starting");

    let config = FleetConfig::from_file(config_path)?;
    info!(path = %config_path.display(), nodes = config.fleet.nodes.len(), "configuration loaded");

    // ── Initialize subsystems ──────────────────────────────────

    let controller = controller(&config);

    // Discover the fleet before accepting traffic.
    controller.refresh().await;
    let stats = controller.stats();
    info!(total = stats.total, running = stats.running, "initial probe sweep complete");

    controller.monitor().start().await;

    // ── Start API server ───────────────────────────────────────

    let router = build_router(controller.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(config.api.port)));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(%addr, "API server listening");

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
            }
            info!("shutdown signal received");
        })
        .await?;

    controller.monitor().stop().await;

    info!("fleetd stopped");
    Ok(())
}

async fn status(config_path: &Path) -> anyhow::Result<()> {
    let config = FleetConfig::from_file(config_path)?;
    let controller = controller(&config);
    controller.refresh().await;
    print!("{}", render_status(&controller.get_fleet_status()));
    Ok(())
}

fn write_scaffold(path: &Path, nodes: &[&str], force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let config = FleetConfig::scaffold(nodes);
    config.validate()?;
    std::fs::write(path, config.to_toml_string()?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn render_status(nodes: &[Node]) -> String {
    let width = nodes
        .iter()
        .map(|n| n.id.len())
        .max()
        .unwrap_or(0)
        .max("NODE".len());

    let mut out = format!("{:<width$}  {:<12}  {}\n", "NODE", "STATUS", "LAST CHECKED (ms)");
    for node in nodes {
        let checked = node
            .last_checked
            .map_or_else(|| "-".to_string(), |t| t.to_string());
        let _ = writeln!(out, "{:<width$}  {:<12}  {}", node.id, node.status.label(), checked);
    }
    out
}
