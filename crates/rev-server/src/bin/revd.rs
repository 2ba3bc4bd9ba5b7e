//! RevDB server daemon.
//!
//! The `revd` binary starts the database engine, the background session
//! sweeper, and the HTTP endpoint, and shuts down cleanly on
//! SIGTERM/SIGINT.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (root .gitdb, port 8080)
//! revd
//!
//! # Custom root and port
//! revd --root /var/lib/revdb --port 9090
//!
//! # Use a configuration file
//! revd --config /etc/revdb/revd.toml
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rev_server::database::Engine;
use rev_server::http;
use rev_server::ServerConfig;
use rev_sql::storage::GitHistory;

/// RevDB server daemon.
#[derive(Parser, Debug)]
#[command(
    name = "revd",
    version,
    about = "RevDB database server",
    long_about = "RevDB is an experimental SQL database whose state is a tree of \
                  JSON rows under version control.\n\n\
                  This daemon serves the HTTP endpoint and records every mutation \
                  as a revision in the database's history repository."
)]
struct Args {
    /// Host address to bind to
    #[arg(short = 'H', long, env = "REVD_HOST")]
    host: Option<String>,

    /// TCP port for the HTTP endpoint [default: 8080]
    #[arg(short = 'p', long, env = "REVD_PORT")]
    port: Option<u16>,

    /// Global root directory for databases [default: .gitdb]
    #[arg(long, value_name = "PATH", env = "REVD_ROOT")]
    root: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "REVD_LOG_LEVEL")]
    log_level: String,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = load_config(&args)?;
    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    run_server(config).await
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let filter = EnvFilter::try_new(format!("rev_server={level},rev_sql={level}"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut config = if let Some(path) = &args.config {
        ServerConfig::from_file(path).context("Failed to load config file")?
    } else {
        ServerConfig::default()
    };

    // Command-line arguments override the file.
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(root) = &args.root {
        config.root = root.clone();
    }

    Ok(config)
}

async fn run_server(config: ServerConfig) -> Result<()> {
    let engine = Engine::open(config.engine_config(), Arc::new(GitHistory::new()))
        .context("Failed to open engine")?;
    let engine = Arc::new(engine);

    let sweeper = engine.spawn_sweeper();

    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "RevDB listening on {} (root: {})",
        addr,
        config.root.display()
    );
    info!("Press Ctrl+C to shutdown");

    let app = http::router(engine.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown signal received");
    sweeper.abort();

    let stats = engine.stats();
    info!(
        "Server stopped after {:?} ({} sessions, {} tables)",
        stats.uptime, stats.active_sessions, stats.tables
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
