//! Bicycle bridge monitor entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bridge_monitor::api::{create_router, AppState};
use bridge_monitor::config::{Config, LedgerBackend};
use bridge_monitor::ledger::{MemoryLedger, MySqlLedger, TrafficLedger};
use bridge_monitor::metrics;
use bridge_monitor::utils::shutdown_signal;
use bridge_monitor::ServiceError;

/// Bicycle bridge occupancy monitor.
#[derive(Parser, Debug)]
#[command(name = "bridge-monitor")]
#[command(about = "HTTP backend reporting bicycle bridge occupancy and congestion")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "LOG_JSON")]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Create the traffic_log table if it does not exist.
    InitSchema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("bridge_monitor=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(args.json_logs.then(|| fmt::layer().json()))
        .with((!args.json_logs).then(|| fmt::layer()))
        .with(filter)
        .init();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::InitSchema) => cmd_init_schema().await,
        Some(Command::Serve { port }) => cmd_serve(port.or(args.port)).await,
        None => cmd_serve(args.port).await,
    }
}

/// Load and validate configuration, logging failures.
fn load_config() -> anyhow::Result<Config> {
    let config = Config::load_validated().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    Ok(config)
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("BRIDGE MONITOR - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    print!("Checking snapshot path... ");
    if config.predictions_file_path.exists() {
        println!("OK");
    } else {
        println!("MISSING");
        println!(
            "  {} does not exist yet; /api/status will return 404 until the pipeline syncs",
            config.predictions_file_path.display()
        );
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Ledger Backend: {}", config.ledger_backend);
    if config.ledger_backend == LedgerBackend::Mysql {
        println!(
            "  MySQL: {}@{}:{}/{}",
            config.mysql_user, config.mysql_host, config.mysql_port, config.mysql_db
        );
        println!("  Max Connections: {}", config.mysql_max_connections);
    }
    println!("  Snapshot: {}", config.predictions_file_path.display());
    println!("  Static Dir: {}", config.static_dir.display());
    println!(
        "  Congestion: low <= {}, medium <= {}, high above",
        config.low_max(),
        config.medium_max()
    );
    println!("  Port: {}", config.port);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Create the MySQL schema.
async fn cmd_init_schema() -> anyhow::Result<()> {
    let config = load_config()?;

    if config.ledger_backend != LedgerBackend::Mysql {
        warn!("LEDGER_BACKEND is {}, nothing to initialize", config.ledger_backend);
        return Ok(());
    }

    info!(
        "Initializing schema on {}:{}/{}",
        config.mysql_host, config.mysql_port, config.mysql_db
    );
    MySqlLedger::from_config(&config)
        .ensure_schema()
        .await
        .map_err(ServiceError::from)?;
    Ok(())
}

/// Run the HTTP server.
async fn cmd_serve(port_override: Option<u16>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = load_config()?;

    // Override with CLI args if provided
    if let Some(port) = port_override {
        config.port = port;
    }

    info!("Configuration loaded successfully");
    info!("Ledger backend: {}", config.ledger_backend);
    info!("Snapshot path: {}", config.predictions_file_path.display());
    info!(
        "Congestion thresholds: low <= {}, medium <= {}",
        config.low_max(),
        config.medium_max()
    );

    let ledger: Arc<dyn TrafficLedger> = match config.ledger_backend {
        LedgerBackend::Mysql => Arc::new(MySqlLedger::from_config(&config)),
        LedgerBackend::Memory => {
            warn!("Using in-memory ledger; observations are lost on restart");
            Arc::new(MemoryLedger::new())
        }
    };

    let mut app_state = AppState::new(&config, ledger);
    match metrics::install_recorder() {
        Ok(handle) => app_state = app_state.with_prometheus(handle),
        Err(e) => warn!("Metrics recorder not installed: {}", e),
    }

    let router = create_router(app_state, &config.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
