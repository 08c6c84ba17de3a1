use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use devconnect_api::config;
use devconnect_api::database::{DocumentStore, MemoryStore, PgDocumentStore, UNIQUE_FIELDS};
use devconnect_api::{app, AppState};

#[derive(Parser, Debug)]
#[command(name = "devconnect-api", version, about = "Developer social network API server")]
struct Args {
    /// Port to listen on (overrides PORT / API_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides API_BIND)
    #[arg(long)]
    bind: Option<String>,

    /// Keep all data in memory instead of Postgres
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting DevConnect API in {:?} mode", config.environment);

    let store: Arc<dyn DocumentStore> = if args.memory {
        tracing::warn!("Using in-memory store; data is lost on exit");
        Arc::new(MemoryStore::with_constraints(UNIQUE_FIELDS))
    } else {
        let store = PgDocumentStore::connect(&config.database)
            .await
            .context("failed to connect to the database")?;
        store
            .bootstrap(UNIQUE_FIELDS)
            .await
            .context("failed to prepare the database schema")?;
        Arc::new(store)
    };

    let state = AppState::new(store, config)?;
    let router = app(state, &config.security);

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("DevConnect API listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // Keep serving; without a signal handler only a kill stops the process
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
