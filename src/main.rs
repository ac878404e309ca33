use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::EnvFilter;

use deanery_gateway::config::AppConfig;
use deanery_gateway::{router, AppState};

#[derive(Parser)]
#[command(name = "deanery-gateway")]
#[command(about = "Browser-facing gateway for the deanery backend API")]
#[command(version)]
struct Cli {
    #[arg(long, env = "GATEWAY_CONFIG", help = "YAML configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Override server.bind_addr")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so JWT_SECRET, SESSION_KEY etc. are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("deanery_gateway=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    tracing::info!("Starting deanery gateway in {:?} mode", config.environment);

    let state = AppState::from_config(&config).context("failed to build backend client")?;
    let app = router(state).layer(TimeoutLayer::new(config.request_timeout()));

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;

    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server gracefully shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler, keep serving until the process is killed
        std::future::pending::<()>().await;
    }
}
