use anyhow::Context;
use clap::Parser;
use query_gate::config::{ServerArgs, DEFAULT_LOG_FILTER};
use query_gate::infrastructure::database::PgRowSource;
use query_gate::infrastructure::http::{create_router, AppState, RouteLimiters};
use query_gate::IdleSweeper;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Values from .env never override variables already set
    let env_file = dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    if let Some(path) = env_file {
        tracing::info!(path = %path.display(), "loaded environment file");
    }

    let args = ServerArgs::parse();
    args.validate()?;

    let rows = PgRowSource::from_env(args.database_url.as_deref(), args.db_max_connections)
        .context("invalid database URL")?;

    let limiters = RouteLimiters::build(&args.limiter_settings()?)?;

    let sweeper = match args.sweeper_config() {
        Some(config) => {
            tracing::info!(interval_secs = config.interval.as_secs(), "idle sweep enabled");
            Some(IdleSweeper::new(limiters.limiters(), config).start())
        }
        None => {
            tracing::info!("idle sweep disabled");
            None
        }
    };

    let app = create_router(AppState::new(Arc::new(rows.clone())), &limiters);

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        burst = args.burst,
        per_second = args.per_second,
        max_clients = args.max_clients,
        "listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_signal())
    .await?;

    if let Some(handle) = sweeper {
        handle.shutdown().await?;
    }
    rows.close().await;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
