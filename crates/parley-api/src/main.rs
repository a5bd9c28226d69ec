//! Parley service entry point.
//!
//! Binary name: `parleyd`
//!
//! Resolves configuration, sets up tracing, connects the configured stores,
//! then dispatches to a one-shot command or starts the HTTP server.

mod cli;
mod http;
mod state;

use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use parley_core::chat::scheduler::SyncScheduler;
use parley_infra::config::{load_config, resolve_config_path, resolve_data_dir};
use parley_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_directives};
use parley_types::config::LogFormat;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = resolve_data_dir();
    let config_path = resolve_config_path(cli.config.as_deref(), &data_dir);
    let (mut config, config_problems) = load_config(&config_path).await;

    if let Commands::Serve {
        host,
        port,
        backend,
    } = &cli.command
    {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
        if let Some(backend) = backend {
            config.backend.kind = *backend;
        }
    }

    let log_format = if cli.json_logs {
        LogFormat::Json
    } else {
        config.log.format
    };
    init_tracing(log_format, verbosity_directives(cli.verbose), config.log.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    for problem in &config_problems {
        tracing::warn!(error = %problem, "Configuration problem");
    }
    tracing::debug!(path = %config_path.display(), backend = %config.backend.kind, "Configuration loaded");

    let state = AppState::init(config, &data_dir).await?;

    let result = match cli.command {
        Commands::Serve { .. } => serve(state).await,
        Commands::Sync { chat_id } => cli::sync::sync_chat(&state, &chat_id).await,
        Commands::Check => cli::check::check(&state).await,
    };

    shutdown_tracing();
    result
}

/// Run the HTTP server and the background sync until a shutdown signal.
async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let shutdown = CancellationToken::new();
    let scheduler = SyncScheduler::new(
        state.coordinator.clone(),
        state.sessions.clone(),
        Duration::from_secs(state.config.sync.interval_secs),
    )
    .spawn(shutdown.clone());

    tracing::info!(%addr, backend = %state.config.backend.kind, "Parley listening");
    println!(
        "  {} Parley listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Sync scheduler did not stop cleanly");
        }
    }

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
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
