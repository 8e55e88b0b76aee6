//! Agent Builder CLI and REST API entry point.
//!
//! Binary name: `agent-builder`
//!
//! Parses CLI arguments, loads configuration, initializes logging, the
//! database and services, then dispatches to the command handler or starts
//! the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;

use agent_builder_infra::config::{resolve_data_dir, try_load_app_config};
use agent_builder_observe::tracing_setup::{init_tracing, shutdown_tracing, TracingOptions};
use agent_builder_types::config::AppConfig;
use cli::{AgentCommand, Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = resolve_data_dir();
    let loaded = try_load_app_config(&data_dir).await;
    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();

    init_tracing(&TracingOptions {
        json: logging.json,
        otel: logging.otel,
        default_filter: cli::default_filter(cli.verbose).to_string(),
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("{err}, using defaults");
            AppConfig::default()
        }
    };

    let result = run(cli, data_dir, config).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli, data_dir: std::path::PathBuf, config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::init(data_dir, config).await?;

    match cli.command {
        Commands::Agents { command } => match command {
            AgentCommand::List { page } => cli::agent::list_agents(&state, page, cli.json).await?,
            AgentCommand::Show { id, user } => {
                cli::agent::show_agent(&state, &id, &user, cli.json).await?
            }
            AgentCommand::Public { page } => cli::agent::list_public(&state, page, cli.json).await?,
        },

        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            tracing::info!(
                addr = %addr,
                data_dir = %state.data_dir.display(),
                mcp_servers = state.config.mcp_servers.len(),
                "api server listening"
            );
            println!(
                "  {} Agent Builder API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
