//! `promptgate` binary.
//!
//! # Usage
//!
//! ```bash
//! promptgate aims
//! PDP_URL=http://aims:8080 promptgate pep
//! PEP_URL=http://pep:8080 RAG_URL=http://answer:8080 AIMS_URL=http://aims:8080 promptgate gateway
//! promptgate --listen 127.0.0.1:9000 answer
//! ```
//!
//! # Shutdown
//!
//! SIGINT or SIGTERM stops accepting connections and lets in-flight requests
//! finish. The gateway then waits for its detached routes and evidence
//! writes. Both phases together are bounded by
//! `PROMPTGATE_SHUTDOWN_TIMEOUT_SECS`.

use std::net::SocketAddr;

use clap::Parser;
use promptgate_core::config::ServiceConfig;
use promptgate_proxy::server::{serve, shutdown as finish_shutdown};
use promptgate_proxy::{ServiceKind, build_app};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "promptgate", version, about = "Policy-gated routing for AI prompt traffic")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "PROMPTGATE_LISTEN", default_value = "0.0.0.0:8080", global = true)]
    listen: SocketAddr,

    #[command(subcommand)]
    service: ServiceKind,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env().inspect_err(|e| {
        error!(error = %e, "Invalid configuration, refusing to start");
    })?;
    let shutdown_limit = config.timeouts.shutdown;

    let app = build_app(cli.service, &config).inspect_err(|e| {
        error!(service = %cli.service, error = %e, "Failed to build service");
    })?;

    let listener = TcpListener::bind(cli.listen).await?;
    info!(
        service = %cli.service,
        version = %config.version,
        addr = %cli.listen,
        "PromptGate starting"
    );

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    let mut server = tokio::spawn(serve(listener, app.router, shutdown.clone()));

    tokio::select! {
        result = &mut server => {
            // Accept loop ended without a signal.
            shutdown.cancel();
            result??;
            return Ok(());
        }
        _ = shutdown.cancelled() => {
            info!("Shutdown signal received, draining in-flight requests");
        }
    }

    if !finish_shutdown(server, app.gateway, shutdown_limit).await? {
        error!(
            timeout_secs = shutdown_limit.as_secs(),
            "Shutdown deadline reached with work still outstanding"
        );
    }

    info!(service = %cli.service, "PromptGate stopped");
    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_sigint = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                shutdown_sigint.cancel();
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGINT");
            }
        }
    });

    #[cfg(unix)]
    {
        tokio::spawn(async move {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    info!("Received SIGTERM, initiating graceful shutdown");
                    shutdown.cancel();
                }
                Err(e) => {
                    error!(error = %e, "Failed to listen for SIGTERM");
                }
            }
        });
    }
}
