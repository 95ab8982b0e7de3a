//! HTTP server loop and graceful shutdown.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use promptgate_core::gateway::Gateway;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Serve `router` on `listener` until `shutdown` is cancelled.
///
/// In-flight requests are allowed to finish after cancellation; new
/// connections are refused.
///
/// # Errors
///
/// Returns the I/O error that stopped the accept loop.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Finish a cancelled server within `limit`.
///
/// Waits for in-flight requests, then for the gateway's detached tasks. Both
/// phases share one deadline, so the whole shutdown never takes longer than
/// `limit`. Returns `true` when everything finished in time.
///
/// # Errors
///
/// Returns the accept loop's I/O error, or the server task's panic.
pub async fn shutdown(
    mut server: JoinHandle<io::Result<()>>,
    gateway: Option<Arc<Gateway>>,
    limit: Duration,
) -> io::Result<bool> {
    let deadline = Instant::now() + limit;

    let mut finished = match tokio::time::timeout_at(deadline, &mut server).await {
        Ok(result) => {
            result.map_err(io::Error::other)??;
            true
        }
        Err(_) => {
            warn!(
                timeout_secs = limit.as_secs(),
                "In-flight requests did not finish in time"
            );
            server.abort();
            false
        }
    };

    if let Some(gateway) = gateway {
        let pending = gateway.pending_tasks();
        let remaining = deadline.saturating_duration_since(Instant::now());
        if gateway.drain(remaining).await {
            info!(pending, "Gateway tasks drained");
        } else {
            finished = false;
        }
    }

    Ok(finished)
}
