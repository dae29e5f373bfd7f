//! Shutdown signals.
//!
//! Hosts stop on SIGINT (Ctrl-C) or SIGTERM; the launcher uses SIGTERM to
//! stop the journal service so it drains and closes the journal.

use tracing::{info, warn};

/// Resolves on the first shutdown signal.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut term), Ok(mut int)) => {
                tokio::select! {
                    _ = term.recv() => info!("Received SIGTERM, shutting down"),
                    _ = int.recv() => info!("Interrupt received, shutting down"),
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to install signal handlers, falling back to Ctrl-C");
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupt received, shutting down"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
