//! OS signal handling for graceful shutdown.

use platforma_core::Context;
use tracing::warn;

/// Cancel `ctx` when the process receives an interrupt, terminate, or
/// hang-up signal. The watcher exits on its own once `ctx` ends.
pub(crate) fn watch_shutdown_signals(ctx: Context) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(unix)]
        let hangup = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGHUP handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        #[cfg(not(unix))]
        let hangup = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => warn!("received interrupt, shutting down"),
            _ = terminate => warn!("received terminate signal, shutting down"),
            _ = hangup => warn!("received hang-up signal, shutting down"),
            _ = ctx.cancelled() => return,
        }

        ctx.cancel();
    });
}
