//! Serving the router with graceful shutdown

use axum::Router;
use std::io;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Bind `address` and serve until Ctrl+C or SIGTERM
pub async fn serve(address: &str, router: Router) -> io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    info!("folio listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("received Ctrl+C, shutting down gracefully"),
        _ = terminate => warn!("received terminate signal, shutting down gracefully"),
    }
}
