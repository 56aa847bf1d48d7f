use crate::server::state::AppState;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;

pub mod handler;
pub mod state;

pub fn router(state: AppState) -> Router {
    let metrics_path = state.configuration.server.metrics_path.clone();

    Router::new()
        .route(&metrics_path, get(handler::metrics))
        .route("/health", get(handler::health_check))
        .with_state(state)
}

pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let listen = state.configuration.server.listen;
    let listener = TcpListener::bind(listen).await?;

    tracing::info!(
        address = %listener.local_addr()?,
        path = %state.configuration.server.metrics_path,
        "Listening for scrapes"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutting down");
}
