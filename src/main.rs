use std::net::SocketAddr;
use std::sync::Arc;

use stem_cleanup::cleanup::CleanupEngine;
use stem_cleanup::config::Config;
use stem_cleanup::logging::{init_tracing, LogConfig};
use stem_cleanup::routes::build_router;
use stem_cleanup::state::AppState;
use stem_cleanup::store::supabase::SupabaseStore;
use stem_cleanup::workers::WorkerManager;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    init_tracing(&LogConfig {
        log_level: config.log_level.clone(),
        enable_file_logs: config.enable_file_logs,
        log_dir: config.log_dir.clone(),
    });
    tracing::info!("Starting stem-cleanup");

    if config.supabase.url.is_empty() || config.supabase.service_role_key.is_empty() {
        panic!(
            "FATAL: SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY must be set. \
             The cleanup service cannot reach its backing store without them."
        );
    }

    let store = Arc::new(SupabaseStore::new(&config.supabase));
    let engine = Arc::new(CleanupEngine::new(
        store.clone(),
        store,
        config.cleanup.list_page_size,
    ));

    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(engine.clone(), &config, shutdown_tx.clone());

    let worker_handle = if config.worker.is_leader {
        let worker_manager = WorkerManager::new(
            engine.clone(),
            shutdown_tx.subscribe(),
            &config.worker,
            &config.cleanup,
        );
        Some(tokio::spawn(async move {
            if let Err(e) = worker_manager.start().await {
                tracing::error!(error = %e, "Worker manager failed");
            }
        }))
    } else {
        None
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new());

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");

    let server_future =
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()));

    if let Some(handle) = worker_handle {
        // Worker runs as an independent background task; a panic there is
        // logged without taking down the HTTP server.
        tokio::spawn(async move {
            match handle.await {
                Err(e) => {
                    tracing::error!(error = %e, "Worker task panicked, HTTP server continues")
                }
                Ok(()) => tracing::info!("Worker manager exited normally"),
            }
        });
    }

    if let Err(e) = server_future.await {
        tracing::error!(error = %e, "HTTP server crashed");
    }

    tracing::info!("Shutdown complete");
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
