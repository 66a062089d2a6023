// Framework bootstrap for the pong server runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{session_status_handler, ws_handler};
use crate::interface_adapters::protocol::encode_event;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{SessionHandle, SessionSettings};

use axum::{Router, routing::get};
use std::future::Future;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves until the process exits. Settings come from the environment.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    serve(listener, config::session_settings(), std::future::pending::<()>()).await
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::new(config::http_host(), config::http_port());

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    serve(listener, config::session_settings(), shutdown_signal()).await
}

/// Runs the session and the HTTP surface until `shutdown` resolves.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    settings: SessionSettings,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    tracing::info!(
        tick_ms = settings.tick_interval.as_millis() as u64,
        seeded = settings.rng_seed.is_some(),
        "session configured"
    );

    // Spawn the session loop; it owns all game state.
    let (session, session_task) = SessionHandle::spawn(settings, encode_event);
    let state = Arc::new(AppState {
        session: session.clone(),
    });

    // Start the Web Server
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/session", get(session_status_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Stop the session first so upgraded sockets close and the server can drain.
    let stopping = session.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("shutdown requested");
            stopping.shutdown();
        })
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        });

    // Covers the error path, where the signal never fired.
    session.shutdown();
    if let Err(e) = session_task.await {
        tracing::error!(error = %e, "session loop panicked");
    }
    tracing::info!("server stopped");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
