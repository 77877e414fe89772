//! metricgate server.
//!
//! Startup: settings -> profiles dir -> adapter bootstrap -> serve. The engine
//! starts empty; `POST /admin/refresh` loads the first manifest.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use metricgate_core::error::{GateError, Result};
use metricgate_engine::{ManifestEngineBuilder, ProfileAdapterFactory};
use metricgate_gateway::config::{ProfilesDir, Settings};
use metricgate_gateway::{build_router, AppState, EngineManager};

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("metricgate: configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut profiles = match ProfilesDir::resolve(&settings) {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::error!(error = %e, "profile resolution failed");
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&settings, &profiles).await;

    if let Err(e) = profiles.cleanup() {
        tracing::warn!(error = %e, "profile cleanup failed");
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "metricgate stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: &Settings, profiles: &ProfilesDir) -> Result<()> {
    tracing::info!(?settings, source = %profiles.source(), "starting metricgate");

    let engines = Arc::new(EngineManager::new(Arc::new(ManifestEngineBuilder::new())));
    let location = settings.profile_location(profiles.path().to_path_buf());
    engines
        .bootstrap(&ProfileAdapterFactory::new(), &location)
        .map_err(|e| GateError::Internal(format!("adapter bootstrap failed: {e}")))?;

    let app = build_router(AppState::new(settings, engines));

    let listener = tokio::net::TcpListener::bind((settings.host.as_str(), settings.port))
        .await
        .map_err(|e| GateError::Internal(format!("bind {}:{} failed: {e}", settings.host, settings.port)))?;
    let local = listener
        .local_addr()
        .map_err(|e| GateError::Internal(format!("listener address unavailable: {e}")))?;
    tracing::info!(listen = %local, "metricgate listening, waiting for POST /admin/refresh");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GateError::Internal(format!("server failed: {e}")))?;

    tracing::info!("metricgate shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
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
    tracing::info!("signal received, starting graceful shutdown");
}
