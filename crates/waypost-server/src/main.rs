use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Deserialize;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use waypost_consul::{ConsulConfig, ConsulDirectory};
use waypost_registry::{RegistryConfig, RegistryHost};

mod config;

use config::ServerConfig;

#[derive(Clone)]
struct AppState {
    host: Arc<RegistryHost>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize metrics
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).ok();

    let server_config = ServerConfig::from_env()?;
    let consul_config = ConsulConfig::from_env();
    let directory = Arc::new(ConsulDirectory::new(&consul_config)?);
    let span = tracing::info_span!("registry", directory = %consul_config.base_url());
    let host = Arc::new(RegistryHost::with_span(directory, &RegistryConfig::from_env(), span));

    let state = AppState { host: host.clone() };

    let app = Router::new()
        .route("/status", get(status))
        .route("/metrics", get(move || {
            let rendered = handle.render();
            async move { rendered }
        }))
        .route("/api/discover/:name", get(discover_service))
        .with_state(state);

    // Bind before registering so the first health check can reach us.
    let server = axum::Server::try_bind(&server_config.bind)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal());
    tracing::info!("listening on {}", server_config.bind);

    host.register_service(
        &server_config.service_name,
        &server_config.service_id,
        &server_config.service_version,
        &server_config.advertise_url,
        None,
    )
    .await?;

    if let Err(e) = server.await {
        tracing::error!("server error: {}", e);
    }

    if let Err(e) = host.deregister_service(&server_config.service_id).await {
        tracing::warn!(error = %e, "failed to deregister on shutdown");
    }
    host.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}

async fn status() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}

#[derive(Deserialize)]
struct DiscoverQuery {
    version: Option<String>,
}

async fn discover_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<DiscoverQuery>,
) -> impl IntoResponse {
    let result = match query.version.as_deref() {
        Some(version) => state.host.find_service_instances_with_version(&name, version).await,
        None => state.host.find_service_instances(&name).await,
    };
    match result {
        Ok(instances) => (StatusCode::OK, Json(instances)).into_response(),
        Err(e) => {
            tracing::warn!(service = %name, error = %e, "discovery failed");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}
