//! Inventory RS Server
//!
//! HTTP server for the in-memory inventory registry with on-disk photos.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use clap::Parser;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inv_api::handlers::method_not_allowed;
use inv_api::AppState;
use inv_attachments::{LocalStorage, Storage};
use inv_core::config::{AppConfig, ConfigOverrides};
use inv_registry::{InventoryConfig, InventoryService, Registry};

mod health;
mod metrics;

use health::HealthChecker;
use metrics::{Metrics, MetricsState};

/// Command-line flags; each one overrides its `INVENTORY_*` variable
#[derive(Debug, Default, Parser)]
#[command(name = "inventory-server", version, about = "Inventory registry HTTP server")]
struct Cli {
    /// Server host
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Cache directory for uploaded photos
    #[arg(long, value_name = "DIR")]
    cache: Option<PathBuf>,

    /// Maximum request body size in bytes
    #[arg(long, value_name = "BYTES")]
    max_body_size: Option<usize>,

    /// Keep replaced and deleted photos on disk
    #[arg(long)]
    keep_orphaned_photos: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host,
            port: self.port,
            cache_dir: self.cache,
            max_body_size_bytes: self.max_body_size,
            reclaim_orphaned_photos: self.keep_orphaned_photos.then_some(false),
            log_json: self.log_json.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::load(cli.overrides()).context("Invalid configuration")?;

    // Initialize structured logging
    init_tracing(config.logging.json);

    let cache_dir = config.ensure_cache_dir()?;
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::open(cache_dir)
            .with_context(|| format!("Cannot open photo storage at {}", cache_dir.display()))?,
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        cache = %cache_dir.display(),
        reclaim_orphaned_photos = config.storage.reclaim_orphaned_photos,
        "Starting Inventory RS"
    );

    let inventory = InventoryService::new(
        Arc::new(Registry::new()),
        storage,
        InventoryConfig {
            reclaim_orphaned_photos: config.storage.reclaim_orphaned_photos,
            public_origin: config.public_origin(),
        },
    );
    let state = AppState::new(inventory);
    let metrics = Arc::new(Metrics::new());

    let app = build_router(state, metrics, config.server.max_body_size_bytes);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "Cannot bind {}:{}",
                config.server.host, config.server.port
            )
        })?;
    info!("Server running at {}", config.public_origin());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "info,inv_server=debug,inv_api=debug,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

/// Build the application router
fn build_router(state: AppState, metrics: Arc<Metrics>, max_body_size: usize) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health).fallback(method_not_allowed))
        .route("/health/live", get(health::liveness).fallback(method_not_allowed))
        .with_state(Arc::new(HealthChecker::new(state.inventory.clone())));

    let metrics_routes = Router::new()
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).fallback(method_not_allowed),
        )
        .with_state(MetricsState {
            metrics: metrics.clone(),
            inventory: state.inventory.clone(),
        });

    let app = Router::new()
        .merge(health_routes)
        .merge(metrics_routes)
        .merge(inv_api::router().with_state(state));

    inv_api::with_fallback(app)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(middleware::from_fn_with_state(
            metrics,
            metrics::metrics_middleware,
        ))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use inv_attachments::MemoryStorage;
    use tower::ServiceExt;

    fn test_app(max_body_size: usize) -> Router {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let inventory = InventoryService::new(
            Arc::new(Registry::new()),
            storage,
            InventoryConfig::default(),
        );
        build_router(AppState::new(inventory), Arc::new(Metrics::new()), max_body_size)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_app(1024);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_metrics_count_requests() {
        let app = test_app(1024);

        app.clone()
            .oneshot(Request::builder().uri("/inventory").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("http_requests_total 1"));
        assert!(text.contains("inventory_items 0"));
    }

    #[tokio::test]
    async fn test_inventory_routes_mounted() {
        let app = test_app(1024);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"inventory_name": "Drill"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Method Not Allowed"})
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_405() {
        let app = test_app(1024);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/RegisterForm.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Method Not Allowed"})
        );
    }

    #[tokio::test]
    async fn test_body_limit() {
        let app = test_app(16);
        let description = "x".repeat(64);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(
                        r#"{{"inventory_name": "Drill", "description": "{}"}}"#,
                        description
                    )))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body_json(response).await["error"].is_string());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "inventory-server",
            "--host",
            "127.0.0.1",
            "--port",
            "3000",
            "--cache",
            "./cache",
            "--keep-orphaned-photos",
        ]);
        let overrides = cli.overrides();

        assert_eq!(overrides.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(overrides.port, Some(3000));
        assert_eq!(overrides.cache_dir, Some(PathBuf::from("./cache")));
        assert_eq!(overrides.reclaim_orphaned_photos, Some(false));
        assert_eq!(overrides.log_json, None);
    }
}
