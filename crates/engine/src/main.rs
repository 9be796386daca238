//! AcornQuest Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use acornquest_engine::api;
use acornquest_engine::infrastructure::{
    bounded::BoundedStore,
    canvas::{CanvasClient, StaticCourseData},
    config::{EngineConfig, StorageBackend},
    memory::InMemoryStore,
    ports::CourseDataPort,
    sqlite::SqliteStore,
};
use acornquest_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may be started from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "acornquest_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting AcornQuest Engine");

    let config = EngineConfig::from_env();
    tracing::info!(
        storage = ?config.storage,
        storage_timeout_ms = config.storage_timeout.as_millis() as u64,
        conflict_retries = config.retry.max_retries,
        "Configuration loaded"
    );

    // Course data provider
    let course_data: Arc<dyn CourseDataPort> = match &config.canvas {
        Some(canvas) => {
            tracing::info!(base_url = %canvas.base_url, "Using Canvas for assignment completion");
            Arc::new(CanvasClient::new(&canvas.base_url, &canvas.api_token))
        }
        None => {
            tracing::warn!("CANVAS_BASE_URL not set, no assignment will be reported complete");
            Arc::new(StaticCourseData::new())
        }
    };

    // Storage, bounded by the configured timeout
    let app = match &config.storage {
        StorageBackend::Sqlite { path } => {
            tracing::info!(path = %path, "Opening SQLite store");
            let store = Arc::new(SqliteStore::new(path).await?);
            App::new(
                Arc::new(BoundedStore::new(store, config.storage_timeout)),
                course_data,
                config.retry.clone(),
                config.assignment_reward,
            )
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store, state is lost on restart");
            let store = Arc::new(InMemoryStore::new());
            App::new(
                Arc::new(BoundedStore::new(store, config.storage_timeout)),
                course_data,
                config.retry.clone(),
                config.assignment_reward,
            )
        }
    };

    let mut router = api::http::routes()
        .with_state(Arc::new(app))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer_from_env() {
        router = router.layer(cors);
    }

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Engine stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

fn build_cors_layer_from_env() -> Option<CorsLayer> {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;

    // The web client posts JSON bodies, which trigger CORS preflights.
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
