use axum::Router;
use axum::http::{HeaderName, Method, header};
use axum::response::Json;
use sea_orm::Database;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::todo::api::create_todo_router;
use crate::todo::{SeaOrmTodoRepository, TodoState};

/// Body returned by the health check endpoints.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub active: bool,
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let db = Database::connect(&config.database_url()).await?;
    let repository = SeaOrmTodoRepository::new(db.clone());
    repository.ensure_schema(config.reset_schema).await?;

    let app = create_app(TodoState::new(Arc::new(repository)));

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Starting Todolist API server on http://{}", server_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await?;
    tracing::info!("Database connection closed");
    Ok(())
}

/// Builds the full application router: todo routes, health checks, request
/// tracing and CORS.
pub fn create_app(state: TodoState) -> Router {
    Router::new()
        .merge(create_health_router())
        .merge(create_todo_router(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
}

/// Routes answering liveness probes.
pub fn create_health_router() -> Router {
    Router::new()
        .route("/", axum::routing::get(health_check_handler))
        .route("/check", axum::routing::get(health_check_handler))
}

/// Any origin may call GET, POST, DELETE, PATCH and OPTIONS.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
        ])
}

#[tracing::instrument]
pub async fn health_check_handler() -> Json<HealthResponse> {
    tracing::info!("API Health is OK");
    Json(HealthResponse { active: true })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
