use axum::Router;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::task::api::v1::{TaskState, create_task_router};

pub mod middleware;

/// Builds the application router around an open database connection.
pub fn create_router(db: DatabaseConnection) -> Router {
    let task_state = TaskState { db: Arc::new(db) };

    Router::new()
        .route("/", axum::routing::get(welcome_handler))
        .route("/health", axum::routing::get(health_check_handler))
        .merge(create_task_router(task_state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new()),
        )
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let db = Database::connect(&config.task_db).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Task API running on http://{}", server_address);

    axum::serve(listener, create_router(db)).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

#[tracing::instrument]
pub async fn welcome_handler() -> &'static str {
    "Welcome on Task API"
}
