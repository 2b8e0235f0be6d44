use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
};
use db::models::project_link;
use deployment::Deployment;
use sqlx::SqlitePool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{DeploymentImpl, error::ApiError};

pub mod achievements;
pub mod config;
pub mod experts;
pub mod files;
pub mod health;
pub mod materials;
pub mod notes;
pub mod notifications;
pub mod papers;
pub mod projects;
pub mod seed;
pub mod tasks;

pub async fn router(deployment: DeploymentImpl) -> Router {
    let max_upload_bytes = deployment.config().read().await.uploads.max_upload_bytes;

    let base_routes = Router::new()
        .merge(health::router(&deployment))
        .merge(notes::router(&deployment))
        .merge(papers::router(&deployment))
        .merge(projects::router(&deployment))
        .merge(tasks::router(&deployment))
        .merge(achievements::router(&deployment))
        .merge(experts::router(&deployment))
        .merge(materials::router(&deployment))
        .merge(files::router(&deployment))
        .merge(notifications::router(&deployment))
        .merge(seed::router(&deployment))
        .merge(config::router(&deployment))
        .with_state(deployment);

    Router::new()
        .nest("/api", base_routes)
        .layer(DefaultBodyLimit::max(
            usize::try_from(max_upload_bytes).unwrap_or(usize::MAX),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
        )
}

/// Reject blank required text fields.
pub(crate) fn require(value: &str, message: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::bad_request(message))
    } else {
        Ok(())
    }
}

/// Reject the request if any of `project_ids` does not name a project.
pub(crate) async fn ensure_projects_exist(
    pool: &SqlitePool,
    project_ids: &[i32],
) -> Result<(), ApiError> {
    let missing = project_link::missing_project_ids(pool, project_ids).await?;
    if missing.is_empty() {
        return Ok(());
    }
    let ids = missing
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Err(ApiError::bad_request(format!("Unknown project ids: {ids}")))
}

/// Remove an uploaded file referenced by a deleted record. Values that are not
/// blob-store keys (external URLs, empty strings) are left alone.
pub(crate) async fn remove_stored_file(deployment: &DeploymentImpl, file_path: Option<&str>) {
    let Some(key) = file_path.filter(|p| deployment.storage().owns(p)) else {
        return;
    };
    if let Err(e) = deployment.storage().delete(key).await {
        tracing::warn!(key = %key, error = %e, "Failed to remove stored file");
    }
}
