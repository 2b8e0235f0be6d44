use axum::{
    Router, extract::State, http::StatusCode, response::Json as ResponseJson, routing::get,
};
use chrono::{DateTime, Utc};
use db::{DATABASE_URL_ENV, models::counts::EntityCounts};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::{
    config::Config,
    database_validator::{DatabaseValidator, ValidationResult},
};
use ts_rs::TS;
use utils::{assets::ASSET_DIR_ENV, response::ApiResponse};

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub database: String,
    pub counts: Option<EntityCounts>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Which settings are present, never their values.
#[derive(Debug, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DebugReport {
    pub version: String,
    pub database_url_set: bool,
    pub asset_dir_set: bool,
    pub rust_log: Option<String>,
    pub config: Config,
    pub database: ValidationResult,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/health
pub async fn health_check(
    State(deployment): State<DeploymentImpl>,
) -> (StatusCode, ResponseJson<ApiResponse<HealthReport>>) {
    let validator = DatabaseValidator::new(deployment.db().pool.clone());
    match validator.health().await {
        Ok(counts) => (
            StatusCode::OK,
            ResponseJson(ApiResponse::success(HealthReport {
                status: HealthStatus::Healthy,
                database: "connected".to_string(),
                counts: Some(counts),
                error: None,
                timestamp: Utc::now(),
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ResponseJson(ApiResponse::error_with_data(HealthReport {
                    status: HealthStatus::Unhealthy,
                    database: "disconnected".to_string(),
                    counts: None,
                    error: Some(e.to_string()),
                    timestamp: Utc::now(),
                })),
            )
        }
    }
}

/// GET /api/debug
pub async fn debug_info(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<DebugReport>>, ApiError> {
    let database = DatabaseValidator::new(deployment.db().pool.clone())
        .validate()
        .await?;
    let report = DebugReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        database_url_set: std::env::var_os(DATABASE_URL_ENV).is_some(),
        asset_dir_set: std::env::var_os(ASSET_DIR_ENV).is_some(),
        rust_log: std::env::var("RUST_LOG").ok(),
        config: deployment.config().read().await.clone(),
        database,
        timestamp: Utc::now(),
    };
    Ok(ResponseJson(ApiResponse::success(report)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/health", get(health_check))
        .route("/debug", get(debug_info))
}
