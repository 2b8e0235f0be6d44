use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use deployment::Deployment;
use services::services::config::Config;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, extract::Json};

/// GET /api/config
pub async fn get_config(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<Config>> {
    let config = deployment.config().read().await.clone();
    ResponseJson(ApiResponse::success(config))
}

/// PUT /api/config
/// The upload body limit is applied at startup, so a new `maxUploadBytes`
/// takes effect after a restart.
pub async fn update_config(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<Config>,
) -> Result<ResponseJson<ApiResponse<Config>>, ApiError> {
    let config = deployment.update_config(payload).await?;
    Ok(ResponseJson(ApiResponse::success(config)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/config", get(get_config).put(update_config))
}
