use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use deployment::Deployment;
use services::services::seed::{SeedOutcome, seed};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

/// POST /api/seed
/// Fills an empty database with starter data; a no-op once content exists.
pub async fn seed_database(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<SeedOutcome>>, ApiError> {
    let outcome = seed(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(outcome)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/seed", post(seed_database))
}
