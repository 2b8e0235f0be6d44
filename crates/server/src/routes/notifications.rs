use axum::{Router, extract::State, response::Json as ResponseJson, routing::{get, post}};
use chrono::Utc;
use db::models::notification_dismissal::NotificationDismissal;
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::notification::DueDateNotification;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, extract::Path};

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct DismissAllResponse {
    pub dismissed: usize,
}

/// GET /api/notifications
/// Recomputed on every call from the current time.
pub async fn get_notifications(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<DueDateNotification>>>, ApiError> {
    let pending = deployment.notifications().pending(Utc::now()).await?;
    Ok(ResponseJson(ApiResponse::success(pending)))
}

/// POST /api/notifications/{task_id}/dismiss
pub async fn dismiss_notification(
    State(deployment): State<DeploymentImpl>,
    Path(task_id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<NotificationDismissal>>, ApiError> {
    let dismissal = deployment.notifications().dismiss(task_id).await?;
    Ok(ResponseJson(ApiResponse::success(dismissal)))
}

/// POST /api/notifications/dismiss-all
pub async fn dismiss_all_notifications(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<DismissAllResponse>>, ApiError> {
    let dismissed = deployment.notifications().dismiss_all(Utc::now()).await?;
    Ok(ResponseJson(ApiResponse::success(DismissAllResponse {
        dismissed,
    })))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/notifications", get(get_notifications))
        .route("/notifications/dismiss-all", post(dismiss_all_notifications))
        .route("/notifications/{task_id}/dismiss", post(dismiss_notification))
}
