use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::achievement::{
    Achievement, AchievementFilter, CreateAchievement, UpdateAchievement,
};
use deployment::Deployment;
use utils::response::ApiResponse;

use super::require;
use crate::{DeploymentImpl, error::ApiError, extract::{Json, Path, Query}};

/// GET /api/achievements
pub async fn get_achievements(
    State(deployment): State<DeploymentImpl>,
    Query(filter): Query<AchievementFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<Achievement>>>, ApiError> {
    let achievements = Achievement::find_all(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(achievements)))
}

/// GET /api/achievements/{id}
pub async fn get_achievement(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<Achievement>>, ApiError> {
    let achievement = Achievement::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Achievement not found"))?;
    Ok(ResponseJson(ApiResponse::success(achievement)))
}

/// POST /api/achievements
pub async fn create_achievement(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateAchievement>,
) -> Result<ResponseJson<ApiResponse<Achievement>>, ApiError> {
    require(&payload.title, "Title is required")?;
    let (Some(date), Some(achievement_type)) =
        (payload.achievement_date, payload.achievement_type)
    else {
        return Err(ApiError::bad_request("Title, date and type are required"));
    };

    let achievement = Achievement::create(
        &deployment.db().pool,
        &payload.title,
        date,
        &payload.description,
        achievement_type,
    )
    .await?;
    tracing::info!(
        achievement_id = achievement.id,
        kind = %achievement.achievement_type,
        "Created achievement"
    );
    Ok(ResponseJson(ApiResponse::success(achievement)))
}

/// PUT /api/achievements/{id}
pub async fn update_achievement(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateAchievement>,
) -> Result<ResponseJson<ApiResponse<Achievement>>, ApiError> {
    let pool = &deployment.db().pool;
    let existing = Achievement::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Achievement not found"))?;
    if let Some(title) = &payload.title {
        require(title, "Title is required")?;
    }

    let achievement = Achievement::update(pool, &payload.apply_to(existing)).await?;
    Ok(ResponseJson(ApiResponse::success(achievement)))
}

/// DELETE /api/achievements/{id}
pub async fn delete_achievement(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Achievement::delete(&deployment.db().pool, id).await?;
    if rows_affected == 0 {
        return Err(ApiError::not_found("Achievement not found"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/achievements", get(get_achievements).post(create_achievement))
        .route(
            "/achievements/{id}",
            get(get_achievement)
                .put(update_achievement)
                .delete(delete_achievement),
        )
}
