use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::expert::{CreateExpert, Expert, ExpertWithProjects, UpdateExpert};
use deployment::Deployment;
use utils::response::ApiResponse;

use super::{ensure_projects_exist, remove_stored_file, require};
use crate::{DeploymentImpl, error::ApiError, extract::{Json, Path}};

/// GET /api/experts
pub async fn get_experts(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<ExpertWithProjects>>>, ApiError> {
    let experts = Expert::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(experts)))
}

/// GET /api/experts/{id}
pub async fn get_expert(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<ExpertWithProjects>>, ApiError> {
    let expert = Expert::find_with_projects(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Expert not found"))?;
    Ok(ResponseJson(ApiResponse::success(expert)))
}

/// POST /api/experts
pub async fn create_expert(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateExpert>,
) -> Result<ResponseJson<ApiResponse<ExpertWithProjects>>, ApiError> {
    require(&payload.name, "Name is required")?;
    let pool = &deployment.db().pool;
    if let Some(project_ids) = &payload.project_ids {
        ensure_projects_exist(pool, project_ids).await?;
    }

    let expert = Expert::create(pool, &payload).await?;
    tracing::info!(expert_id = expert.id, "Created expert");
    Ok(ResponseJson(ApiResponse::success(expert)))
}

/// PUT /api/experts/{id}
pub async fn update_expert(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateExpert>,
) -> Result<ResponseJson<ApiResponse<ExpertWithProjects>>, ApiError> {
    let pool = &deployment.db().pool;
    let existing = Expert::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Expert not found"))?;
    if let Some(name) = &payload.name {
        require(name, "Name is required")?;
    }
    if let Some(project_ids) = &payload.project_ids {
        ensure_projects_exist(pool, project_ids).await?;
    }

    let expert = payload.apply_to(existing);
    let updated = Expert::update(pool, &expert, payload.project_ids.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/experts/{id}
pub async fn delete_expert(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let pool = &deployment.db().pool;
    let expert = Expert::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Expert not found"))?;

    Expert::delete(pool, id).await?;
    remove_stored_file(&deployment, expert.file_path.as_deref()).await;
    tracing::info!(expert_id = id, "Deleted expert");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/experts", get(get_experts).post(create_expert))
        .route(
            "/experts/{id}",
            get(get_expert).put(update_expert).delete(delete_expert),
        )
}
