use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::paper::{CreatePaper, Paper, PaperFilter, PaperWithProjects, UpdatePaper};
use deployment::Deployment;
use utils::response::ApiResponse;

use super::{ensure_projects_exist, remove_stored_file, require};
use crate::{DeploymentImpl, error::ApiError, extract::{Json, Path, Query}};

/// GET /api/papers
pub async fn get_papers(
    State(deployment): State<DeploymentImpl>,
    Query(filter): Query<PaperFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<PaperWithProjects>>>, ApiError> {
    let papers = Paper::find_all(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(papers)))
}

/// GET /api/papers/{id}
pub async fn get_paper(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<PaperWithProjects>>, ApiError> {
    let paper = Paper::find_with_projects(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Paper not found"))?;
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// POST /api/papers
pub async fn create_paper(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreatePaper>,
) -> Result<ResponseJson<ApiResponse<PaperWithProjects>>, ApiError> {
    require(&payload.title, "Title is required")?;
    let pool = &deployment.db().pool;
    if let Some(project_ids) = &payload.project_ids {
        ensure_projects_exist(pool, project_ids).await?;
    }

    let paper = Paper::create(pool, &payload).await?;
    tracing::info!(
        paper_id = paper.id,
        projects = paper.projects.len(),
        "Created paper"
    );
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// PUT /api/papers/{id}
pub async fn update_paper(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePaper>,
) -> Result<ResponseJson<ApiResponse<PaperWithProjects>>, ApiError> {
    let pool = &deployment.db().pool;
    let existing = Paper::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Paper not found"))?;
    if let Some(title) = &payload.title {
        require(title, "Title is required")?;
    }
    if let Some(project_ids) = &payload.project_ids {
        ensure_projects_exist(pool, project_ids).await?;
    }

    let paper = payload.apply_to(existing);
    let updated = Paper::update(pool, &paper, payload.project_ids.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/papers/{id}
pub async fn delete_paper(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let pool = &deployment.db().pool;
    let paper = Paper::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Paper not found"))?;

    Paper::delete(pool, id).await?;
    remove_stored_file(&deployment, paper.file_path.as_deref()).await;
    tracing::info!(paper_id = id, "Deleted paper");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/papers", get(get_papers).post(create_paper))
        .route(
            "/papers/{id}",
            get(get_paper).put(update_paper).delete(delete_paper),
        )
}
