use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::project::{CreateProject, Project, ProjectWithRelations, UpdateProject};
use deployment::Deployment;
use utils::response::ApiResponse;

use super::require;
use crate::{DeploymentImpl, error::ApiError, extract::{Json, Path}};

/// GET /api/projects
/// Every project with its tasks and linked papers, experts and materials.
pub async fn get_projects(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectWithRelations>>>, ApiError> {
    let projects = Project::find_all_with_relations(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<ProjectWithRelations>>, ApiError> {
    let project = Project::find_with_relations(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

/// POST /api/projects
pub async fn create_project(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    require(&payload.project_name, "Project name is required")?;

    let project = Project::create(&deployment.db().pool, &payload).await?;
    tracing::info!(project_id = project.id, name = %project.project_name, "Created project");
    Ok(ResponseJson(ApiResponse::success(project)))
}

/// PUT /api/projects/{id}
pub async fn update_project(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let pool = &deployment.db().pool;
    let existing = Project::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    if let Some(name) = &payload.project_name {
        require(name, "Project name is required")?;
    }

    let project_name = payload
        .project_name
        .as_deref()
        .unwrap_or(&existing.project_name);
    let description = payload
        .description
        .as_deref()
        .or(existing.description.as_deref());

    let project = Project::update(pool, id, project_name, description).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

/// DELETE /api/projects/{id}
/// Tasks and project links go with the project.
pub async fn delete_project(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Project::delete(&deployment.db().pool, id).await?;
    if rows_affected == 0 {
        return Err(ApiError::not_found("Project not found"));
    }
    tracing::info!(project_id = id, "Deleted project");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/projects", get(get_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
}
