use axum::{Router, extract::State, response::Json as ResponseJson, routing::{get, put}};
use db::models::{
    project::Project,
    task::{CreateTask, Task, TaskFilter, TaskWithProject, UpdateTask, UpdateTaskStatus},
};
use deployment::Deployment;
use sqlx::SqlitePool;
use utils::response::ApiResponse;

use super::require;
use crate::{DeploymentImpl, error::ApiError, extract::{Json, Path, Query}};

async fn ensure_project(pool: &SqlitePool, project_id: i32) -> Result<(), ApiError> {
    if Project::find_by_id(pool, project_id).await?.is_none() {
        return Err(ApiError::bad_request(format!(
            "Project {project_id} does not exist"
        )));
    }
    Ok(())
}

async fn with_project(pool: &SqlitePool, id: i32) -> Result<TaskWithProject, ApiError> {
    Task::find_with_project(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

/// GET /api/tasks
pub async fn get_tasks(
    State(deployment): State<DeploymentImpl>,
    Query(filter): Query<TaskFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskWithProject>>>, ApiError> {
    let tasks = Task::find_all_with_project(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<TaskWithProject>>, ApiError> {
    let task = with_project(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

/// POST /api/tasks
pub async fn create_task(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateTask>,
) -> Result<ResponseJson<ApiResponse<TaskWithProject>>, ApiError> {
    require(&payload.task_name, "Task name is required")?;
    let pool = &deployment.db().pool;
    ensure_project(pool, payload.project_id).await?;

    let task = Task::create(pool, &payload).await?;
    tracing::info!(
        task_id = task.id,
        project_id = task.project_id,
        due_date = ?task.due_date,
        "Created task"
    );
    let task = with_project(pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

/// PUT /api/tasks/{id}
pub async fn update_task(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<TaskWithProject>>, ApiError> {
    let pool = &deployment.db().pool;
    let existing = Task::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    if let Some(task_name) = &payload.task_name {
        require(task_name, "Task name is required")?;
    }
    if let Some(project_id) = payload.project_id {
        ensure_project(pool, project_id).await?;
    }

    let task = payload.apply_to(existing);
    Task::update(pool, &task).await?;
    let task = with_project(pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

/// PUT /api/tasks/{id}/status
pub async fn update_task_status(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTaskStatus>,
) -> Result<ResponseJson<ApiResponse<TaskWithProject>>, ApiError> {
    let pool = &deployment.db().pool;
    Task::update_status(pool, id, payload.status)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    tracing::debug!(task_id = id, status = %payload.status, "Task status changed");
    let task = with_project(pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Task::delete(&deployment.db().pool, id).await?;
    if rows_affected == 0 {
        return Err(ApiError::not_found("Task not found"));
    }
    tracing::info!(task_id = id, "Deleted task");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/tasks", get(get_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/status", put(update_task_status))
}
