use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::note::{CreateNote, Note, NoteFilter, UpdateNote};
use deployment::Deployment;
use utils::response::ApiResponse;

use super::require;
use crate::{DeploymentImpl, error::ApiError, extract::{Json, Path, Query}};

async fn load(deployment: &DeploymentImpl, id: i32) -> Result<Note, ApiError> {
    Note::find_by_id(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Note not found"))
}

/// GET /api/notes
pub async fn get_notes(
    State(deployment): State<DeploymentImpl>,
    Query(filter): Query<NoteFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<Note>>>, ApiError> {
    let notes = Note::find_all(&deployment.db().pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(notes)))
}

/// GET /api/notes/{id}
pub async fn get_note(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<Note>>, ApiError> {
    let note = load(&deployment, id).await?;
    Ok(ResponseJson(ApiResponse::success(note)))
}

/// POST /api/notes
pub async fn create_note(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateNote>,
) -> Result<ResponseJson<ApiResponse<Note>>, ApiError> {
    require(&payload.title, "Title is required")?;

    let note = Note::create(&deployment.db().pool, &payload).await?;
    tracing::info!(note_id = note.id, "Created note");
    Ok(ResponseJson(ApiResponse::success(note)))
}

/// PUT /api/notes/{id}
pub async fn update_note(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateNote>,
) -> Result<ResponseJson<ApiResponse<Note>>, ApiError> {
    let existing = load(&deployment, id).await?;
    if let Some(title) = &payload.title {
        require(title, "Title is required")?;
    }

    let title = payload.title.as_deref().unwrap_or(&existing.title);
    let content = payload.content.as_deref().unwrap_or(&existing.content);
    let tags = payload.tags.as_deref().unwrap_or(existing.tags.0.as_slice());

    let note = Note::update(&deployment.db().pool, id, title, content, tags).await?;
    Ok(ResponseJson(ApiResponse::success(note)))
}

/// DELETE /api/notes/{id}
pub async fn delete_note(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Note::delete(&deployment.db().pool, id).await?;
    if rows_affected == 0 {
        return Err(ApiError::not_found("Note not found"));
    }
    tracing::info!(note_id = id, "Deleted note");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/notes", get(get_notes).post(create_note))
        .route("/notes/{id}", get(get_note).put(update_note).delete(delete_note))
}
