use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::material::{CreateMaterial, Material, MaterialWithProjects, UpdateMaterial};
use deployment::Deployment;
use utils::response::ApiResponse;

use super::{ensure_projects_exist, remove_stored_file, require};
use crate::{DeploymentImpl, error::ApiError, extract::{Json, Path}};

/// GET /api/materials
pub async fn get_materials(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<MaterialWithProjects>>>, ApiError> {
    let materials = Material::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(materials)))
}

/// GET /api/materials/{id}
pub async fn get_material(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<MaterialWithProjects>>, ApiError> {
    let material = Material::find_with_projects(&deployment.db().pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Material not found"))?;
    Ok(ResponseJson(ApiResponse::success(material)))
}

/// POST /api/materials
/// The file type is inferred from `fileName` when the body leaves it out.
pub async fn create_material(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateMaterial>,
) -> Result<ResponseJson<ApiResponse<MaterialWithProjects>>, ApiError> {
    require(&payload.title, "Title is required")?;
    let pool = &deployment.db().pool;
    if let Some(project_ids) = &payload.project_ids {
        ensure_projects_exist(pool, project_ids).await?;
    }

    let material = Material::create(pool, &payload).await?;
    tracing::info!(
        material_id = material.id,
        file_type = %material.file_type,
        "Created material"
    );
    Ok(ResponseJson(ApiResponse::success(material)))
}

/// PUT /api/materials/{id}
pub async fn update_material(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateMaterial>,
) -> Result<ResponseJson<ApiResponse<MaterialWithProjects>>, ApiError> {
    let pool = &deployment.db().pool;
    let existing = Material::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Material not found"))?;
    if let Some(title) = &payload.title {
        require(title, "Title is required")?;
    }
    if let Some(project_ids) = &payload.project_ids {
        ensure_projects_exist(pool, project_ids).await?;
    }

    let material = payload.apply_to(existing);
    let updated = Material::update(pool, &material, payload.project_ids.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// DELETE /api/materials/{id}
pub async fn delete_material(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let pool = &deployment.db().pool;
    let material = Material::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Material not found"))?;

    Material::delete(pool, id).await?;
    remove_stored_file(&deployment, Some(material.file_path.as_str())).await;
    tracing::info!(material_id = id, "Deleted material");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/materials", get(get_materials).post(create_material))
        .route(
            "/materials/{id}",
            get(get_material).put(update_material).delete(delete_material),
        )
}
