//! Uploads and serving of stored files.

use std::path::Path as FsPath;

use axum::{
    Router,
    body::Body,
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::{get, post},
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::file_storage::{
    StorageError, StoredBlob, UploadCategory, content_type_for, upload_mime,
};
use tokio_util::io::ReaderStream;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, extract::{Path, Query}};

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub path: Option<String>,
}

impl FileQuery {
    fn key(&self) -> Result<&str, ApiError> {
        self.path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::bad_request("File path is required"))
    }
}

#[derive(Clone, Copy)]
enum Disposition {
    Inline,
    Attachment,
}

/// POST /api/uploads/{category}
/// Accepts a multipart body with a single `file` field.
pub async fn upload_file(
    State(deployment): State<DeploymentImpl>,
    Path(category): Path<String>,
    mut multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<StoredBlob>>, ApiError> {
    let category: UploadCategory = category
        .parse()
        .map_err(|_| StorageError::UnknownCategory(category.clone()))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Uploaded file has no name"))?;
        let declared = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        upload = Some((file_name, declared, data));
        break;
    }
    let (file_name, declared, data) =
        upload.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    if data.is_empty() {
        return Err(StorageError::Empty.into());
    }

    let mime = upload_mime(&file_name, declared.as_deref());
    let rule = category.check(&mime, data.len() as u64)?;
    tracing::debug!(%category, kind = rule.kind, %mime, size = data.len(), "Upload accepted");

    let blob = deployment.storage().put(category, &file_name, &data).await?;
    Ok(ResponseJson(ApiResponse::success(blob)))
}

/// GET /api/view?path=
pub async fn view_file(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    serve(&deployment, query.key()?, Disposition::Inline).await
}

/// GET /api/download?path=
pub async fn download_file(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    serve(&deployment, query.key()?, Disposition::Attachment).await
}

async fn serve(
    deployment: &DeploymentImpl,
    key: &str,
    disposition: Disposition,
) -> Result<Response, ApiError> {
    let storage = deployment.storage();
    let path = storage.resolve(key)?;
    let (file, len) = storage.open(key).await?;

    let content_type = content_type_for(&path);
    let name = display_name(&path);
    let body = Body::from_stream(ReaderStream::new(file));

    let response = match disposition {
        Disposition::Inline => (
            [
                (header::CONTENT_TYPE, content_type),
                (header::CONTENT_LENGTH, len.to_string()),
                (header::CONTENT_DISPOSITION, content_disposition("inline", &name)),
                (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
            ],
            body,
        )
            .into_response(),
        Disposition::Attachment => (
            [
                (header::CONTENT_TYPE, content_type),
                (header::CONTENT_LENGTH, len.to_string()),
                (header::CONTENT_DISPOSITION, content_disposition("attachment", &name)),
            ],
            body,
        )
            .into_response(),
    };
    Ok(response)
}

/// The client-facing file name: the stored name without its `<uuid>_` prefix.
fn display_name(path: &FsPath) -> String {
    let stored = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    match stored.split_once('_') {
        Some((prefix, rest))
            if prefix.len() == 32 && prefix.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            rest.to_string()
        }
        _ => stored.to_string(),
    }
}

fn content_disposition(kind: &str, file_name: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(file_name.as_bytes()).collect();
    format!(
        "{kind}; filename*=UTF-8''{}",
        encoded.replace('+', "%20")
    )
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/uploads/{category}", post(upload_file))
        .route("/view", get(view_file))
        .route("/download", get(download_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_drops_storage_prefix() {
        assert_eq!(
            display_name(FsPath::new(
                "papers/0123456789abcdef0123456789abcdef_survey.pdf"
            )),
            "survey.pdf"
        );
        assert_eq!(display_name(FsPath::new("papers/my_notes.txt")), "my_notes.txt");
    }

    #[test]
    fn disposition_percent_encodes_names() {
        assert_eq!(
            content_disposition("attachment", "연구 노트.hwp"),
            "attachment; filename*=UTF-8''%EC%97%B0%EA%B5%AC%20%EB%85%B8%ED%8A%B8.hwp"
        );
    }
}
