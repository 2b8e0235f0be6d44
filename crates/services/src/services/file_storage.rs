//! Uploaded file storage.
//!
//! Blobs are addressed by a *key*: a relative path such as
//! `papers/5f0c…_survey.pdf`. Entity rows store the key in `file_path` and the
//! server resolves it again for `/api/view` and `/api/download`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tokio::fs::File;
use ts_rs::TS;
use uuid::Uuid;

use db::models::material::MaterialFileType;
use utils::file::{format_file_size, sanitize_file_name};

const MB: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unknown upload category: {0}")]
    UnknownCategory(String),
    #[error("{mime} files are not accepted for {category} uploads")]
    UnsupportedType {
        category: UploadCategory,
        mime: String,
    },
    #[error("file is too large: {size} exceeds the {limit} limit for {kind} files")]
    TooLarge {
        kind: &'static str,
        size: String,
        limit: String,
    },
    #[error("uploaded file is empty")]
    Empty,
    #[error("invalid file path: {0}")]
    InvalidKey(String),
    #[error("file not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UploadCategory {
    Papers,
    Materials,
    Experts,
}

/// One accepted kind of file within a category.
#[derive(Debug)]
pub struct UploadRule {
    pub kind: &'static str,
    mime_types: &'static [&'static str],
    pub max_bytes: u64,
}

impl UploadRule {
    fn matches(&self, mime: &str) -> bool {
        self.mime_types.iter().any(|pattern| match pattern.strip_suffix("/*") {
            Some(top) => mime.split('/').next() == Some(top),
            None => *pattern == mime,
        })
    }
}

const WORD_TYPES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

static PAPER_RULES: &[UploadRule] = &[UploadRule {
    kind: "pdf",
    mime_types: &["application/pdf"],
    max_bytes: 20 * MB,
}];

static MATERIAL_RULES: &[UploadRule] = &[
    UploadRule { kind: "image", mime_types: &["image/*"], max_bytes: 10 * MB },
    UploadRule { kind: "pdf", mime_types: &["application/pdf"], max_bytes: 20 * MB },
    UploadRule { kind: "word", mime_types: WORD_TYPES, max_bytes: 10 * MB },
    UploadRule { kind: "text", mime_types: &["text/plain"], max_bytes: 5 * MB },
    UploadRule { kind: "audio", mime_types: &["audio/*"], max_bytes: 50 * MB },
    UploadRule { kind: "video", mime_types: &["video/*"], max_bytes: 100 * MB },
    UploadRule {
        kind: "archive",
        mime_types: &[
            "application/zip",
            "application/x-zip-compressed",
            "application/x-rar-compressed",
            "application/vnd.rar",
        ],
        max_bytes: 50 * MB,
    },
];

static EXPERT_RULES: &[UploadRule] = &[
    UploadRule { kind: "image", mime_types: &["image/*"], max_bytes: 5 * MB },
    UploadRule { kind: "pdf", mime_types: &["application/pdf"], max_bytes: 10 * MB },
    UploadRule { kind: "word", mime_types: WORD_TYPES, max_bytes: 10 * MB },
    UploadRule { kind: "text", mime_types: &["text/plain"], max_bytes: 5 * MB },
];

impl UploadCategory {
    pub fn rules(self) -> &'static [UploadRule] {
        match self {
            UploadCategory::Papers => PAPER_RULES,
            UploadCategory::Materials => MATERIAL_RULES,
            UploadCategory::Experts => EXPERT_RULES,
        }
    }

    /// Check `mime` and `size` against this category's rules.
    pub fn check(self, mime: &str, size: u64) -> Result<&'static UploadRule, StorageError> {
        let mime = mime.split(';').next().unwrap_or(mime).trim();
        let rule = self
            .rules()
            .iter()
            .find(|rule| rule.matches(mime))
            .ok_or_else(|| StorageError::UnsupportedType {
                category: self,
                mime: mime.to_string(),
            })?;
        if size == 0 {
            return Err(StorageError::Empty);
        }
        if size > rule.max_bytes {
            return Err(StorageError::TooLarge {
                kind: rule.kind,
                size: format_file_size(size),
                limit: format_file_size(rule.max_bytes),
            });
        }
        Ok(rule)
    }
}

/// The MIME type to judge an upload by. Browsers often send
/// `application/octet-stream`, so the file name wins in that case.
pub fn upload_mime(file_name: &str, declared: Option<&str>) -> String {
    match declared.map(str::trim) {
        Some(declared) if !declared.is_empty() && declared != "application/octet-stream" => {
            declared.to_string()
        }
        _ => mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

/// `Content-Type` header value for serving a stored file.
pub fn content_type_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("hwp") => "application/vnd.hancom.hwp".to_string(),
        Some("hwpx") => "application/vnd.hancom.hwpx".to_string(),
        _ => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            if mime.type_() == mime_guess::mime::TEXT
                || mime.essence_str() == "application/json"
                || mime.essence_str() == "application/javascript"
            {
                format!("{}; charset=utf-8", mime.essence_str())
            } else {
                mime.essence_str().to_string()
            }
        }
    }
}

/// What an upload returns to the client.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredBlob {
    pub key: String,
    pub url: String,
    pub file_name: String,
    #[ts(type = "number")]
    pub size: u64,
    pub file_size: String,
    pub file_type: MaterialFileType,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(
        &self,
        category: UploadCategory,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, StorageError>;

    /// Open a stored blob for streaming, with its length.
    async fn open(&self, key: &str) -> Result<(File, u64), StorageError>;

    /// Returns `false` when nothing was stored under `key`.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Map a key to its on-disk location, refusing keys that leave the store.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError>;

    /// Whether `value` looks like a key this store handed out.
    fn owns(&self, value: &str) -> bool {
        self.resolve(value).is_ok()
    }
}

/// Blob store rooted at a local directory, normally `<asset_dir>/uploads`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Keys are `<category>/<name>` made of plain relative components.
fn validate_key(key: &str) -> Result<&Path, StorageError> {
    let trimmed = key.trim();
    if trimmed.is_empty() || trimmed.contains('\\') || trimmed.contains('\0') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    let path = Path::new(trimmed);
    let plain = path
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    let in_category = path
        .components()
        .next()
        .and_then(|c| c.as_os_str().to_str())
        .is_some_and(|first| first.parse::<UploadCategory>().is_ok());
    if !plain || !in_category || path.components().count() < 2 {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(path)
}

pub fn view_url(key: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
    format!("/api/view?path={encoded}")
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        category: UploadCategory,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, StorageError> {
        let safe_name = sanitize_file_name(file_name);
        let key = format!("{category}/{}_{safe_name}", Uuid::new_v4().simple());
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        let size = bytes.len() as u64;
        tracing::info!(key = %key, size, "Stored upload");
        Ok(StoredBlob {
            url: view_url(&key),
            key,
            file_name: file_name.to_string(),
            size,
            file_size: format_file_size(size),
            file_type: MaterialFileType::from_file_name(file_name),
        })
    }

    async fn open(&self, key: &str) -> Result<(File, u64), StorageError> {
        let path = self.resolve(key)?;
        match File::open(&path).await {
            Ok(file) => {
                let len = file.metadata().await?.len();
                Ok((file, len))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(key = %key, "Deleted upload");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = validate_key(key)?;
        Ok(self.root.join(relative))
    }
}
