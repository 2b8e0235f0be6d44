use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use sqlx::{FromRow, SqlitePool, Type, types::Json};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use super::{
    note::normalize_tags,
    project_link::{self, ProjectLink, ProjectSummary},
};

const MATERIAL_COLUMNS: &str =
    "id, title, description, file_type, file_path, file_name, file_size, tags, created_at, updated_at";

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "material_file_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MaterialFileType {
    Image,
    Video,
    Audio,
    Archive,
    Document,
    #[default]
    Other,
}

impl MaterialFileType {
    /// Classify by extension; anything unrecognised is `Other`.
    pub fn from_file_name(file_name: &str) -> Self {
        let Some(ext) = utils::file::extension(file_name) else {
            return Self::Other;
        };
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" => Self::Image,
            "mp4" | "avi" | "mov" | "wmv" | "flv" | "webm" | "mkv" => Self::Video,
            "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" => Self::Audio,
            "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" => Self::Archive,
            "pdf" | "doc" | "docx" | "txt" | "rtf" | "odt" | "hwp" | "hwpx" => Self::Document,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub file_type: MaterialFileType,
    pub file_path: String,
    pub file_name: String,
    pub file_size: Option<String>,
    #[ts(type = "Array<string>")]
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MaterialWithProjects {
    #[serde(flatten)]
    #[ts(flatten)]
    pub material: Material,
    pub projects: Vec<ProjectSummary>,
}

impl std::ops::Deref for MaterialWithProjects {
    type Target = Material;
    fn deref(&self) -> &Self::Target {
        &self.material
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterial {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    /// Inferred from `file_name` when omitted.
    pub file_type: Option<MaterialFileType>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde_as(as = "Option<Vec<PickFirst<(_, DisplayFromStr)>>>")]
    #[ts(as = "Option<Vec<i32>>")]
    #[serde(default)]
    pub project_ids: Option<Vec<i32>>,
}

impl CreateMaterial {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    fn resolved_file_type(&self) -> MaterialFileType {
        self.file_type.unwrap_or_else(|| {
            self.file_name
                .as_deref()
                .map(MaterialFileType::from_file_name)
                .unwrap_or_default()
        })
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaterial {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_type: Option<MaterialFileType>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde_as(as = "Option<Vec<PickFirst<(_, DisplayFromStr)>>>")]
    #[ts(as = "Option<Vec<i32>>")]
    #[serde(default)]
    pub project_ids: Option<Vec<i32>>,
}

impl UpdateMaterial {
    pub fn apply_to(&self, existing: Material) -> Material {
        // A replaced file without an explicit type gets reclassified.
        let file_type = match (self.file_type, &self.file_name) {
            (Some(file_type), _) => file_type,
            (None, Some(name)) => MaterialFileType::from_file_name(name),
            (None, None) => existing.file_type,
        };
        Material {
            title: self.title.clone().unwrap_or(existing.title),
            description: self.description.clone().or(existing.description),
            file_type,
            file_path: self.file_path.clone().unwrap_or(existing.file_path),
            file_name: self.file_name.clone().unwrap_or(existing.file_name),
            file_size: self.file_size.clone().or(existing.file_size),
            tags: self.tags.clone().map(Json).unwrap_or(existing.tags),
            ..existing
        }
    }
}

impl Material {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<MaterialWithProjects>, sqlx::Error> {
        let sql =
            format!("SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY created_at DESC, id DESC");
        let materials = sqlx::query_as::<_, Material>(&sql).fetch_all(pool).await?;

        let mut links = project_link::projects_by_entity(pool, ProjectLink::Material).await?;
        Ok(materials
            .into_iter()
            .map(|material| {
                let projects = links.remove(&material.id).unwrap_or_default();
                MaterialWithProjects { material, projects }
            })
            .collect())
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1");
        sqlx::query_as::<_, Material>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_with_projects(
        pool: &SqlitePool,
        id: i32,
    ) -> Result<Option<MaterialWithProjects>, sqlx::Error> {
        let Some(material) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let projects = project_link::projects_for(pool, ProjectLink::Material, id).await?;
        Ok(Some(MaterialWithProjects { material, projects }))
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateMaterial,
    ) -> Result<MaterialWithProjects, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            r#"INSERT INTO materials (title, description, file_type, file_path, file_name, file_size, tags)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {MATERIAL_COLUMNS}"#
        );
        let material = sqlx::query_as::<_, Material>(&sql)
            .bind(data.title.trim())
            .bind(&data.description)
            .bind(data.resolved_file_type())
            .bind(data.file_path.as_deref().unwrap_or_default())
            .bind(data.file_name.as_deref().unwrap_or_default())
            .bind(&data.file_size)
            .bind(Json(normalize_tags(&data.tags)))
            .fetch_one(&mut *tx)
            .await?;

        if let Some(project_ids) = &data.project_ids {
            project_link::connect(&mut tx, ProjectLink::Material, material.id, project_ids).await?;
        }
        tx.commit().await?;

        let projects = project_link::projects_for(pool, ProjectLink::Material, material.id).await?;
        Ok(MaterialWithProjects { material, projects })
    }

    pub async fn update(
        pool: &SqlitePool,
        material: &Material,
        project_ids: Option<&[i32]>,
    ) -> Result<MaterialWithProjects, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            r#"UPDATE materials
               SET title = $2, description = $3, file_type = $4, file_path = $5,
                   file_name = $6, file_size = $7, tags = $8,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {MATERIAL_COLUMNS}"#
        );
        let updated = sqlx::query_as::<_, Material>(&sql)
            .bind(material.id)
            .bind(material.title.trim())
            .bind(&material.description)
            .bind(material.file_type)
            .bind(&material.file_path)
            .bind(&material.file_name)
            .bind(&material.file_size)
            .bind(Json(normalize_tags(&material.tags)))
            .fetch_one(&mut *tx)
            .await?;

        if let Some(project_ids) = project_ids {
            project_link::set(&mut tx, ProjectLink::Material, updated.id, project_ids).await?;
        }
        tx.commit().await?;

        let projects = project_link::projects_for(pool, ProjectLink::Material, updated.id).await?;
        Ok(MaterialWithProjects {
            material: updated,
            projects,
        })
    }

    pub async fn delete(pool: &SqlitePool, id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        project::{CreateProject, Project},
        test_support,
    };

    #[test]
    fn classifies_by_extension() {
        assert_eq!(MaterialFileType::from_file_name("scan.JPG"), MaterialFileType::Image);
        assert_eq!(MaterialFileType::from_file_name("talk.mkv"), MaterialFileType::Video);
        assert_eq!(MaterialFileType::from_file_name("interview.mp3"), MaterialFileType::Audio);
        assert_eq!(MaterialFileType::from_file_name("dataset.tar.gz"), MaterialFileType::Archive);
        assert_eq!(MaterialFileType::from_file_name("report.hwp"), MaterialFileType::Document);
        assert_eq!(MaterialFileType::from_file_name("README"), MaterialFileType::Other);
        assert_eq!(MaterialFileType::from_file_name("model.stl"), MaterialFileType::Other);
    }

    #[tokio::test]
    async fn create_infers_type_and_defaults_paths() {
        let pool = test_support::pool().await;
        let project = Project::create(&pool, &CreateProject::named("Archive")).await.unwrap();

        let created = Material::create(
            &pool,
            &CreateMaterial {
                file_name: Some("interview.wav".into()),
                tags: vec!["audio".into(), " audio ".into()],
                project_ids: Some(vec![project.id]),
                ..CreateMaterial::titled("Interview recording")
            },
        )
        .await
        .unwrap();
        assert_eq!(created.file_type, MaterialFileType::Audio);
        assert_eq!(created.file_path, "");
        assert_eq!(created.tags.0, vec!["audio"]);
        assert_eq!(created.projects[0].id, project.id);

        let bare = Material::create(&pool, &CreateMaterial::titled("Notes")).await.unwrap();
        assert_eq!(bare.file_type, MaterialFileType::Other);
        assert_eq!(bare.file_name, "");
    }

    #[tokio::test]
    async fn update_reclassifies_replaced_file() {
        let pool = test_support::pool().await;
        let created = Material::create(
            &pool,
            &CreateMaterial {
                file_name: Some("photo.png".into()),
                ..CreateMaterial::titled("Figure")
            },
        )
        .await
        .unwrap();

        let patch = UpdateMaterial {
            file_name: Some("figure.pdf".into()),
            ..Default::default()
        };
        let updated = Material::update(&pool, &patch.apply_to(created.material.clone()), None)
            .await
            .unwrap();
        assert_eq!(updated.file_type, MaterialFileType::Document);
        assert_eq!(updated.title, "Figure");

        assert_eq!(Material::delete(&pool, updated.id).await.unwrap(), 1);
        assert!(Material::find_with_projects(&pool, updated.id).await.unwrap().is_none());
    }
}
