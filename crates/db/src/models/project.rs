use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

use super::{
    expert::Expert,
    material::Material,
    paper::Paper,
    project_link::{self, ProjectLink},
    task::Task,
};

const PROJECT_COLUMNS: &str = "id, project_name, description, created_at, updated_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i32,
    pub project_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A project with everything hanging off it, as the schedule view consumes it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProjectWithRelations {
    #[serde(flatten)]
    #[ts(flatten)]
    pub project: Project,
    pub tasks: Vec<Task>,
    pub papers: Vec<Paper>,
    pub experts: Vec<Expert>,
    pub materials: Vec<Material>,
}

impl std::ops::Deref for ProjectWithRelations {
    type Target = Project;
    fn deref(&self) -> &Self::Target {
        &self.project
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    #[serde(default)]
    pub project_name: String,
    pub description: Option<String>,
}

impl CreateProject {
    pub fn named(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    pub project_name: Option<String>,
    pub description: Option<String>,
}

impl Project {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Project>(&sql).fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all_with_relations(
        pool: &SqlitePool,
    ) -> Result<Vec<ProjectWithRelations>, sqlx::Error> {
        let projects = Self::find_all(pool).await?;
        let mut tasks = Task::find_grouped_by_project(pool, None).await?;
        let mut papers =
            project_link::entities_by_project::<Paper>(pool, ProjectLink::Paper, None).await?;
        let mut experts =
            project_link::entities_by_project::<Expert>(pool, ProjectLink::Expert, None).await?;
        let mut materials =
            project_link::entities_by_project::<Material>(pool, ProjectLink::Material, None)
                .await?;

        Ok(projects
            .into_iter()
            .map(|project| {
                let id = project.id;
                ProjectWithRelations {
                    project,
                    tasks: tasks.remove(&id).unwrap_or_default(),
                    papers: papers.remove(&id).unwrap_or_default(),
                    experts: experts.remove(&id).unwrap_or_default(),
                    materials: materials.remove(&id).unwrap_or_default(),
                }
            })
            .collect())
    }

    pub async fn find_with_relations(
        pool: &SqlitePool,
        id: i32,
    ) -> Result<Option<ProjectWithRelations>, sqlx::Error> {
        let Some(project) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let tasks = take(Task::find_grouped_by_project(pool, Some(id)).await?, id);
        let papers = take(
            project_link::entities_by_project::<Paper>(pool, ProjectLink::Paper, Some(id)).await?,
            id,
        );
        let experts = take(
            project_link::entities_by_project::<Expert>(pool, ProjectLink::Expert, Some(id))
                .await?,
            id,
        );
        let materials = take(
            project_link::entities_by_project::<Material>(pool, ProjectLink::Material, Some(id))
                .await?,
            id,
        );

        Ok(Some(ProjectWithRelations {
            project,
            tasks,
            papers,
            experts,
            materials,
        }))
    }

    pub async fn create(pool: &SqlitePool, data: &CreateProject) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO projects (project_name, description) VALUES ($1, $2) RETURNING {PROJECT_COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&sql)
            .bind(data.project_name.trim())
            .bind(&data.description)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i32,
        project_name: &str,
        description: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"UPDATE projects
               SET project_name = $2, description = $3, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {PROJECT_COLUMNS}"#
        );
        sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(project_name.trim())
            .bind(description)
            .fetch_one(pool)
            .await
    }

    /// Deletes the project. Its tasks and link rows go with it through `ON DELETE CASCADE`.
    pub async fn delete<'e, E>(executor: E, id: i32) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Project names keyed by id, for labelling tasks and notifications.
    pub async fn names_by_id(pool: &SqlitePool) -> Result<HashMap<i32, String>, sqlx::Error> {
        let rows: Vec<(i32, String)> = sqlx::query_as("SELECT id, project_name FROM projects")
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().collect())
    }
}

fn take<T>(mut grouped: HashMap<i32, Vec<T>>, id: i32) -> Vec<T> {
    grouped.remove(&id).unwrap_or_default()
}
