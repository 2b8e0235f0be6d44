use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

use super::project_link::{self, ProjectLink, ProjectSummary};

const EXPERT_COLUMNS: &str = "id, name, affiliation, expertise, email, phone, notes, file_path, file_name, file_size, created_at, updated_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Expert {
    pub id: i32,
    pub name: String,
    pub affiliation: Option<String>,
    pub expertise: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ExpertWithProjects {
    #[serde(flatten)]
    #[ts(flatten)]
    pub expert: Expert,
    pub projects: Vec<ProjectSummary>,
}

impl std::ops::Deref for ExpertWithProjects {
    type Target = Expert;
    fn deref(&self) -> &Self::Target {
        &self.expert
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpert {
    #[serde(default)]
    pub name: String,
    pub affiliation: Option<String>,
    pub expertise: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    #[serde_as(as = "Option<Vec<PickFirst<(_, DisplayFromStr)>>>")]
    #[ts(as = "Option<Vec<i32>>")]
    #[serde(default)]
    pub project_ids: Option<Vec<i32>>,
}

impl CreateExpert {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpert {
    pub name: Option<String>,
    pub affiliation: Option<String>,
    pub expertise: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    #[serde_as(as = "Option<Vec<PickFirst<(_, DisplayFromStr)>>>")]
    #[ts(as = "Option<Vec<i32>>")]
    #[serde(default)]
    pub project_ids: Option<Vec<i32>>,
}

impl UpdateExpert {
    pub fn apply_to(&self, existing: Expert) -> Expert {
        Expert {
            name: self.name.clone().unwrap_or(existing.name),
            affiliation: self.affiliation.clone().or(existing.affiliation),
            expertise: self.expertise.clone().or(existing.expertise),
            email: self.email.clone().or(existing.email),
            phone: self.phone.clone().or(existing.phone),
            notes: self.notes.clone().or(existing.notes),
            file_path: self.file_path.clone().or(existing.file_path),
            file_name: self.file_name.clone().or(existing.file_name),
            file_size: self.file_size.clone().or(existing.file_size),
            ..existing
        }
    }
}

/// Blank optional strings from form submissions are stored as NULL.
fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Expert {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<ExpertWithProjects>, sqlx::Error> {
        let sql = format!("SELECT {EXPERT_COLUMNS} FROM experts ORDER BY created_at DESC, id DESC");
        let experts = sqlx::query_as::<_, Expert>(&sql).fetch_all(pool).await?;

        let mut links = project_link::projects_by_entity(pool, ProjectLink::Expert).await?;
        Ok(experts
            .into_iter()
            .map(|expert| {
                let projects = links.remove(&expert.id).unwrap_or_default();
                ExpertWithProjects { expert, projects }
            })
            .collect())
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {EXPERT_COLUMNS} FROM experts WHERE id = $1");
        sqlx::query_as::<_, Expert>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_with_projects(
        pool: &SqlitePool,
        id: i32,
    ) -> Result<Option<ExpertWithProjects>, sqlx::Error> {
        let Some(expert) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let projects = project_link::projects_for(pool, ProjectLink::Expert, id).await?;
        Ok(Some(ExpertWithProjects { expert, projects }))
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateExpert,
    ) -> Result<ExpertWithProjects, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            r#"INSERT INTO experts (name, affiliation, expertise, email, phone, notes, file_path, file_name, file_size)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING {EXPERT_COLUMNS}"#
        );
        let expert = sqlx::query_as::<_, Expert>(&sql)
            .bind(data.name.trim())
            .bind(blank_to_none(&data.affiliation))
            .bind(blank_to_none(&data.expertise))
            .bind(blank_to_none(&data.email))
            .bind(blank_to_none(&data.phone))
            .bind(blank_to_none(&data.notes))
            .bind(blank_to_none(&data.file_path))
            .bind(blank_to_none(&data.file_name))
            .bind(blank_to_none(&data.file_size))
            .fetch_one(&mut *tx)
            .await?;

        if let Some(project_ids) = &data.project_ids {
            project_link::connect(&mut tx, ProjectLink::Expert, expert.id, project_ids).await?;
        }
        tx.commit().await?;

        let projects = project_link::projects_for(pool, ProjectLink::Expert, expert.id).await?;
        Ok(ExpertWithProjects { expert, projects })
    }

    pub async fn update(
        pool: &SqlitePool,
        expert: &Expert,
        project_ids: Option<&[i32]>,
    ) -> Result<ExpertWithProjects, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            r#"UPDATE experts
               SET name = $2, affiliation = $3, expertise = $4, email = $5, phone = $6,
                   notes = $7, file_path = $8, file_name = $9, file_size = $10,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {EXPERT_COLUMNS}"#
        );
        let updated = sqlx::query_as::<_, Expert>(&sql)
            .bind(expert.id)
            .bind(expert.name.trim())
            .bind(blank_to_none(&expert.affiliation))
            .bind(blank_to_none(&expert.expertise))
            .bind(blank_to_none(&expert.email))
            .bind(blank_to_none(&expert.phone))
            .bind(blank_to_none(&expert.notes))
            .bind(blank_to_none(&expert.file_path))
            .bind(blank_to_none(&expert.file_name))
            .bind(blank_to_none(&expert.file_size))
            .fetch_one(&mut *tx)
            .await?;

        if let Some(project_ids) = project_ids {
            project_link::set(&mut tx, ProjectLink::Expert, updated.id, project_ids).await?;
        }
        tx.commit().await?;

        let projects = project_link::projects_for(pool, ProjectLink::Expert, updated.id).await?;
        Ok(ExpertWithProjects {
            expert: updated,
            projects,
        })
    }

    pub async fn delete(pool: &SqlitePool, id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM experts WHERE id = $1")
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

    #[tokio::test]
    async fn blank_contact_fields_become_null() {
        let pool = test_support::pool().await;
        let created = Expert::create(
            &pool,
            &CreateExpert {
                affiliation: Some("Press Foundation".into()),
                email: Some("   ".into()),
                ..CreateExpert::named("Dr. Choi")
            },
        )
        .await
        .unwrap();
        assert_eq!(created.affiliation.as_deref(), Some("Press Foundation"));
        assert_eq!(created.email, None);
        assert!(created.projects.is_empty());
    }

    #[tokio::test]
    async fn update_with_project_ids_replaces_links() {
        let pool = test_support::pool().await;
        let a = Project::create(&pool, &CreateProject::named("A")).await.unwrap();
        let b = Project::create(&pool, &CreateProject::named("B")).await.unwrap();
        let created = Expert::create(
            &pool,
            &CreateExpert {
                project_ids: Some(vec![a.id, b.id]),
                ..CreateExpert::named("Dr. Choi")
            },
        )
        .await
        .unwrap();
        assert_eq!(created.projects.len(), 2);

        let patch = UpdateExpert {
            expertise: Some("media law".into()),
            project_ids: Some(vec![b.id]),
            ..Default::default()
        };
        let merged = patch.apply_to(created.expert.clone());
        let updated = Expert::update(&pool, &merged, patch.project_ids.as_deref())
            .await
            .unwrap();
        assert_eq!(updated.expertise.as_deref(), Some("media law"));
        assert_eq!(updated.projects.len(), 1);
        assert_eq!(updated.projects[0].id, b.id);

        let listed = Expert::find_all(&pool).await.unwrap();
        assert_eq!(listed[0].projects[0].project_name, "B");
    }
}
