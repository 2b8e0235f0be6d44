use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use utils::text::SearchTerm;

use super::project_link::{self, ProjectLink, ProjectSummary};

const PAPER_COLUMNS: &str =
    "id, title, authors, year, publisher, notes, file_path, file_name, file_size, created_at, updated_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub id: i32,
    pub title: String,
    pub authors: Option<String>,
    pub year: Option<i32>,
    pub publisher: Option<String>,
    pub notes: Option<String>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PaperWithProjects {
    #[serde(flatten)]
    #[ts(flatten)]
    pub paper: Paper,
    pub projects: Vec<ProjectSummary>,
}

impl std::ops::Deref for PaperWithProjects {
    type Target = Paper;
    fn deref(&self) -> &Self::Target {
        &self.paper
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaper {
    #[serde(default)]
    pub title: String,
    pub authors: Option<String>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[ts(as = "Option<i32>")]
    #[serde(default)]
    pub year: Option<i32>,
    pub publisher: Option<String>,
    pub notes: Option<String>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    #[serde_as(as = "Option<Vec<PickFirst<(_, DisplayFromStr)>>>")]
    #[ts(as = "Option<Vec<i32>>")]
    #[serde(default)]
    pub project_ids: Option<Vec<i32>>,
}

impl CreatePaper {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaper {
    pub title: Option<String>,
    pub authors: Option<String>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[ts(as = "Option<i32>")]
    #[serde(default)]
    pub year: Option<i32>,
    pub publisher: Option<String>,
    pub notes: Option<String>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    /// When present, replaces the linked projects. When absent, links are untouched.
    #[serde_as(as = "Option<Vec<PickFirst<(_, DisplayFromStr)>>>")]
    #[ts(as = "Option<Vec<i32>>")]
    #[serde(default)]
    pub project_ids: Option<Vec<i32>>,
}

impl UpdatePaper {
    pub fn apply_to(&self, existing: Paper) -> Paper {
        Paper {
            title: self.title.clone().unwrap_or(existing.title),
            authors: self.authors.clone().or(existing.authors),
            year: self.year.or(existing.year),
            publisher: self.publisher.clone().or(existing.publisher),
            notes: self.notes.clone().or(existing.notes),
            file_path: self.file_path.clone().or(existing.file_path),
            file_name: self.file_name.clone().or(existing.file_name),
            file_size: self.file_size.clone().or(existing.file_size),
            ..existing
        }
    }
}

/// `?search=` matches title, authors, publisher or year.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperFilter {
    pub search: Option<String>,
}

impl Paper {
    pub async fn find_all(
        pool: &SqlitePool,
        filter: &PaperFilter,
    ) -> Result<Vec<PaperWithProjects>, sqlx::Error> {
        let search = SearchTerm::parse(filter.search.as_deref());
        let sql = format!("SELECT {PAPER_COLUMNS} FROM papers ORDER BY created_at DESC, id DESC");
        let mut papers = sqlx::query_as::<_, Paper>(&sql).fetch_all(pool).await?;
        if let Some(search) = search {
            papers.retain(|paper| {
                let year = paper.year.map(|y| y.to_string()).unwrap_or_default();
                search.matches([
                    paper.title.as_str(),
                    paper.authors.as_deref().unwrap_or_default(),
                    paper.publisher.as_deref().unwrap_or_default(),
                    year.as_str(),
                ])
            });
        }

        let mut links = project_link::projects_by_entity(pool, ProjectLink::Paper).await?;
        Ok(papers
            .into_iter()
            .map(|paper| {
                let projects = links.remove(&paper.id).unwrap_or_default();
                PaperWithProjects { paper, projects }
            })
            .collect())
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {PAPER_COLUMNS} FROM papers WHERE id = $1");
        sqlx::query_as::<_, Paper>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_with_projects(
        pool: &SqlitePool,
        id: i32,
    ) -> Result<Option<PaperWithProjects>, sqlx::Error> {
        let Some(paper) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let projects = project_link::projects_for(pool, ProjectLink::Paper, id).await?;
        Ok(Some(PaperWithProjects { paper, projects }))
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreatePaper,
    ) -> Result<PaperWithProjects, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            r#"INSERT INTO papers (title, authors, year, publisher, notes, file_path, file_name, file_size)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {PAPER_COLUMNS}"#
        );
        let paper = sqlx::query_as::<_, Paper>(&sql)
            .bind(data.title.trim())
            .bind(&data.authors)
            .bind(data.year)
            .bind(&data.publisher)
            .bind(&data.notes)
            .bind(&data.file_path)
            .bind(&data.file_name)
            .bind(&data.file_size)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(project_ids) = &data.project_ids {
            project_link::connect(&mut tx, ProjectLink::Paper, paper.id, project_ids).await?;
        }
        tx.commit().await?;

        let projects = project_link::projects_for(pool, ProjectLink::Paper, paper.id).await?;
        Ok(PaperWithProjects { paper, projects })
    }

    /// Writes every column of `paper` and, when `project_ids` is given, resets its links.
    pub async fn update(
        pool: &SqlitePool,
        paper: &Paper,
        project_ids: Option<&[i32]>,
    ) -> Result<PaperWithProjects, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            r#"UPDATE papers
               SET title = $2, authors = $3, year = $4, publisher = $5, notes = $6,
                   file_path = $7, file_name = $8, file_size = $9,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {PAPER_COLUMNS}"#
        );
        let updated = sqlx::query_as::<_, Paper>(&sql)
            .bind(paper.id)
            .bind(paper.title.trim())
            .bind(&paper.authors)
            .bind(paper.year)
            .bind(&paper.publisher)
            .bind(&paper.notes)
            .bind(&paper.file_path)
            .bind(&paper.file_name)
            .bind(&paper.file_size)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(project_ids) = project_ids {
            project_link::set(&mut tx, ProjectLink::Paper, updated.id, project_ids).await?;
        }
        tx.commit().await?;

        let projects = project_link::projects_for(pool, ProjectLink::Paper, updated.id).await?;
        Ok(PaperWithProjects {
            paper: updated,
            projects,
        })
    }

    /// Deletes the paper; its project links are removed by cascade.
    pub async fn delete(pool: &SqlitePool, id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM papers WHERE id = $1")
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
    fn year_and_project_ids_accept_strings() {
        let body: CreatePaper = serde_json::from_value(serde_json::json!({
            "title": "Media literacy outcomes",
            "year": "2024",
            "projectIds": ["1", 2]
        }))
        .unwrap();
        assert_eq!(body.year, Some(2024));
        assert_eq!(body.project_ids, Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn create_connects_and_update_sets_links() {
        let pool = test_support::pool().await;
        let first = Project::create(&pool, &CreateProject::named("First")).await.unwrap();
        let second = Project::create(&pool, &CreateProject::named("Second")).await.unwrap();

        let created = Paper::create(
            &pool,
            &CreatePaper {
                authors: Some("Kim, Lee".into()),
                year: Some(2024),
                project_ids: Some(vec![first.id]),
                ..CreatePaper::titled("Journalism in the digital age")
            },
        )
        .await
        .unwrap();
        assert_eq!(created.projects.len(), 1);
        assert_eq!(created.projects[0].project_name, "First");

        // No project list: links stay.
        let patch = UpdatePaper {
            publisher: Some("Journal of Press Studies".into()),
            ..Default::default()
        };
        let untouched = Paper::update(&pool, &patch.apply_to(created.paper.clone()), None)
            .await
            .unwrap();
        assert_eq!(untouched.projects.len(), 1);
        assert_eq!(untouched.authors.as_deref(), Some("Kim, Lee"));

        // Explicit list: links replaced.
        let replaced = Paper::update(&pool, &untouched.paper, Some([second.id].as_slice()))
            .await
            .unwrap();
        assert_eq!(replaced.projects[0].id, second.id);

        let cleared = Paper::update(&pool, &replaced.paper, Some(&[][..])).await.unwrap();
        assert!(cleared.projects.is_empty());
    }

    #[tokio::test]
    async fn search_covers_authors_and_year() {
        let pool = test_support::pool().await;
        Paper::create(
            &pool,
            &CreatePaper {
                authors: Some("Park".into()),
                year: Some(2023),
                ..CreatePaper::titled("Education study")
            },
        )
        .await
        .unwrap();
        Paper::create(&pool, &CreatePaper::titled("Unrelated")).await.unwrap();

        let by_author = Paper::find_all(
            &pool,
            &PaperFilter {
                search: Some("park".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(by_author.len(), 1);

        let by_year = Paper::find_all(
            &pool,
            &PaperFilter {
                search: Some("2023".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(by_year[0].title, "Education study");
    }

    #[tokio::test]
    async fn search_matches_accented_title_and_author() {
        let pool = test_support::pool().await;
        Paper::create(
            &pool,
            &CreatePaper {
                authors: Some("Émile Durkheim".into()),
                ..CreatePaper::titled("Über Medien")
            },
        )
        .await
        .unwrap();
        Paper::create(&pool, &CreatePaper::titled("Uber drivers")).await.unwrap();

        for term in ["Über", "über", "Émile", "ÉMILE"] {
            let found = Paper::find_all(
                &pool,
                &PaperFilter {
                    search: Some(term.into()),
                },
            )
            .await
            .unwrap();
            assert_eq!(found.len(), 1, "term {term}");
            assert_eq!(found[0].title, "Über Medien");
        }
    }
}
