//! Many-to-many links between projects and papers, experts and materials.
//!
//! Creating a record *connects* it to the listed projects; updating a record
//! with a project list *sets* the links, replacing whatever was there.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool, sqlite::SqliteRow};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectLink {
    Paper,
    Expert,
    Material,
}

impl ProjectLink {
    fn join_table(self) -> &'static str {
        match self {
            ProjectLink::Paper => "project_papers",
            ProjectLink::Expert => "project_experts",
            ProjectLink::Material => "project_materials",
        }
    }

    fn entity_table(self) -> &'static str {
        match self {
            ProjectLink::Paper => "papers",
            ProjectLink::Expert => "experts",
            ProjectLink::Material => "materials",
        }
    }

    fn entity_column(self) -> &'static str {
        match self {
            ProjectLink::Paper => "paper_id",
            ProjectLink::Expert => "expert_id",
            ProjectLink::Material => "material_id",
        }
    }
}

/// The slice of a project embedded in paper/expert/material responses.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: i32,
    pub project_name: String,
}

/// A joined row tagged with the id on the other side of the link.
struct Linked<T> {
    key: i32,
    item: T,
}

impl<'r, T> FromRow<'r, SqliteRow> for Linked<T>
where
    T: FromRow<'r, SqliteRow>,
{
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Linked {
            key: row.try_get("link_key")?,
            item: T::from_row(row)?,
        })
    }
}

fn dedup(ids: &[i32]) -> Vec<i32> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Ids from `ids` with no matching project row.
pub async fn missing_project_ids(pool: &SqlitePool, ids: &[i32]) -> Result<Vec<i32>, sqlx::Error> {
    let wanted = dedup(ids);
    if wanted.is_empty() {
        return Ok(vec![]);
    }

    let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM projects WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in &wanted {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let found: BTreeSet<i32> = query
        .build_query_scalar::<i32>()
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect();

    Ok(wanted.into_iter().filter(|id| !found.contains(id)).collect())
}

/// Link `entity_id` to each project, keeping existing links.
pub async fn connect(
    conn: &mut SqliteConnection,
    link: ProjectLink,
    entity_id: i32,
    project_ids: &[i32],
) -> Result<(), sqlx::Error> {
    let sql = format!(
        "INSERT OR IGNORE INTO {} (project_id, {}) VALUES ($1, $2)",
        link.join_table(),
        link.entity_column()
    );
    for project_id in dedup(project_ids) {
        sqlx::query(&sql)
            .bind(project_id)
            .bind(entity_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Replace every link of `entity_id` with exactly `project_ids`.
pub async fn set(
    conn: &mut SqliteConnection,
    link: ProjectLink,
    entity_id: i32,
    project_ids: &[i32],
) -> Result<(), sqlx::Error> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = $1",
        link.join_table(),
        link.entity_column()
    );
    sqlx::query(&sql).bind(entity_id).execute(&mut *conn).await?;
    connect(conn, link, entity_id, project_ids).await
}

pub async fn projects_for(
    pool: &SqlitePool,
    link: ProjectLink,
    entity_id: i32,
) -> Result<Vec<ProjectSummary>, sqlx::Error> {
    let sql = format!(
        r#"SELECT p.id, p.project_name
           FROM {} l
           JOIN projects p ON p.id = l.project_id
           WHERE l.{} = $1
           ORDER BY p.created_at DESC"#,
        link.join_table(),
        link.entity_column()
    );
    sqlx::query_as::<_, ProjectSummary>(&sql)
        .bind(entity_id)
        .fetch_all(pool)
        .await
}

/// Project summaries for every linked entity, keyed by entity id.
pub async fn projects_by_entity(
    pool: &SqlitePool,
    link: ProjectLink,
) -> Result<HashMap<i32, Vec<ProjectSummary>>, sqlx::Error> {
    let sql = format!(
        r#"SELECT l.{col} AS link_key, p.id, p.project_name
           FROM {table} l
           JOIN projects p ON p.id = l.project_id
           ORDER BY p.created_at DESC"#,
        col = link.entity_column(),
        table = link.join_table()
    );
    let rows = sqlx::query_as::<_, Linked<ProjectSummary>>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(group(rows))
}

/// Linked papers/experts/materials keyed by project id, optionally for a single project.
pub async fn entities_by_project<T>(
    pool: &SqlitePool,
    link: ProjectLink,
    project_id: Option<i32>,
) -> Result<HashMap<i32, Vec<T>>, sqlx::Error>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let sql = format!(
        r#"SELECT l.project_id AS link_key, e.*
           FROM {table} l
           JOIN {entities} e ON e.id = l.{col}
           WHERE ($1 IS NULL OR l.project_id = $1)
           ORDER BY e.created_at DESC"#,
        table = link.join_table(),
        entities = link.entity_table(),
        col = link.entity_column()
    );
    let rows = sqlx::query_as::<_, Linked<T>>(&sql)
        .bind(project_id)
        .fetch_all(pool)
        .await?;
    Ok(group(rows))
}

fn group<T>(rows: Vec<Linked<T>>) -> HashMap<i32, Vec<T>> {
    let mut grouped: HashMap<i32, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(row.key).or_default().push(row.item);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        paper::{CreatePaper, Paper},
        project::{CreateProject, Project},
        test_support,
    };

    #[tokio::test]
    async fn reports_unknown_project_ids() {
        let pool = test_support::pool().await;
        let project = Project::create(&pool, &CreateProject::named("Press freedom"))
            .await
            .unwrap();

        let missing = missing_project_ids(&pool, &[project.id, 404, 404, 405])
            .await
            .unwrap();
        assert_eq!(missing, vec![404, 405]);
        assert!(missing_project_ids(&pool, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_replaces_existing_links() {
        let pool = test_support::pool().await;
        let a = Project::create(&pool, &CreateProject::named("A")).await.unwrap();
        let b = Project::create(&pool, &CreateProject::named("B")).await.unwrap();
        let paper = Paper::create(
            &pool,
            &CreatePaper {
                project_ids: Some(vec![a.id]),
                ..CreatePaper::titled("Journalism in the digital age")
            },
        )
        .await
        .unwrap();
        assert_eq!(paper.projects.len(), 1);

        let mut conn = pool.acquire().await.unwrap();
        set(&mut conn, ProjectLink::Paper, paper.id, &[b.id, b.id]).await.unwrap();
        drop(conn);

        let linked = projects_for(&pool, ProjectLink::Paper, paper.id).await.unwrap();
        assert_eq!(
            linked,
            vec![ProjectSummary {
                id: b.id,
                project_name: "B".to_string()
            }]
        );

        let by_project =
            entities_by_project::<Paper>(&pool, ProjectLink::Paper, Some(b.id)).await.unwrap();
        assert_eq!(by_project[&b.id][0].id, paper.id);
        assert!(!by_project.contains_key(&a.id));
    }
}
