use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, types::Json};
use ts_rs::TS;
use utils::text::SearchTerm;

const NOTE_COLUMNS: &str = "id, title, content, tags, created_at, updated_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i32,
    pub title: String,
    pub content: String,
    #[ts(type = "Array<string>")]
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateNote {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// `?search=` matches title or content; `?tag=` must match one tag exactly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteFilter {
    pub search: Option<String>,
    pub tag: Option<String>,
}

/// Trim tags, drop empty ones and duplicates, keep first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

impl Note {
    pub async fn find_all(pool: &SqlitePool, filter: &NoteFilter) -> Result<Vec<Self>, sqlx::Error> {
        let search = SearchTerm::parse(filter.search.as_deref());
        let tag = filter.tag.as_deref().map(str::trim).filter(|t| !t.is_empty());

        let sql = format!(
            r#"SELECT {NOTE_COLUMNS}
               FROM notes
               WHERE $1 IS NULL
                  OR EXISTS (SELECT 1 FROM json_each(notes.tags) WHERE json_each.value = $1)
               ORDER BY created_at DESC, id DESC"#
        );
        let mut notes = sqlx::query_as::<_, Note>(&sql)
            .bind(tag)
            .fetch_all(pool)
            .await?;
        if let Some(search) = search {
            notes.retain(|note| search.matches([note.title.as_str(), note.content.as_str()]));
        }
        Ok(notes)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1");
        sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, data: &CreateNote) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO notes (title, content, tags) VALUES ($1, $2, $3) RETURNING {NOTE_COLUMNS}"
        );
        sqlx::query_as::<_, Note>(&sql)
            .bind(data.title.trim())
            .bind(&data.content)
            .bind(Json(normalize_tags(&data.tags)))
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i32,
        title: &str,
        content: &str,
        tags: &[String],
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"UPDATE notes
               SET title = $2, content = $3, tags = $4, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {NOTE_COLUMNS}"#
        );
        sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .bind(title.trim())
            .bind(content)
            .bind(Json(normalize_tags(tags)))
            .fetch_one(pool)
            .await
    }

    pub async fn delete<'e, E>(executor: E, id: i32) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
