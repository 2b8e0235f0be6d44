use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

/// A user dismissal of a task's due-date notification, pinned to the due date
/// it was made against.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDismissal {
    pub task_id: i32,
    pub due_date: NaiveDate,
    pub dismissed_at: DateTime<Utc>,
}

impl NotificationDismissal {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, NotificationDismissal>(
            "SELECT task_id, due_date, dismissed_at FROM notification_dismissals",
        )
        .fetch_all(pool)
        .await
    }

    /// Dismissed due date per task.
    pub async fn due_dates_by_task(pool: &SqlitePool) -> Result<HashMap<i32, NaiveDate>, sqlx::Error> {
        Ok(Self::find_all(pool)
            .await?
            .into_iter()
            .map(|d| (d.task_id, d.due_date))
            .collect())
    }

    /// Record (or move) the dismissal for `task_id` to `due_date`.
    pub async fn upsert(
        pool: &SqlitePool,
        task_id: i32,
        due_date: NaiveDate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, NotificationDismissal>(
            r#"INSERT INTO notification_dismissals (task_id, due_date)
               VALUES ($1, $2)
               ON CONFLICT(task_id) DO UPDATE
                   SET due_date = excluded.due_date,
                       dismissed_at = datetime('now', 'subsec')
               RETURNING task_id, due_date, dismissed_at"#,
        )
        .bind(task_id)
        .bind(due_date)
        .fetch_one(pool)
        .await
    }

    pub async fn clear(pool: &SqlitePool, task_id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notification_dismissals WHERE task_id = $1")
            .bind(task_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
