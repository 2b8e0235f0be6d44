use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use super::project::Project;

const TASK_COLUMNS: &str = "id, project_id, task_name, description, due_date, status, notifications, notification_timing, created_at, updated_at";

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// How far ahead of the due date a task starts raising notifications.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "notification_timing")]
pub enum NotificationTiming {
    #[default]
    #[sqlx(rename = "1day")]
    #[serde(rename = "1day")]
    #[strum(serialize = "1day")]
    OneDay,
    #[sqlx(rename = "3days")]
    #[serde(rename = "3days")]
    #[strum(serialize = "3days")]
    ThreeDays,
    #[sqlx(rename = "1week")]
    #[serde(rename = "1week")]
    #[strum(serialize = "1week")]
    OneWeek,
    #[sqlx(rename = "1month")]
    #[serde(rename = "1month")]
    #[strum(serialize = "1month")]
    OneMonth,
}

impl NotificationTiming {
    /// Largest number of days before the due date at which a notification shows.
    pub fn lead_days(self) -> i64 {
        match self {
            NotificationTiming::OneDay => 1,
            NotificationTiming::ThreeDays => 3,
            NotificationTiming::OneWeek => 7,
            NotificationTiming::OneMonth => 30,
        }
    }

    /// Timing to store for a task: notifications on with no timing falls back to the one-day lead.
    pub fn effective(notifications: bool, timing: Option<Self>) -> Option<Self> {
        match (notifications, timing) {
            (true, None) => Some(Self::default()),
            (_, timing) => timing,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NotificationTiming::OneDay => "1 day before",
            NotificationTiming::ThreeDays => "3 days before",
            NotificationTiming::OneWeek => "1 week before",
            NotificationTiming::OneMonth => "1 month before",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i32,
    pub project_id: i32,
    pub task_name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub notifications: bool,
    pub notification_timing: Option<NotificationTiming>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskWithProject {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub project: Option<Project>,
}

impl std::ops::Deref for TaskWithProject {
    type Target = Task;
    fn deref(&self) -> &Self::Target {
        &self.task
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[ts(as = "i32")]
    pub project_id: i32,
    #[serde(default)]
    pub task_name: String,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "utils::date::deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
    pub notifications: Option<bool>,
    pub notification_timing: Option<NotificationTiming>,
}

impl CreateTask {
    pub fn for_project(project_id: i32, task_name: impl Into<String>) -> Self {
        Self {
            project_id,
            task_name: task_name.into(),
            description: None,
            due_date: None,
            status: None,
            notifications: None,
            notification_timing: None,
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[ts(as = "Option<i32>")]
    #[serde(default)]
    pub project_id: Option<i32>,
    pub task_name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "utils::date::deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
    pub notifications: Option<bool>,
    pub notification_timing: Option<NotificationTiming>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateTaskStatus {
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub project_id: Option<i32>,
    pub status: Option<TaskStatus>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub async fn find_all(pool: &SqlitePool, filter: &TaskFilter) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"SELECT {TASK_COLUMNS}
               FROM tasks
               WHERE ($1 IS NULL OR project_id = $1)
                 AND ($2 IS NULL OR status = $2)
               ORDER BY created_at DESC, id DESC"#
        );
        sqlx::query_as::<_, Task>(&sql)
            .bind(filter.project_id)
            .bind(filter.status)
            .fetch_all(pool)
            .await
    }

    pub async fn find_all_with_project(
        pool: &SqlitePool,
        filter: &TaskFilter,
    ) -> Result<Vec<TaskWithProject>, sqlx::Error> {
        let tasks = Self::find_all(pool, filter).await?;
        let projects: HashMap<i32, Project> = Project::find_all(pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(tasks
            .into_iter()
            .map(|task| {
                let project = projects.get(&task.project_id).cloned();
                TaskWithProject { task, project }
            })
            .collect())
    }

    pub async fn find_grouped_by_project(
        pool: &SqlitePool,
        project_id: Option<i32>,
    ) -> Result<HashMap<i32, Vec<Self>>, sqlx::Error> {
        let tasks = Self::find_all(
            pool,
            &TaskFilter {
                project_id,
                status: None,
            },
        )
        .await?;
        let mut grouped: HashMap<i32, Vec<Self>> = HashMap::new();
        for task in tasks {
            grouped.entry(task.project_id).or_default().push(task);
        }
        Ok(grouped)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_with_project(
        pool: &SqlitePool,
        id: i32,
    ) -> Result<Option<TaskWithProject>, sqlx::Error> {
        let Some(task) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let project = Project::find_by_id(pool, task.project_id).await?;
        Ok(Some(TaskWithProject { task, project }))
    }

    /// Tasks that can still raise due-date notifications.
    pub async fn find_notifiable(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"SELECT {TASK_COLUMNS}
               FROM tasks
               WHERE notifications = 1
                 AND status != 'completed'
                 AND due_date IS NOT NULL
               ORDER BY due_date ASC, id ASC"#
        );
        sqlx::query_as::<_, Task>(&sql).fetch_all(pool).await
    }

    pub async fn create(pool: &SqlitePool, data: &CreateTask) -> Result<Self, sqlx::Error> {
        let status = data.status.unwrap_or_default();
        let notifications = data.notifications.unwrap_or(false);
        let timing = NotificationTiming::effective(notifications, data.notification_timing);
        let sql = format!(
            r#"INSERT INTO tasks (project_id, task_name, description, due_date, status, notifications, notification_timing)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {TASK_COLUMNS}"#
        );
        sqlx::query_as::<_, Task>(&sql)
            .bind(data.project_id)
            .bind(data.task_name.trim())
            .bind(&data.description)
            .bind(data.due_date)
            .bind(status)
            .bind(notifications)
            .bind(timing)
            .fetch_one(pool)
            .await
    }

    /// Writes every mutable column from `task`.
    pub async fn update(pool: &SqlitePool, task: &Task) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"UPDATE tasks
               SET project_id = $2, task_name = $3, description = $4, due_date = $5,
                   status = $6, notifications = $7, notification_timing = $8,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {TASK_COLUMNS}"#
        );
        sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(task.project_id)
            .bind(task.task_name.trim())
            .bind(&task.description)
            .bind(task.due_date)
            .bind(task.status)
            .bind(task.notifications)
            .bind(task.notification_timing)
            .fetch_one(pool)
            .await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: i32,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"UPDATE tasks
               SET status = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {TASK_COLUMNS}"#
        );
        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete<'e, E>(executor: E, id: i32) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

impl UpdateTask {
    /// Overlay the fields present in the request onto `existing`.
    pub fn apply_to(self, existing: Task) -> Task {
        let notifications = self.notifications.unwrap_or(existing.notifications);
        let timing = self.notification_timing.or(existing.notification_timing);
        Task {
            project_id: self.project_id.unwrap_or(existing.project_id),
            task_name: self.task_name.unwrap_or(existing.task_name),
            description: self.description.or(existing.description),
            due_date: self.due_date.or(existing.due_date),
            status: self.status.unwrap_or(existing.status),
            notifications,
            notification_timing: NotificationTiming::effective(notifications, timing),
            ..existing
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::models::{project::CreateProject, test_support};

    #[test]
    fn status_and_timing_use_wire_names() {
        assert_eq!(TaskStatus::InProgress.to_string(), "in-progress");
        assert_eq!(TaskStatus::from_str("completed").unwrap(), TaskStatus::Completed);
        assert_eq!(
            serde_json::to_value(NotificationTiming::ThreeDays).unwrap(),
            serde_json::json!("3days")
        );
        assert_eq!(NotificationTiming::from_str("1month").unwrap().lead_days(), 30);
    }

    #[test]
    fn create_body_accepts_string_project_id() {
        let body: CreateTask = serde_json::from_value(serde_json::json!({
            "projectId": "7",
            "taskName": "Design survey",
            "dueDate": "2025-07-30",
            "notifications": true,
            "notificationTiming": "1week"
        }))
        .unwrap();
        assert_eq!(body.project_id, 7);
        assert_eq!(body.due_date, NaiveDate::from_ymd_opt(2025, 7, 30));
        assert_eq!(body.notification_timing, Some(NotificationTiming::OneWeek));
    }

    #[tokio::test]
    async fn create_defaults_and_filters() {
        let pool = test_support::pool().await;
        let project = Project::create(&pool, &CreateProject::named("Press")).await.unwrap();

        let quiet = Task::create(&pool, &CreateTask::for_project(project.id, "Quiet"))
            .await
            .unwrap();
        assert_eq!(quiet.status, TaskStatus::Pending);
        assert!(!quiet.notifications);
        assert_eq!(quiet.notification_timing, None);

        let loud = Task::create(
            &pool,
            &CreateTask {
                notifications: Some(true),
                status: Some(TaskStatus::InProgress),
                ..CreateTask::for_project(project.id, "Loud")
            },
        )
        .await
        .unwrap();
        assert_eq!(loud.notification_timing, Some(NotificationTiming::OneDay));

        let in_progress = Task::find_all(
            &pool,
            &TaskFilter {
                project_id: Some(project.id),
                status: Some(TaskStatus::InProgress),
            },
        )
        .await
        .unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].id, loud.id);

        let with_project = Task::find_with_project(&pool, quiet.id).await.unwrap().unwrap();
        assert_eq!(with_project.project.unwrap().project_name, "Press");
    }

    #[tokio::test]
    async fn update_overlays_only_present_fields() {
        let pool = test_support::pool().await;
        let project = Project::create(&pool, &CreateProject::named("Press")).await.unwrap();
        let task = Task::create(
            &pool,
            &CreateTask {
                description: Some("collect prior work".into()),
                ..CreateTask::for_project(project.id, "Literature review")
            },
        )
        .await
        .unwrap();

        let merged = UpdateTask {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        }
        .apply_to(task.clone());
        let updated = Task::update(&pool, &merged).await.unwrap();

        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.task_name, "Literature review");
        assert_eq!(updated.description.as_deref(), Some("collect prior work"));

        let reopened = Task::update_status(&pool, task.id, TaskStatus::Pending)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reopened.status, TaskStatus::Pending);
        assert!(Task::update_status(&pool, 999, TaskStatus::Pending).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn enabling_notifications_on_update_sets_default_timing() {
        let pool = test_support::pool().await;
        let project = Project::create(&pool, &CreateProject::named("Press")).await.unwrap();
        let quiet = Task::create(&pool, &CreateTask::for_project(project.id, "Quiet"))
            .await
            .unwrap();
        assert_eq!(quiet.notification_timing, None);

        let merged = UpdateTask {
            notifications: Some(true),
            ..Default::default()
        }
        .apply_to(quiet);
        let enabled = Task::update(&pool, &merged).await.unwrap();
        assert!(enabled.notifications);
        assert_eq!(enabled.notification_timing, Some(NotificationTiming::OneDay));

        let weekly = UpdateTask {
            notification_timing: Some(NotificationTiming::OneWeek),
            ..Default::default()
        }
        .apply_to(enabled);
        assert_eq!(weekly.notification_timing, Some(NotificationTiming::OneWeek));
    }
}
