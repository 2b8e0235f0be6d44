//! Due-date notifications.
//!
//! Nothing is scheduled ahead of time: every read recomputes which tasks are
//! inside their notification window from the current clock. The only persisted
//! state is a per-task dismissal tied to the due date it was made against.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use db::{
    DBService,
    models::{
        notification_dismissal::NotificationDismissal,
        project::Project,
        task::{NotificationTiming, Task, TaskStatus},
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("task {0} not found")]
    TaskNotFound(i32),
    #[error("task {0} has no due date")]
    NoDueDate(i32),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DueDateNotification {
    pub task_id: i32,
    pub task_name: String,
    pub project_id: i32,
    pub project_name: String,
    pub due_date: NaiveDate,
    /// Whole days until the due date, rounded up.
    #[ts(type = "number")]
    pub days_remaining: i64,
    pub timing: NotificationTiming,
    pub timing_label: String,
    pub message: String,
}

/// Days from `now` to the start (00:00 UTC) of `due_date`, rounded up.
pub fn days_until(due_date: NaiveDate, now: DateTime<Utc>) -> i64 {
    let due = due_date.and_time(NaiveTime::MIN).and_utc();
    let ms = (due - now).num_milliseconds();
    // Integer division truncates toward zero, which is already the ceiling for negatives.
    let days = ms / DAY_MS;
    if ms % DAY_MS > 0 { days + 1 } else { days }
}

fn message_for(days: i64) -> String {
    match days {
        0 => "Due today!".to_string(),
        1 => "Due tomorrow!".to_string(),
        d => format!("Due in {d} days!"),
    }
}

/// Decide whether `task` should notify at `now`: only while `0 <= days <= lead_days`.
/// A task whose due date has passed no longer notifies.
pub fn evaluate(task: &Task, project_name: &str, now: DateTime<Utc>) -> Option<DueDateNotification> {
    if !task.notifications || task.status == TaskStatus::Completed {
        return None;
    }
    let due_date = task.due_date?;
    let timing = task.notification_timing?;

    let days = days_until(due_date, now);
    if !(0..=timing.lead_days()).contains(&days) {
        return None;
    }

    Some(DueDateNotification {
        task_id: task.id,
        task_name: task.task_name.clone(),
        project_id: task.project_id,
        project_name: project_name.to_string(),
        due_date,
        days_remaining: days,
        timing,
        timing_label: timing.label().to_string(),
        message: message_for(days),
    })
}

#[derive(Clone)]
pub struct NotificationService {
    db: DBService,
}

impl NotificationService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    /// Notifications due at `now`, minus dismissed ones, soonest first.
    pub async fn pending(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DueDateNotification>, NotificationError> {
        let pool = &self.db.pool;
        let tasks = Task::find_notifiable(pool).await?;
        let names = Project::names_by_id(pool).await?;
        let dismissed = NotificationDismissal::due_dates_by_task(pool).await?;

        let mut pending: Vec<DueDateNotification> = tasks
            .iter()
            .filter_map(|task| {
                let project_name = names.get(&task.project_id).map(String::as_str).unwrap_or("");
                evaluate(task, project_name, now)
            })
            .filter(|n| dismissed.get(&n.task_id) != Some(&n.due_date))
            .collect();
        pending.sort_by_key(|n| (n.days_remaining, n.task_id));
        Ok(pending)
    }

    /// Hide the task's notification until its due date changes.
    pub async fn dismiss(&self, task_id: i32) -> Result<NotificationDismissal, NotificationError> {
        let task = Task::find_by_id(&self.db.pool, task_id)
            .await?
            .ok_or(NotificationError::TaskNotFound(task_id))?;
        let due_date = task.due_date.ok_or(NotificationError::NoDueDate(task_id))?;
        let dismissal = NotificationDismissal::upsert(&self.db.pool, task_id, due_date).await?;
        tracing::debug!(task_id, due_date = %due_date, "Notification dismissed");
        Ok(dismissal)
    }

    /// Dismiss everything currently pending; returns how many were dismissed.
    pub async fn dismiss_all(&self, now: DateTime<Utc>) -> Result<usize, NotificationError> {
        let pending = self.pending(now).await?;
        for notification in &pending {
            NotificationDismissal::upsert(&self.db.pool, notification.task_id, notification.due_date)
                .await?;
        }
        tracing::debug!(count = pending.len(), "All notifications dismissed");
        Ok(pending.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use db::models::{
        project::CreateProject,
        task::{CreateTask, UpdateTask},
    };

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(due: Option<NaiveDate>, timing: Option<NotificationTiming>) -> Task {
        let now = at(2025, 7, 1, 0);
        Task {
            id: 1,
            project_id: 1,
            task_name: "Submit survey".to_string(),
            description: None,
            due_date: due,
            status: TaskStatus::Pending,
            notifications: true,
            notification_timing: timing,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn days_round_up_partial_days() {
        let now = at(2025, 7, 1, 9);
        assert_eq!(days_until(date(2025, 7, 1), now), 0);
        assert_eq!(days_until(date(2025, 7, 2), now), 1);
        assert_eq!(days_until(date(2025, 7, 4), now), 3);
        assert_eq!(days_until(date(2025, 7, 2), at(2025, 7, 1, 0)), 1);
        assert_eq!(days_until(date(2025, 6, 30), now), -1);
        assert_eq!(days_until(date(2025, 6, 28), now + Duration::minutes(1)), -3);
    }

    #[test]
    fn threshold_per_timing() {
        let now = at(2025, 7, 1, 9);
        let three_days = task(Some(date(2025, 7, 4)), Some(NotificationTiming::ThreeDays));
        let n = evaluate(&three_days, "Press", now).unwrap();
        assert_eq!(n.days_remaining, 3);
        assert_eq!(n.message, "Due in 3 days!");
        assert_eq!(n.timing_label, "3 days before");
        assert_eq!(n.project_name, "Press");

        let one_day = task(Some(date(2025, 7, 4)), Some(NotificationTiming::OneDay));
        assert!(evaluate(&one_day, "Press", now).is_none());

        let month = task(Some(date(2025, 7, 31)), Some(NotificationTiming::OneMonth));
        assert_eq!(evaluate(&month, "", now).unwrap().days_remaining, 30);
        let too_far = task(Some(date(2025, 8, 1)), Some(NotificationTiming::OneMonth));
        assert!(evaluate(&too_far, "", now).is_none());

        let week = task(Some(date(2025, 7, 2)), Some(NotificationTiming::OneWeek));
        assert_eq!(evaluate(&week, "", now).unwrap().message, "Due tomorrow!");
        let today = task(Some(date(2025, 7, 1)), Some(NotificationTiming::OneDay));
        assert_eq!(evaluate(&today, "", now).unwrap().message, "Due today!");
    }

    #[test]
    fn skipped_and_past_due_tasks() {
        let now = at(2025, 7, 10, 12);
        let due = Some(date(2025, 7, 11));

        let mut off = task(due, Some(NotificationTiming::OneDay));
        off.notifications = false;
        assert!(evaluate(&off, "", now).is_none());

        let mut done = task(due, Some(NotificationTiming::OneDay));
        done.status = TaskStatus::Completed;
        assert!(evaluate(&done, "", now).is_none());

        assert!(evaluate(&task(None, Some(NotificationTiming::OneDay)), "", now).is_none());
        assert!(evaluate(&task(due, None), "", now).is_none());

        // Past the due date: silent, whatever the lead time.
        let just_late = task(Some(date(2025, 7, 9)), Some(NotificationTiming::OneMonth));
        assert_eq!(days_until(date(2025, 7, 9), now), -1);
        assert!(evaluate(&just_late, "", now).is_none());
        let long_late = task(Some(date(2024, 6, 1)), Some(NotificationTiming::OneWeek));
        assert!(evaluate(&long_late, "", now).is_none());

        // Due today stays visible for the whole day.
        let due_today = task(Some(date(2025, 7, 10)), Some(NotificationTiming::OneDay));
        assert_eq!(evaluate(&due_today, "", now).unwrap().days_remaining, 0);
    }

    #[tokio::test]
    async fn pending_respects_dismissals_per_due_date() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = NotificationService::new(db.clone());
        let project = Project::create(&db.pool, &CreateProject::named("Media literacy"))
            .await
            .unwrap();
        let now = at(2025, 7, 1, 9);

        let soon = Task::create(
            &db.pool,
            &CreateTask {
                due_date: Some(date(2025, 7, 3)),
                notifications: Some(true),
                notification_timing: Some(NotificationTiming::ThreeDays),
                ..CreateTask::for_project(project.id, "Draft report")
            },
        )
        .await
        .unwrap();
        let today = Task::create(
            &db.pool,
            &CreateTask {
                due_date: Some(date(2025, 7, 1)),
                notifications: Some(true),
                ..CreateTask::for_project(project.id, "Send invites")
            },
        )
        .await
        .unwrap();
        Task::create(
            &db.pool,
            &CreateTask {
                due_date: Some(date(2025, 6, 29)),
                notifications: Some(true),
                notification_timing: Some(NotificationTiming::OneWeek),
                ..CreateTask::for_project(project.id, "Missed deadline")
            },
        )
        .await
        .unwrap();

        let pending = service.pending(now).await.unwrap();
        let ids: Vec<_> = pending.iter().map(|n| n.task_id).collect();
        assert_eq!(ids, vec![today.id, soon.id]);
        assert_eq!(pending[1].project_name, "Media literacy");

        service.dismiss(soon.id).await.unwrap();
        let pending = service.pending(now).await.unwrap();
        assert_eq!(pending.len(), 1);

        // Moving the due date brings it back.
        let moved = UpdateTask {
            due_date: Some(date(2025, 7, 4)),
            ..Default::default()
        }
        .apply_to(soon);
        Task::update(&db.pool, &moved).await.unwrap();
        assert_eq!(service.pending(now).await.unwrap().len(), 2);

        assert_eq!(service.dismiss_all(now).await.unwrap(), 2);
        assert!(service.pending(now).await.unwrap().is_empty());

        assert!(matches!(
            service.dismiss(9999).await,
            Err(NotificationError::TaskNotFound(9999))
        ));
    }
}
