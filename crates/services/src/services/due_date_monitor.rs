//! Background service that announces tasks entering their due-date window.

use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::{NaiveDate, Utc};
use db::DBService;
use tokio::{sync::RwLock, time::sleep};
use tracing::{debug, error, info};

use super::{
    config::Config,
    notification::{DueDateNotification, NotificationError, NotificationService},
};

type AnnouncementKey = (i32, NaiveDate);

/// Polls pending notifications and logs each one once per process lifetime.
/// A task is announced again only when its due date changes.
pub struct DueDateMonitor {
    notifications: NotificationService,
    config: Arc<RwLock<Config>>,
    announced: HashSet<AnnouncementKey>,
}

impl DueDateMonitor {
    /// Spawn the background due-date monitor.
    pub fn spawn(db: DBService, config: Arc<RwLock<Config>>) -> tokio::task::JoinHandle<()> {
        let monitor = Self {
            notifications: NotificationService::new(db),
            config,
            announced: HashSet::new(),
        };
        tokio::spawn(async move {
            monitor.start().await;
        })
    }

    async fn start(mut self) {
        let poll_interval_secs = self.config.read().await.notifications.poll_interval_secs;
        info!(
            poll_interval_secs = poll_interval_secs,
            "Starting due-date monitor"
        );

        loop {
            let (enabled, poll_interval) = {
                let config = self.config.read().await;
                (
                    config.notifications.enabled,
                    Duration::from_secs(config.notifications.poll_interval_secs.max(1)),
                )
            };

            if enabled {
                if let Err(e) = self.check().await {
                    error!("Error checking due dates: {}", e);
                }
            } else {
                debug!("Due-date monitor: notifications disabled");
            }

            sleep(poll_interval).await;
        }
    }

    async fn check(&mut self) -> Result<(), NotificationError> {
        let now = Utc::now();
        let pending = self.notifications.pending(now).await?;
        let fresh = self.take_unannounced(&pending, now.date_naive());

        if pending.is_empty() {
            debug!("Due-date monitor: nothing pending");
        }
        for notification in fresh {
            announce(notification);
        }
        Ok(())
    }

    /// Remember `pending` and return the entries not announced before.
    ///
    /// Keys stay remembered after they leave the pending list, so a dismissed
    /// notification that comes back is not logged twice. Keys whose due date is
    /// before `today` can never be pending again and are dropped.
    fn take_unannounced<'a>(
        &mut self,
        pending: &'a [DueDateNotification],
        today: NaiveDate,
    ) -> Vec<&'a DueDateNotification> {
        self.announced.retain(|(_, due_date)| *due_date >= today);
        pending
            .iter()
            .filter(|n| self.announced.insert((n.task_id, n.due_date)))
            .collect()
    }
}

fn announce(notification: &DueDateNotification) {
    info!(
        task_id = notification.task_id,
        project = %notification.project_name,
        due_date = %notification.due_date,
        timing = %notification.timing,
        "{}: {}",
        notification.task_name,
        notification.message
    );
}
