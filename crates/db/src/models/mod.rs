pub mod achievement;
pub mod counts;
pub mod expert;
pub mod material;
pub mod note;
pub mod notification_dismissal;
pub mod paper;
pub mod project;
pub mod project_link;
pub mod task;

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;

    use crate::DBService;

    pub async fn pool() -> SqlitePool {
        DBService::new_in_memory().await.unwrap().pool
    }
}
