use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

/// Row count of every entity table.
#[derive(Debug, Clone, Copy, Default, FromRow, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityCounts {
    #[ts(type = "number")]
    pub notes: i64,
    #[ts(type = "number")]
    pub papers: i64,
    #[ts(type = "number")]
    pub projects: i64,
    #[ts(type = "number")]
    pub tasks: i64,
    #[ts(type = "number")]
    pub achievements: i64,
    #[ts(type = "number")]
    pub experts: i64,
    #[ts(type = "number")]
    pub materials: i64,
}

impl EntityCounts {
    pub async fn fetch(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, EntityCounts>(
            r#"SELECT
                   (SELECT COUNT(*) FROM notes)        AS notes,
                   (SELECT COUNT(*) FROM papers)       AS papers,
                   (SELECT COUNT(*) FROM projects)     AS projects,
                   (SELECT COUNT(*) FROM tasks)        AS tasks,
                   (SELECT COUNT(*) FROM achievements) AS achievements,
                   (SELECT COUNT(*) FROM experts)      AS experts,
                   (SELECT COUNT(*) FROM materials)    AS materials"#,
        )
        .fetch_one(pool)
        .await
    }

    /// Seeding is skipped as soon as any of these has data.
    pub fn has_user_content(&self) -> bool {
        self.notes > 0 || self.papers > 0 || self.projects > 0 || self.achievements > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        note::{CreateNote, Note},
        test_support,
    };

    #[tokio::test]
    async fn counts_every_table() {
        let pool = test_support::pool().await;
        let empty = EntityCounts::fetch(&pool).await.unwrap();
        assert_eq!(empty, EntityCounts::default());
        assert!(!empty.has_user_content());

        Note::create(
            &pool,
            &CreateNote {
                title: "Idea".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let counts = EntityCounts::fetch(&pool).await.unwrap();
        assert_eq!(counts.notes, 1);
        assert!(counts.has_user_content());
    }
}
