use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

const ACHIEVEMENT_COLUMNS: &str =
    "id, title, achievement_date, description, achievement_type, created_at, updated_at";

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "achievement_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AchievementType {
    Publication,
    Presentation,
    Award,
    #[default]
    Other,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: i32,
    pub title: String,
    pub achievement_date: NaiveDate,
    pub description: String,
    #[serde(rename = "type")]
    pub achievement_type: AchievementType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Title, date and type are required; the route rejects the body before it gets here otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateAchievement {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "utils::date::deserialize_optional_date")]
    pub achievement_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub achievement_type: Option<AchievementType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAchievement {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "utils::date::deserialize_optional_date")]
    pub achievement_date: Option<NaiveDate>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub achievement_type: Option<AchievementType>,
}

impl UpdateAchievement {
    pub fn apply_to(&self, existing: Achievement) -> Achievement {
        Achievement {
            title: self.title.clone().unwrap_or(existing.title),
            achievement_date: self.achievement_date.unwrap_or(existing.achievement_date),
            description: self.description.clone().unwrap_or(existing.description),
            achievement_type: self.achievement_type.unwrap_or(existing.achievement_type),
            ..existing
        }
    }
}

/// `?type=` narrows to one kind, `?year=` to one calendar year.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AchievementFilter {
    #[serde(rename = "type")]
    pub achievement_type: Option<AchievementType>,
    pub year: Option<i32>,
}

impl Achievement {
    pub async fn find_all(
        pool: &SqlitePool,
        filter: &AchievementFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"SELECT {ACHIEVEMENT_COLUMNS}
               FROM achievements
               WHERE ($1 IS NULL OR achievement_type = $1)
                 AND ($2 IS NULL OR CAST(strftime('%Y', achievement_date) AS INTEGER) = $2)
               ORDER BY achievement_date DESC, id DESC"#
        );
        sqlx::query_as::<_, Achievement>(&sql)
            .bind(filter.achievement_type)
            .bind(filter.year)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {ACHIEVEMENT_COLUMNS} FROM achievements WHERE id = $1");
        sqlx::query_as::<_, Achievement>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        title: &str,
        achievement_date: NaiveDate,
        description: &str,
        achievement_type: AchievementType,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"INSERT INTO achievements (title, achievement_date, description, achievement_type)
               VALUES ($1, $2, $3, $4)
               RETURNING {ACHIEVEMENT_COLUMNS}"#
        );
        sqlx::query_as::<_, Achievement>(&sql)
            .bind(title.trim())
            .bind(achievement_date)
            .bind(description)
            .bind(achievement_type)
            .fetch_one(pool)
            .await
    }

    pub async fn update(pool: &SqlitePool, achievement: &Achievement) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"UPDATE achievements
               SET title = $2, achievement_date = $3, description = $4, achievement_type = $5,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING {ACHIEVEMENT_COLUMNS}"#
        );
        sqlx::query_as::<_, Achievement>(&sql)
            .bind(achievement.id)
            .bind(achievement.title.trim())
            .bind(achievement.achievement_date)
            .bind(&achievement.description)
            .bind(achievement.achievement_type)
            .fetch_one(pool)
            .await
    }

    pub async fn delete<'e, E>(executor: E, id: i32) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM achievements WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn body_accepts_iso_timestamps_and_type_key() {
        let body: CreateAchievement = serde_json::from_value(serde_json::json!({
            "title": "Best paper",
            "achievementDate": "2024-11-02T00:00:00.000Z",
            "type": "award"
        }))
        .unwrap();
        assert_eq!(body.achievement_date, Some(date(2024, 11, 2)));
        assert_eq!(body.achievement_type, Some(AchievementType::Award));

        let missing: CreateAchievement =
            serde_json::from_value(serde_json::json!({ "title": "x", "achievementDate": "" })).unwrap();
        assert_eq!(missing.achievement_date, None);
        assert_eq!(missing.achievement_type, None);
    }

    #[tokio::test]
    async fn ordered_by_date_and_filtered() {
        let pool = test_support::pool().await;
        Achievement::create(&pool, "Conference talk", date(2023, 5, 1), "", AchievementType::Presentation)
            .await
            .unwrap();
        let award = Achievement::create(&pool, "Best paper", date(2024, 11, 2), "", AchievementType::Award)
            .await
            .unwrap();
        Achievement::create(&pool, "Journal article", date(2024, 2, 10), "", AchievementType::Publication)
            .await
            .unwrap();

        let all = Achievement::find_all(&pool, &AchievementFilter::default()).await.unwrap();
        let titles: Vec<_> = all.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Best paper", "Journal article", "Conference talk"]);

        let awards = Achievement::find_all(
            &pool,
            &AchievementFilter {
                achievement_type: Some(AchievementType::Award),
                year: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(awards, vec![award.clone()]);

        let in_2024 = Achievement::find_all(
            &pool,
            &AchievementFilter {
                achievement_type: None,
                year: Some(2024),
            },
        )
        .await
        .unwrap();
        assert_eq!(in_2024.len(), 2);

        let patch = UpdateAchievement {
            description: Some("ICA 2024".into()),
            ..Default::default()
        };
        let updated = Achievement::update(&pool, &patch.apply_to(award)).await.unwrap();
        assert_eq!(updated.description, "ICA 2024");
        assert_eq!(updated.achievement_type, AchievementType::Award);
    }
}
