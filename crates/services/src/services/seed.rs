//! Starter data for an empty database.

use chrono::{NaiveDate, Utc};
use db::models::{
    achievement::{Achievement, AchievementType},
    counts::EntityCounts,
    note::{CreateNote, Note},
    paper::{CreatePaper, Paper},
    project::{CreateProject, Project},
    task::{CreateTask, Task},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SeedOutcome {
    Skipped { existing: EntityCounts },
    Seeded { created: EntityCounts },
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Insert the starter projects, notes, papers, tasks and achievement, unless
/// the user already has notes, papers, projects or achievements.
pub async fn seed(pool: &SqlitePool) -> Result<SeedOutcome, SeedError> {
    let existing = EntityCounts::fetch(pool).await?;
    if existing.has_user_content() {
        info!(?existing, "Database already has data, skipping seed");
        return Ok(SeedOutcome::Skipped { existing });
    }

    let press = Project::create(
        pool,
        &CreateProject {
            project_name: "Changes in the press environment".to_string(),
            description: Some(
                "How the press environment shifts in the digital media era, and how to respond"
                    .to_string(),
            ),
        },
    )
    .await?;
    let literacy = Project::create(
        pool,
        &CreateProject {
            project_name: "Media literacy education".to_string(),
            description: Some("Developing a media literacy program for citizens".to_string()),
        },
    )
    .await?;

    Note::create(
        pool,
        &CreateNote {
            title: "Welcome!".to_string(),
            content: "Welcome to the research manager. It keeps notes, papers, projects and \
                      achievements in one place."
                .to_string(),
            tags: tags(&["welcome", "system", "research"]),
        },
    )
    .await?;
    Note::create(
        pool,
        &CreateNote {
            title: "Getting started".to_string(),
            content: "1. Notes: capture ideas and memos\n\
                      2. Papers: keep track of important papers\n\
                      3. Projects: organise research projects and their tasks\n\
                      4. Achievements: record research output"
                .to_string(),
            tags: tags(&["guide", "manual"]),
        },
    )
    .await?;

    Paper::create(
        pool,
        &CreatePaper {
            authors: Some("Kim, Lee".to_string()),
            year: Some(2024),
            publisher: Some("Journal of Press Studies".to_string()),
            notes: Some("A broad analysis of how digital platforms affect journalism".to_string()),
            project_ids: Some(vec![press.id]),
            ..CreatePaper::titled("Journalism in the digital age")
        },
    )
    .await?;
    Paper::create(
        pool,
        &CreatePaper {
            authors: Some("Park, Choi".to_string()),
            year: Some(2024),
            publisher: Some("Education Review".to_string()),
            notes: Some("Effectiveness of media literacy programs across age groups".to_string()),
            project_ids: Some(vec![literacy.id]),
            ..CreatePaper::titled("Effectiveness of media literacy education")
        },
    )
    .await?;

    Task::create(
        pool,
        &CreateTask {
            description: Some("Survey and summarise prior literature".to_string()),
            due_date: NaiveDate::from_ymd_opt(2025, 8, 15),
            ..CreateTask::for_project(press.id, "Finish literature review")
        },
    )
    .await?;
    Task::create(
        pool,
        &CreateTask {
            description: Some("Questionnaire on current media literacy levels".to_string()),
            due_date: NaiveDate::from_ymd_opt(2025, 7, 30),
            ..CreateTask::for_project(literacy.id, "Design survey")
        },
    )
    .await?;

    Achievement::create(
        pool,
        "Research manager launched",
        Utc::now().date_naive(),
        "A digital platform for organised research management",
        AchievementType::Other,
    )
    .await?;

    let created = EntityCounts::fetch(pool).await?;
    info!(?created, "Database seeded");
    Ok(SeedOutcome::Seeded { created })
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    #[tokio::test]
    async fn seeds_once() {
        let db = DBService::new_in_memory().await.unwrap();

        let SeedOutcome::Seeded { created } = seed(&db.pool).await.unwrap() else {
            panic!("expected a fresh seed");
        };
        assert_eq!(created.projects, 2);
        assert_eq!(created.notes, 2);
        assert_eq!(created.papers, 2);
        assert_eq!(created.tasks, 2);
        assert_eq!(created.achievements, 1);

        let papers = Paper::find_all(&db.pool, &Default::default()).await.unwrap();
        assert!(papers.iter().all(|p| p.projects.len() == 1));

        match seed(&db.pool).await.unwrap() {
            SeedOutcome::Skipped { existing } => assert_eq!(existing, created),
            other => panic!("expected skip, got {other:?}"),
        }
    }
}
