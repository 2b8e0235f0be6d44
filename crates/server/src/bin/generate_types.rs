use std::{env, fs, path::Path};

use ts_rs::TS;

fn generate_types_content() -> String {
    let header = String::from(
        "// This file was generated by `generate_types`. Do not edit it manually.\n// Change the Rust types and rerun `cargo run --bin generate_types`.",
    );
    let decls: Vec<String> = vec![
        utils::response::ApiResponse::<(), ()>::decl(),
        db::models::project_link::ProjectSummary::decl(),
        db::models::counts::EntityCounts::decl(),
        db::models::note::Note::decl(),
        db::models::note::CreateNote::decl(),
        db::models::note::UpdateNote::decl(),
        db::models::paper::Paper::decl(),
        db::models::paper::PaperWithProjects::decl(),
        db::models::paper::CreatePaper::decl(),
        db::models::paper::UpdatePaper::decl(),
        db::models::project::Project::decl(),
        db::models::project::ProjectWithRelations::decl(),
        db::models::project::CreateProject::decl(),
        db::models::project::UpdateProject::decl(),
        db::models::task::TaskStatus::decl(),
        db::models::task::NotificationTiming::decl(),
        db::models::task::Task::decl(),
        db::models::task::TaskWithProject::decl(),
        db::models::task::CreateTask::decl(),
        db::models::task::UpdateTask::decl(),
        db::models::task::UpdateTaskStatus::decl(),
        db::models::achievement::AchievementType::decl(),
        db::models::achievement::Achievement::decl(),
        db::models::achievement::CreateAchievement::decl(),
        db::models::achievement::UpdateAchievement::decl(),
        db::models::expert::Expert::decl(),
        db::models::expert::ExpertWithProjects::decl(),
        db::models::expert::CreateExpert::decl(),
        db::models::expert::UpdateExpert::decl(),
        db::models::material::MaterialFileType::decl(),
        db::models::material::Material::decl(),
        db::models::material::MaterialWithProjects::decl(),
        db::models::material::CreateMaterial::decl(),
        db::models::material::UpdateMaterial::decl(),
        db::models::notification_dismissal::NotificationDismissal::decl(),
        services::services::notification::DueDateNotification::decl(),
        services::services::file_storage::UploadCategory::decl(),
        services::services::file_storage::StoredBlob::decl(),
        services::services::config::Config::decl(),
        services::services::config::NotificationConfig::decl(),
        services::services::config::UploadConfig::decl(),
        services::services::seed::SeedOutcome::decl(),
        services::services::database_validator::ValidationResult::decl(),
        server::routes::health::HealthStatus::decl(),
        server::routes::health::HealthReport::decl(),
        server::routes::health::DebugReport::decl(),
        server::routes::notifications::DismissAllResponse::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|d| {
            let trimmed = d.trim_start();
            if trimmed.starts_with("export") {
                d
            } else {
                format!("export {trimmed}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{header}\n\n{body}\n")
}

fn main() {
    let check_mode = env::args().any(|arg| arg == "--check");

    let shared_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../shared");
    let types_path = shared_path.join("types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&types_path).unwrap_or_default();
        if current == generated {
            println!("✅ shared/types.ts is up to date.");
            std::process::exit(0);
        } else {
            eprintln!("❌ shared/types.ts is not up to date. Please run 'cargo run --bin generate_types' and commit the changes.");
            std::process::exit(1);
        }
    }

    println!("Generating TypeScript types…");
    if let Err(e) = fs::create_dir_all(&shared_path) {
        eprintln!("Failed to create {}: {e}", shared_path.display());
        std::process::exit(1);
    }
    if let Err(e) = fs::write(&types_path, generated) {
        eprintln!("Failed to write {}: {e}", types_path.display());
        std::process::exit(1);
    }
    println!("✅ TypeScript types generated in {}", types_path.display());
}
