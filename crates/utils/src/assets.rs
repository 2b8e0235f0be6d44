use std::{io, path::PathBuf};

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");

/// Environment variable that overrides where the database, config and uploads live.
pub const ASSET_DIR_ENV: &str = "RESEARCH_ASSET_DIR";

pub const CONFIG_FILE: &str = "config.json";
pub const DATABASE_FILE: &str = "db.sqlite";
pub const UPLOADS_DIR: &str = "uploads";

/// Directory holding the SQLite database, `config.json` and the upload store.
///
/// Debug builds use `dev_assets/` at the workspace root so development data
/// never mixes with an installed copy.
pub fn asset_dir() -> io::Result<PathBuf> {
    let path = if let Ok(dir) = std::env::var(ASSET_DIR_ENV) {
        PathBuf::from(dir)
    } else if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        ProjectDirs::from("org", "research", "research-manager")
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?
            .data_dir()
            .to_path_buf()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path)?;
    }
    Ok(path)
}

pub fn database_path() -> io::Result<PathBuf> {
    Ok(asset_dir()?.join(DATABASE_FILE))
}
