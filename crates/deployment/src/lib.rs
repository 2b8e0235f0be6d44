use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use db::DBService;
use services::services::{
    config::{Config, ConfigError, load_config_from_file, save_config_to_file},
    due_date_monitor::DueDateMonitor,
    file_storage::{BlobStore, LocalBlobStore, StorageError},
    notification::NotificationService,
};
use thiserror::Error;
use tokio::{sync::RwLock, task::JoinHandle};

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn db(&self) -> &DBService;

    fn config(&self) -> &Arc<RwLock<Config>>;

    fn config_path(&self) -> &Path;

    fn storage(&self) -> &Arc<dyn BlobStore>;

    fn notifications(&self) -> &NotificationService;

    /// Validate, persist and apply a new config. The running monitor picks it
    /// up on its next tick.
    async fn update_config(&self, new_config: Config) -> Result<Config, DeploymentError> {
        save_config_to_file(&new_config, self.config_path()).await?;
        *self.config().write().await = new_config.clone();
        tracing::info!(?new_config, "Config updated");
        Ok(new_config)
    }

    fn spawn_background_services(&self) -> Vec<JoinHandle<()>> {
        vec![DueDateMonitor::spawn(self.db().clone(), self.config().clone())]
    }
}

#[derive(Clone)]
pub struct LocalDeployment {
    db: DBService,
    config: Arc<RwLock<Config>>,
    config_path: PathBuf,
    storage: Arc<dyn BlobStore>,
    notifications: NotificationService,
}

impl LocalDeployment {
    /// Build a deployment over `db` whose config and uploads live under `asset_dir`.
    pub async fn with_asset_dir(asset_dir: &Path, db: DBService) -> Result<Self, DeploymentError> {
        let config_path = asset_dir.join(utils::assets::CONFIG_FILE);
        let config = load_config_from_file(&config_path).await;
        let storage = LocalBlobStore::new(asset_dir.join(utils::assets::UPLOADS_DIR))?;
        tracing::info!(uploads = %storage.root().display(), "Blob store ready");

        Ok(Self {
            notifications: NotificationService::new(db.clone()),
            db,
            config: Arc::new(RwLock::new(config)),
            config_path,
            storage: Arc::new(storage),
        })
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let asset_dir = utils::assets::asset_dir()?;
        let db = DBService::new().await?;
        Self::with_asset_dir(&asset_dir, db).await
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn storage(&self) -> &Arc<dyn BlobStore> {
        &self.storage
    }

    fn notifications(&self) -> &NotificationService {
        &self.notifications
    }
}
