use std::sync::Arc;

use common::storage::UploadStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::evaluation::signals::SignalDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub signals: Arc<SignalDispatcher>,
    pub uploads: Arc<UploadStore>,
}
