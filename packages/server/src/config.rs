use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::MqAppConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Registers the test-upload endpoints under `/api/v1/debug`.
    #[serde(default)]
    pub debug: bool,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    100
}
fn default_min_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Where editor uploads live and how their URLs are built.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Root directory of global editor uploads.
    pub upload_root: PathBuf,
    /// Directory served under `media_url`; usually a parent of `upload_root`.
    pub media_root: PathBuf,
    /// URL prefix of `media_root`.
    pub media_url: String,
    /// When set, upload URLs are `upload_prefix` + path relative to `upload_root`.
    #[serde(default)]
    pub upload_prefix: Option<String>,
    /// Store (and browse) uploads in a per-user subdirectory.
    #[serde(default)]
    pub restrict_by_user: bool,
    /// Parent directory of the per-project folders.
    pub projects_root: PathBuf,
    /// Name of the world-readable folder inside each project.
    pub public_folder_name: String,
    /// URL prefix of the project file server.
    pub site_prefix: String,
    /// Request body limit for upload endpoints, in bytes.
    pub max_upload_size: usize,
}

/// SMTP settings; when the section is absent mail is only logged.
#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub from_address: String,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    pub uploads: UploadConfig,
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.debug", false)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("uploads.upload_root", "./media/uploads")?
            .set_default("uploads.media_root", "./media")?
            .set_default("uploads.media_url", "/media/")?
            .set_default("uploads.projects_root", "./media/projects")?
            .set_default("uploads.public_folder_name", "public_html")?
            .set_default("uploads.site_prefix", "/site")?
            .set_default("uploads.max_upload_size", 32 * 1024 * 1024)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., PODIUM__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("PODIUM").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
