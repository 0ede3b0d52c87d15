//! Environment-driven server settings.

use std::path::PathBuf;

use anyhow::Context;

/// Maximum accepted upload size.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Settings for the service binary, loaded from the environment in `main`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Where uploads are spooled while being processed.
    pub upload_dir: PathBuf,
    /// Where the vector index blob lives.
    pub data_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            upload_dir: PathBuf::from("./uploads"),
            data_dir: PathBuf::from("./data"),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Read settings from `DOCCHAT_*` variables, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let port = match std::env::var("DOCCHAT_PORT") {
            Ok(raw) => raw.parse().with_context(|| format!("invalid DOCCHAT_PORT {raw:?}"))?,
            Err(_) => defaults.port,
        };
        Ok(Self {
            host: std::env::var("DOCCHAT_HOST").unwrap_or(defaults.host),
            port,
            upload_dir: std::env::var("DOCCHAT_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            data_dir: std::env::var("DOCCHAT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            max_upload_bytes: defaults.max_upload_bytes,
        })
    }

    /// Location of the vector index blob.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("index.json")
    }
}
