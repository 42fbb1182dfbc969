//! Process settings from environment variables.

use crate::error::ConfigError;
use std::path::PathBuf;

const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    /// Directory holding every collection file. `DATA_DIR`, default `data`.
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// Optional replacement for the built-in collections. `CONFIG_PATH`.
    pub config_path: Option<PathBuf>,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("data"),
            host: "0.0.0.0".into(),
            port: 5000,
            config_path: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Settings::default();
        if let Some(dir) = lookup("DATA_DIR").filter(|v| !v.trim().is_empty()) {
            s.data_dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup("HOST").filter(|v| !v.trim().is_empty()) {
            s.host = host;
        }
        if let Some(port) = lookup("PORT") {
            s.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Settings(format!("PORT must be a port number, got '{}'", port)))?;
        }
        s.config_path = lookup("CONFIG_PATH").filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        if let Some(max) = lookup("MAX_BODY_BYTES") {
            s.max_body_bytes = max
                .trim()
                .parse()
                .map_err(|_| ConfigError::Settings(format!("MAX_BODY_BYTES must be a byte count, got '{}'", max)))?;
        }
        Ok(s)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
