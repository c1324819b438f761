use std::path::PathBuf;

use crate::config::helpers::{list_env, optional_env, parse_env};
use crate::error::ConfigError;
use crate::settings::Settings;

/// HTTP gateway listener configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// `["*"]` allows any origin.
    pub cors_allowed_origins: Vec<String>,
    /// Deployment record written by the contract deploy script.
    pub contract_config_path: PathBuf,
}

impl HttpConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let server = &settings.server;

        let cors_allowed_origins = list_env("CORS_ALLOWED_ORIGINS")?
            .unwrap_or_else(|| server.cors_allowed_origins.clone());
        if cors_allowed_origins.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "CORS_ALLOWED_ORIGINS".to_string(),
                message: "must list at least one origin or '*'".to_string(),
            });
        }

        Ok(Self {
            host: optional_env("HTTP_HOST")?.unwrap_or_else(|| server.host.clone()),
            port: parse_env::<u16>("HTTP_PORT", "a valid port number")?.unwrap_or(server.port),
            cors_allowed_origins,
            contract_config_path: optional_env("CONTRACT_CONFIG_PATH")?
                .map(PathBuf::from)
                .or_else(|| server.contract_config_path.clone())
                .unwrap_or_else(|| PathBuf::from("./contract_config.json")),
        })
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_allowed_origins.iter().any(|o| o == "*")
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
            contract_config_path: PathBuf::from("./contract_config.json"),
        }
    }
}
