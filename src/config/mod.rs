//! Configuration for suichat.
//!
//! Settings are loaded with priority: env var > TOML config file > default.
//! Credentials usually live in `./.env` or `~/.suichat/.env` (loaded via
//! dotenvy early in startup). Missing credentials are not a startup error;
//! the request that needs them fails instead.

mod channels;
pub(crate) mod helpers;
mod llm;
mod media;
mod routing;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::settings::Settings;

pub use self::channels::HttpConfig;
pub use self::llm::{DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL, LlmConfig};
pub use self::media::MediaConfig;
pub use self::routing::RoutingConfig;

/// Main configuration for the service.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub llm: LlmConfig,
    pub media: MediaConfig,
    pub routing: RoutingConfig,
    pub http: HttpConfig,
}

pub(crate) fn normalize_variant(value: &str) -> String {
    value.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

impl Config {
    /// Load configuration from environment variables and the default TOML
    /// file (`~/.suichat/config.toml`) if present.
    ///
    /// Loads both `./.env` (higher priority) and `~/.suichat/.env` (lower
    /// priority) via dotenvy, which never overwrites existing vars.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_toml(None)
    }

    /// Load from env with an optional explicit TOML config file.
    pub fn from_env_with_toml(toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        crate::bootstrap::load_suichat_env();
        let settings = Self::load_settings(toml_path)?;
        Self::build(&settings)
    }

    /// Load the TOML settings layer.
    ///
    /// If `explicit_path` is `Some`, a missing or unreadable file is fatal.
    /// If `None`, the default path is tried and a missing file is ignored.
    fn load_settings(explicit_path: Option<&Path>) -> Result<Settings, ConfigError> {
        let path = explicit_path
            .map(PathBuf::from)
            .unwrap_or_else(Settings::default_toml_path);

        match Settings::load_toml(&path) {
            Ok(Some(settings)) => {
                tracing::debug!("Loaded TOML config from {}", path.display());
                Ok(settings)
            }
            Ok(None) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Ok(Settings::default())
            }
            Err(e) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Failed to load config file {}: {}",
                        path.display(),
                        e
                    )));
                }
                tracing::warn!("Failed to load default config file: {}", e);
                Ok(Settings::default())
            }
        }
    }

    /// Resolve every section against the env, falling back to `settings`.
    pub fn build(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            llm: LlmConfig::resolve(settings)?,
            media: MediaConfig::resolve(settings)?,
            routing: RoutingConfig::resolve(settings)?,
            http: HttpConfig::resolve(settings)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Mode;
    use secrecy::ExposeSecret;
    use std::sync::Mutex;
    use std::time::Duration;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const KEYS: &[&str] = &[
        "OPEN_ROUTER_TOKEN",
        "OPENAI_BASE_URL",
        "OPENAI_MODEL",
        "FRONTEND_URL",
        "X_TITLE",
        "LLM_TEMPERATURE",
        "LLM_TIMEOUT_SECS",
        "LLM_MAX_RETRIES",
        "LLM_RETRY_BACKOFF_MS",
        "HF_TOKEN",
        "HF_IMAGE_MODEL",
        "HF_INFERENCE_BASE_URL",
        "IMAGE_TIMEOUT_SECS",
        "FREEIMAGE_API_KEY",
        "FREEIMAGE_UPLOAD_URL",
        "HTTP_HOST",
        "HTTP_PORT",
        "CORS_ALLOWED_ORIGINS",
        "CONTRACT_CONFIG_PATH",
        "ADDRESS_MIN_LENGTH",
        "STRICT_MODE_ROUTING",
        "DEFAULT_MODE",
        "SUI_NETWORK",
        "NFT_KEYWORDS",
        "TRANSFER_KEYWORDS",
        "HISTORY_WINDOW",
    ];

    fn clear_env() {
        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            for key in KEYS {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    fn build_uses_defaults_without_env() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_env();

        let config = Config::build(&Settings::default()).expect("build");
        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.timeout, Duration::from_secs(60));
        assert_eq!(config.llm.max_retries, 1);
        assert_eq!(config.routing.address_min_length, 42);
        assert_eq!(config.routing.default_mode, Mode::Transfer);
        assert!(!config.routing.strict_mode_routing);
        assert_eq!(config.routing.history_window, 6);
        assert_eq!(config.routing.network, "devnet");
        assert_eq!(config.http.port, 8000);
        assert!(config.http.allows_any_origin());
        assert_eq!(
            config.http.contract_config_path,
            PathBuf::from("./contract_config.json")
        );
        assert_eq!(config.media.image_timeout, Duration::from_secs(120));
    }

    #[test]
    fn env_overrides_settings() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_env();

        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::set_var("OPEN_ROUTER_TOKEN", "sk-or-test");
            std::env::set_var("OPENAI_BASE_URL", "http://127.0.0.1:9999/v1/");
            std::env::set_var("STRICT_MODE_ROUTING", "yes");
            std::env::set_var("DEFAULT_MODE", "NFT");
            std::env::set_var("ADDRESS_MIN_LENGTH", "66");
            std::env::set_var("HTTP_PORT", "9100");
            std::env::set_var("CORS_ALLOWED_ORIGINS", "http://localhost:5173, https://app.example");
            std::env::set_var("NFT_KEYWORDS", "Artwork, mint");
        }

        let mut settings = Settings::default();
        settings.routing.address_min_length = 10;
        settings.server.port = 7000;

        let config = Config::build(&settings).expect("build");
        assert_eq!(
            config.llm.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("sk-or-test".to_string())
        );
        assert_eq!(
            config.llm.completions_url(),
            "http://127.0.0.1:9999/v1/chat/completions"
        );
        assert!(config.routing.strict_mode_routing);
        assert_eq!(config.routing.default_mode, Mode::Nft);
        assert_eq!(config.routing.address_min_length, 66);
        assert_eq!(config.routing.nft_keywords, vec!["artwork", "mint"]);
        assert_eq!(config.http.port, 9100);
        assert!(!config.http.allows_any_origin());
        assert_eq!(config.http.cors_allowed_origins.len(), 2);

        clear_env();
    }

    #[test]
    fn settings_layer_applies_without_env() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_env();

        let mut settings = Settings::default();
        settings.routing.address_min_length = 10;
        settings.routing.strict_mode_routing = true;
        settings.llm.model = Some("google/gemini-2.0-flash-exp:free".to_string());

        let config = Config::build(&settings).expect("build");
        assert_eq!(config.routing.address_min_length, 10);
        assert!(config.routing.strict_mode_routing);
        assert_eq!(config.llm.model, "google/gemini-2.0-flash-exp:free");
    }

    #[test]
    fn invalid_values_name_their_key() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");

        for (key, value) in [
            ("DEFAULT_MODE", "swap"),
            ("HTTP_PORT", "not-a-port"),
            ("STRICT_MODE_ROUTING", "maybe"),
            ("LLM_TIMEOUT_SECS", "0"),
            ("ADDRESS_MIN_LENGTH", "2"),
        ] {
            clear_env();
            // SAFETY: Guarded by ENV_MUTEX in tests.
            unsafe {
                std::env::set_var(key, value);
            }

            match Config::build(&Settings::default()).unwrap_err() {
                ConfigError::InvalidValue { key: got, .. } => assert_eq!(got, key),
                other => panic!("unexpected error for {key}: {other:?}"),
            }
        }

        clear_env();
    }

    #[test]
    fn explicit_missing_toml_is_fatal() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_env();

        let dir = tempfile::tempdir().expect("tempdir");
        let err = Config::load_settings(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn explicit_toml_is_loaded() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_env();

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[routing]\nhistory_window = 2\n[server]\nport = 8123\n")
            .expect("write toml");

        let settings = Config::load_settings(Some(&path)).expect("settings");
        let config = Config::build(&settings).expect("build");
        assert_eq!(config.routing.history_window, 2);
        assert_eq!(config.http.port, 8123);
    }
}
