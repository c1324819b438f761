//! User settings loaded from the TOML config file.
//!
//! Stored in `~/.suichat/config.toml` by default. Resolution priority is
//! env var > config file > built-in default; this module only covers the
//! file layer, `crate::config` applies env overrides on top.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Keywords that select the NFT creation flow.
pub const DEFAULT_NFT_KEYWORDS: &[&str] = &[
    "create nft",
    "mint nft",
    "nft",
    "create image",
    "generate image",
    "story",
];

/// Keywords that select the token transfer flow.
pub const DEFAULT_TRANSFER_KEYWORDS: &[&str] = &[
    "chuyển",
    "transfer",
    "send",
    "gửi",
    "sui",
    "token",
    "coin",
    "địa chỉ",
    "address",
];

/// Settings persisted in the TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub routing: RoutingSettings,

    #[serde(default)]
    pub media: MediaSettings,

    #[serde(default)]
    pub server: ServerSettings,
}

/// Model gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible base URL (without `/chat/completions`).
    pub base_url: Option<String>,
    /// Model used when a request does not name one.
    pub model: Option<String>,
    /// Value for the `HTTP-Referer` header.
    pub referer: Option<String>,
    /// Value for the `X-Title` header.
    pub title: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            model: None,
            referer: None,
            title: None,
            temperature: 0.2,
            timeout_secs: 60,
            max_retries: 1,
            retry_backoff_ms: 500,
        }
    }
}

/// Intent routing and validation policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoutingSettings {
    pub nft_keywords: Vec<String>,
    pub transfer_keywords: Vec<String>,
    /// When set, requests without a mode go to `default_mode` instead of
    /// the generic chat handler.
    pub strict_mode_routing: bool,
    pub default_mode: String,
    /// Minimum length of a `0x`-prefixed recipient address.
    pub address_min_length: usize,
    /// Number of trailing turns shown to the model as conversation context.
    pub history_window: usize,
    /// Network label stamped on transfer intents.
    pub network: String,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            nft_keywords: DEFAULT_NFT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            transfer_keywords: DEFAULT_TRANSFER_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            strict_mode_routing: false,
            default_mode: "transfer".to_string(),
            address_min_length: 42,
            history_window: 6,
            network: "devnet".to_string(),
        }
    }
}

/// Image generation and hosting settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MediaSettings {
    pub image_model: String,
    pub inference_base_url: String,
    pub timeout_secs: u64,
    pub upload_url: String,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            image_model: "stabilityai/stable-diffusion-xl-base-1.0".to_string(),
            inference_base_url: "https://router.huggingface.co/hf-inference/models".to_string(),
            timeout_secs: 120,
            upload_url: "https://freeimage.host/api/1/upload".to_string(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub contract_config_path: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
            contract_config_path: None,
        }
    }
}

impl Settings {
    /// Default TOML config file path (`~/.suichat/config.toml`).
    pub fn default_toml_path() -> PathBuf {
        crate::bootstrap::suichat_home().join("config.toml")
    }

    /// Load settings from a TOML file.
    ///
    /// Returns `None` if the file doesn't exist. Returns an error only
    /// if the file exists but can't be parsed.
    pub fn load_toml(path: &Path) -> Result<Option<Self>, String> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {}", path.display(), e)),
        };

        let settings: Self = toml::from_str(&data)
            .map_err(|e| format!("invalid TOML in {}: {}", path.display(), e))?;
        Ok(Some(settings))
    }

    /// Write the settings as a TOML file with a short header.
    pub fn save_toml(&self, path: &Path) -> Result<(), String> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| format!("failed to serialize settings: {}", e))?;

        let content = format!(
            "# suichat configuration file.\n\
             #\n\
             # Priority: env var > this file > defaults.\n\
             \n\
             {raw}"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
        }
        std::fs::write(path, content)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))
    }
}
