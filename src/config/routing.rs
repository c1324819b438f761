use crate::agent::Mode;
use crate::config::helpers::{list_env, optional_env, parse_bool_env, parse_env};
use crate::config::normalize_variant;
use crate::error::ConfigError;
use crate::settings::Settings;

/// Intent routing and response validation policy.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub nft_keywords: Vec<String>,
    pub transfer_keywords: Vec<String>,
    pub strict_mode_routing: bool,
    pub default_mode: Mode,
    pub address_min_length: usize,
    pub history_window: usize,
    pub network: String,
}

impl RoutingConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let routing = &settings.routing;

        let default_mode_raw =
            optional_env("DEFAULT_MODE")?.unwrap_or_else(|| routing.default_mode.clone());
        let default_mode = parse_mode(&default_mode_raw, "DEFAULT_MODE")?;

        let address_min_length =
            parse_env::<usize>("ADDRESS_MIN_LENGTH", "a positive integer")?
                .unwrap_or(routing.address_min_length);
        // "0x" alone is never an address.
        if address_min_length < 3 {
            return Err(ConfigError::InvalidValue {
                key: "ADDRESS_MIN_LENGTH".to_string(),
                message: format!("must be at least 3, got {address_min_length}"),
            });
        }

        let nft_keywords = lowercase_all(
            list_env("NFT_KEYWORDS")?.unwrap_or_else(|| routing.nft_keywords.clone()),
        );
        let transfer_keywords = lowercase_all(
            list_env("TRANSFER_KEYWORDS")?.unwrap_or_else(|| routing.transfer_keywords.clone()),
        );

        Ok(Self {
            nft_keywords,
            transfer_keywords,
            strict_mode_routing: parse_bool_env("STRICT_MODE_ROUTING")?
                .unwrap_or(routing.strict_mode_routing),
            default_mode,
            address_min_length,
            history_window: parse_env::<usize>("HISTORY_WINDOW", "a non-negative integer")?
                .unwrap_or(routing.history_window),
            network: optional_env("SUI_NETWORK")?.unwrap_or_else(|| routing.network.clone()),
        })
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        let routing = crate::settings::RoutingSettings::default();
        Self {
            nft_keywords: routing.nft_keywords,
            transfer_keywords: routing.transfer_keywords,
            strict_mode_routing: routing.strict_mode_routing,
            default_mode: Mode::Transfer,
            address_min_length: routing.address_min_length,
            history_window: routing.history_window,
            network: routing.network,
        }
    }
}

fn parse_mode(value: &str, key: &str) -> Result<Mode, ConfigError> {
    Mode::parse(&normalize_variant(value)).ok_or_else(|| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected 'transfer' or 'nft', got '{value}'"),
    })
}

fn lowercase_all(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}
