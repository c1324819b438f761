//! Message routing to handler nodes.
//!
//! Classification is a pure keyword match over the lowercased message. The
//! keyword lists come from configuration so deployments can tune them.

use aho_corasick::AhoCorasick;
use serde::{Deserialize, Serialize};

use crate::agent::session::Phase;
use crate::config::RoutingConfig;
use crate::error::ConfigError;

/// Workflow a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Transfer,
    Nft,
}

impl Mode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "transfer" => Some(Self::Transfer),
            "nft" => Some(Self::Nft),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Nft => "nft",
        }
    }

    fn route(self) -> Route {
        match self {
            Self::Transfer => Route::Transfer,
            Self::Nft => Route::Nft,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handler node selected for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Transfer,
    Nft,
    Generic,
}

impl Route {
    /// Graph node name, used in logs.
    pub fn node_name(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer_handler",
            Self::Nft => "nft_collect_info",
            Self::Generic => "generic_llm",
        }
    }
}

/// Keyword-based intent classifier.
pub struct IntentClassifier {
    nft: AhoCorasick,
    transfer: AhoCorasick,
    strict_mode_routing: bool,
    default_mode: Mode,
}

impl IntentClassifier {
    pub fn new(
        nft_keywords: &[String],
        transfer_keywords: &[String],
        strict_mode_routing: bool,
        default_mode: Mode,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            nft: build_matcher(nft_keywords, "NFT_KEYWORDS")?,
            transfer: build_matcher(transfer_keywords, "TRANSFER_KEYWORDS")?,
            strict_mode_routing,
            default_mode,
        })
    }

    pub fn from_config(config: &RoutingConfig) -> Result<Self, ConfigError> {
        Self::new(
            &config.nft_keywords,
            &config.transfer_keywords,
            config.strict_mode_routing,
            config.default_mode,
        )
    }

    pub fn matches_nft(&self, text: &str) -> bool {
        self.nft.is_match(&text.to_lowercase())
    }

    pub fn matches_transfer(&self, text: &str) -> bool {
        self.transfer.is_match(&text.to_lowercase())
    }

    /// Whether `text` belongs to the other workflow than the one `phase`
    /// is in. The caller resets the session when this holds.
    pub fn is_topic_switch(&self, text: &str, phase: Phase) -> bool {
        match phase.mode() {
            Some(Mode::Nft) => self.matches_transfer(text),
            Some(Mode::Transfer) => self.matches_nft(text),
            None => false,
        }
    }

    /// Pick exactly one handler for this turn.
    ///
    /// An explicit mode wins outright. A phase that already belongs to a
    /// mode keeps it unless the text switches topic. Otherwise the NFT list
    /// is checked before the transfer list. With nothing matched the turn
    /// goes to generic chat, or to the default mode under strict routing.
    pub fn classify(&self, text: &str, phase: Phase, explicit_mode: Option<Mode>) -> Route {
        if let Some(mode) = explicit_mode {
            return mode.route();
        }

        if let Some(mode) = phase.mode()
            && !self.is_topic_switch(text, phase)
        {
            return mode.route();
        }

        let lowered = text.to_lowercase();
        if self.nft.is_match(&lowered) {
            Route::Nft
        } else if self.transfer.is_match(&lowered) {
            Route::Transfer
        } else if self.strict_mode_routing {
            self.default_mode.route()
        } else {
            Route::Generic
        }
    }

    pub fn strict_mode_routing(&self) -> bool {
        self.strict_mode_routing
    }

    pub fn default_mode(&self) -> Mode {
        self.default_mode
    }
}

fn build_matcher(keywords: &[String], key: &str) -> Result<AhoCorasick, ConfigError> {
    let lowered: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    AhoCorasick::new(&lowered).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
