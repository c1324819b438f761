//! Request and response DTOs for the HTTP API.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::agent::{Envelope, NftInfo, Phase, SessionSnapshot, TransferIntent};

// --- Chat ---

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    /// Frontends send this as a string or a bare number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub current_balance: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// Chat reply. HTTP status is always 200; `success` carries the outcome.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Envelope>,
    /// Plain text of the reply, for clients that only render strings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    pub fn ok(envelope: Envelope) -> Self {
        Self {
            success: true,
            reply: Some(envelope.message().to_string()),
            response: Some(envelope),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            reply: None,
            error: Some(error.into()),
        }
    }
}

// --- Models ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub success: bool,
    pub data: Vec<ModelInfo>,
}

// --- Images ---

#[derive(Debug, Default, Deserialize)]
pub struct ImageGenerationRequest {
    #[serde(default)]
    pub story_prompt: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl ImageGenerationRequest {
    /// `story_prompt` wins over `prompt`; blank values count as absent.
    pub fn text(&self) -> Option<&str> {
        [self.story_prompt.as_deref(), self.prompt.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ImageGenerationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadImageRequest {
    #[serde(default)]
    pub image_base64: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct UploadImageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct FileUploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// --- Wallet-side execution echoes ---

#[derive(Debug, Default, Serialize)]
pub struct TransferExecuteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub requires_wallet_signature: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_intent: Option<TransferIntent>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub total_amount: Option<Decimal>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NftMintRequest {
    #[serde(default)]
    pub owner_address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default, Serialize)]
pub struct NftMintResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub requires_wallet_signature: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// --- Sessions ---

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_key: String,
    pub phase: Phase,
    pub turn_count: usize,
    pub nft_info: NftInfo,
    pub wallet_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_balance: Option<String>,
    pub updated_at: String,
}

impl From<SessionSnapshot> for SessionResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        let mut nft_info = snapshot.nft_info;
        // Image bytes are large; the URL is enough for inspection.
        nft_info.image_base64 = None;
        Self {
            session_key: snapshot.key.to_string(),
            phase: snapshot.phase,
            turn_count: snapshot.turn_count,
            nft_info,
            wallet_address: snapshot.wallet_address,
            current_balance: snapshot.current_balance,
            updated_at: snapshot.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

// --- Health ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
