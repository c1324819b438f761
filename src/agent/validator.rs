//! Model output parsing and intent validation.
//!
//! Raw gateway text becomes exactly one [`Envelope`]. Non-JSON text is a
//! plain chat reply. Structured replies are only accepted in the shapes the
//! current handler asked for; anything else is downgraded to chat.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::agent::intent::{Envelope, NftInfo, Recipient, TransferIntent};
use crate::agent::router::Route;
use crate::error::{ImageError, ValidationError};
use crate::media::GeneratedImage;

const NFT_READY_MESSAGE: &str =
    "Perfect! I have all the information needed. Let me generate an image for your NFT...";

/// Result of decoding raw model text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    Plain(String),
    Structured {
        kind: String,
        payload: serde_json::Map<String, Value>,
    },
}

/// Decode model output. Only a JSON object with a string `type` counts as
/// structured; a surrounding markdown code fence is tolerated.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let candidate = strip_code_fence(raw.trim());
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(payload)) => match payload.get("type").and_then(Value::as_str) {
            Some(kind) => ParsedReply::Structured {
                kind: kind.to_string(),
                payload,
            },
            None => ParsedReply::Plain(raw.to_string()),
        },
        _ => ParsedReply::Plain(raw.to_string()),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string (`json`) on the opening line.
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => body.trim(),
    }
}

/// Address and amount rules for transfer intents.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    address_min_length: usize,
    network: String,
}

impl ResponseValidator {
    pub fn new(address_min_length: usize, network: impl Into<String>) -> Self {
        Self {
            address_min_length,
            network: network.into(),
        }
    }

    pub fn address_min_length(&self) -> usize {
        self.address_min_length
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// `0x` prefix and at least `address_min_length` characters.
    pub fn is_valid_address(&self, address: &str) -> bool {
        address.starts_with("0x") && address.chars().count() >= self.address_min_length
    }

    /// Rebuild a transfer intent from untrusted fields.
    ///
    /// The sender is always `session_wallet`. Fields other than recipients
    /// and amounts are ignored, so balances the model echoed never leave
    /// the server. Every recipient is checked before any is accepted.
    pub fn extract_transfer(
        &self,
        intent: &Value,
        session_wallet: &str,
    ) -> Result<TransferIntent, ValidationError> {
        let legs: Vec<(String, Option<Decimal>)> =
            match intent.get("recipients").and_then(Value::as_array) {
                Some(list) if !list.is_empty() => list
                    .iter()
                    .map(|r| (address_field(r), r.get("amount").and_then(parse_amount)))
                    .collect(),
                Some(_) => return Err(ValidationError::NoRecipients),
                None => match intent.get("to_address") {
                    Some(_) => vec![(
                        address_field(intent),
                        intent.get("amount").and_then(parse_amount),
                    )],
                    None => return Err(ValidationError::MissingField("to_address")),
                },
            };

        let invalid: Vec<String> = legs
            .iter()
            .filter(|(address, _)| !self.is_valid_address(address))
            .map(|(address, _)| address.clone())
            .collect();
        if !invalid.is_empty() {
            return Err(ValidationError::InvalidAddress(invalid));
        }

        let mut recipients = Vec::with_capacity(legs.len());
        for (to_address, amount) in legs {
            match amount {
                Some(amount) if amount > Decimal::ZERO => {
                    recipients.push(Recipient { to_address, amount })
                }
                _ => return Err(ValidationError::NonPositiveAmount { address: to_address }),
            }
        }

        let is_batch = intent
            .get("recipients")
            .and_then(Value::as_array)
            .is_some();
        let transfer = if is_batch {
            TransferIntent::batch(session_wallet, recipients, self.network.clone())
        } else {
            let Recipient { to_address, amount } = recipients.remove(0);
            TransferIntent::single(session_wallet, to_address, amount, self.network.clone())
        };
        if transfer.checked_total().is_none() {
            return Err(ValidationError::AmountOverflow);
        }
        Ok(transfer)
    }

    /// Transfer payload to a `transfer_intent` or `transfer_error` envelope.
    pub fn validate_transfer(&self, intent: &Value, session_wallet: &str) -> Envelope {
        match self.extract_transfer(intent, session_wallet) {
            Ok(intent) => {
                let message = confirmation_message(&intent);
                Envelope::TransferIntent {
                    transfer_intent: intent,
                    message,
                }
            }
            Err(err) => {
                tracing::info!(code = err.code(), error = %err, "transfer intent rejected");
                transfer_error(err)
            }
        }
    }

    /// Map raw model text to the envelope allowed for `route`.
    pub fn interpret(&self, route: Route, raw: &str, session_wallet: &str) -> Envelope {
        let (kind, payload) = match parse_reply(raw) {
            ParsedReply::Plain(text) => return Envelope::chat(text),
            ParsedReply::Structured { kind, payload } => (kind, payload),
        };

        match (route, kind.as_str()) {
            (_, "chat") => match payload.get("message").and_then(Value::as_str) {
                Some(message) => Envelope::chat(message),
                None => Envelope::chat(raw),
            },
            (Route::Transfer, "transfer_intent") => {
                let intent = payload
                    .get("transfer_intent")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(payload.clone()));
                self.validate_transfer(&intent, session_wallet)
            }
            (Route::Nft, "nft_collect_info") => {
                let nft_info = payload
                    .get("nft_info")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<NftInfo>(v).ok())
                    .unwrap_or_default();
                Envelope::NftCollectInfo {
                    message: message_or(&payload, raw),
                    nft_info,
                }
            }
            (Route::Nft, "nft_creation_intent") => {
                match payload
                    .get("nft_creation_intent")
                    .cloned()
                    .map(serde_json::from_value::<NftInfo>)
                {
                    Some(Ok(info)) => Envelope::NftCreationIntent {
                        nft_creation_intent: info,
                        message: message_or(&payload, NFT_READY_MESSAGE),
                    },
                    _ => {
                        tracing::warn!("malformed nft_creation_intent payload, replying as chat");
                        Envelope::chat(raw)
                    }
                }
            }
            (route, other) => {
                tracing::warn!(
                    route = route.node_name(),
                    reply_type = other,
                    "unexpected structured reply, replying as chat"
                );
                Envelope::chat(raw)
            }
        }
    }
}

/// Attach the generated image, or empty image fields if generation failed.
pub fn finalize_nft(mut info: NftInfo, image: Result<GeneratedImage, ImageError>) -> NftInfo {
    match image {
        Ok(image) => {
            info.image_url = Some(image.data_url());
            info.image_base64 = Some(image.base64);
        }
        Err(err) => {
            tracing::warn!(error = %err, "image generation failed, continuing without image");
            info.image_url = Some(String::new());
            info.image_base64 = Some(String::new());
        }
    }
    info
}

pub fn transfer_error(err: ValidationError) -> Envelope {
    Envelope::TransferError {
        error: err.code().to_string(),
        message: err.to_string(),
        invalid_addresses: err.offending_addresses().to_vec(),
    }
}

pub fn confirmation_message(intent: &TransferIntent) -> String {
    let count = intent.recipient_count();
    format!(
        "Transfer intent confirmed: {} {} to {} recipient{}. Opening confirmation dialog...",
        intent.total_amount().normalize(),
        intent.token_type,
        count,
        if count == 1 { "" } else { "s" }
    )
}

fn address_field(value: &Value) -> String {
    match value.get("to_address") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn parse_amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn message_or(payload: &serde_json::Map<String, Value>, fallback: &str) -> String {
    payload
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}
