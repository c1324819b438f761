//! Typed reply envelopes and the intents they carry.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Token symbol stamped on every transfer intent.
pub const TRANSFER_TOKEN: &str = "SUI";

/// One leg of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub to_address: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Server-approved transfer request. Signing happens in the wallet.
///
/// Either `to_address` + `amount` or `recipients` is set, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub intent: String,
    pub from_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<Recipient>,
    pub token_type: String,
    pub network: String,
    pub requires_confirmation: bool,
}

impl TransferIntent {
    pub fn single(
        from_address: impl Into<String>,
        to_address: impl Into<String>,
        amount: Decimal,
        network: impl Into<String>,
    ) -> Self {
        Self {
            intent: "transfer".to_string(),
            from_address: from_address.into(),
            to_address: Some(to_address.into()),
            amount: Some(amount),
            recipients: Vec::new(),
            token_type: TRANSFER_TOKEN.to_string(),
            network: network.into(),
            requires_confirmation: true,
        }
    }

    pub fn batch(
        from_address: impl Into<String>,
        recipients: Vec<Recipient>,
        network: impl Into<String>,
    ) -> Self {
        Self {
            intent: "transfer".to_string(),
            from_address: from_address.into(),
            to_address: None,
            amount: None,
            recipients,
            token_type: TRANSFER_TOKEN.to_string(),
            network: network.into(),
            requires_confirmation: true,
        }
    }

    /// Sum over every leg, or `None` if it leaves the `Decimal` range.
    pub fn checked_total(&self) -> Option<Decimal> {
        if self.recipients.is_empty() {
            Some(self.amount.unwrap_or(Decimal::ZERO))
        } else {
            self.recipients
                .iter()
                .try_fold(Decimal::ZERO, |total, r| total.checked_add(r.amount))
        }
    }

    /// Sum over every leg. Saturates at `Decimal::MAX`; intents built by
    /// the validator never reach it.
    pub fn total_amount(&self) -> Decimal {
        self.checked_total().unwrap_or(Decimal::MAX)
    }

    pub fn recipient_count(&self) -> usize {
        if self.recipients.is_empty() {
            usize::from(self.to_address.is_some())
        } else {
            self.recipients.len()
        }
    }
}

/// Model-supplied fields decode leniently: a value of the wrong shape is
/// dropped on its own instead of failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_supply: Option<u64>,
}

/// NFT fields collected across turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NftInfo {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_base64: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_collection",
        skip_serializing_if = "Option::is_none"
    )]
    pub collection: Option<CollectionInfo>,
    /// Anything else the model chose to collect.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().replace([',', '_'], "").parse().ok(),
        _ => None,
    })
}

/// A bare string names the collection.
fn lenient_collection<'de, D>(deserializer: D) -> Result<Option<CollectionInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(name) => Some(CollectionInfo {
            name: Some(name),
            total_supply: None,
        }),
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

impl NftInfo {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Name and description are both present.
    pub fn is_complete(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.name) && filled(&self.description)
    }

    /// Overlay fields present in `newer`; absent ones keep their value.
    pub fn merge(&mut self, newer: NftInfo) {
        let keep = |slot: &mut Option<String>, value: Option<String>| {
            if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                *slot = Some(v);
            }
        };
        keep(&mut self.name, newer.name);
        keep(&mut self.description, newer.description);
        keep(&mut self.image_url, newer.image_url);
        keep(&mut self.image_base64, newer.image_base64);
        if newer.collection.is_some() {
            self.collection = newer.collection;
        }
        self.extra.extend(newer.extra);
    }

    /// Text used as the image prompt: the description, else the name.
    pub fn image_subject(&self) -> Option<&str> {
        [self.description.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// Canonical reply shape returned to the client, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    Chat {
        message: String,
    },
    TransferIntent {
        transfer_intent: TransferIntent,
        message: String,
    },
    TransferError {
        error: String,
        message: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        invalid_addresses: Vec<String>,
    },
    NftCollectInfo {
        message: String,
        nft_info: NftInfo,
    },
    NftCreationIntent {
        nft_creation_intent: NftInfo,
        message: String,
    },
}

impl Envelope {
    pub fn chat(message: impl Into<String>) -> Self {
        Self::Chat {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::TransferIntent { .. } => "transfer_intent",
            Self::TransferError { .. } => "transfer_error",
            Self::NftCollectInfo { .. } => "nft_collect_info",
            Self::NftCreationIntent { .. } => "nft_creation_intent",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Chat { message }
            | Self::TransferIntent { message, .. }
            | Self::TransferError { message, .. }
            | Self::NftCollectInfo { message, .. }
            | Self::NftCreationIntent { message, .. } => message,
        }
    }

    /// Assistant turn recorded in session history.
    ///
    /// Structured replies are kept as JSON so the model sees what it
    /// produced. Image bytes are left out.
    pub fn transcript_text(&self) -> String {
        match self {
            Self::Chat { message } => message.clone(),
            Self::NftCreationIntent {
                nft_creation_intent,
                message,
            } => {
                let mut info = nft_creation_intent.clone();
                info.image_base64 = None;
                let trimmed = Self::NftCreationIntent {
                    nft_creation_intent: info,
                    message: message.clone(),
                };
                serde_json::to_string(&trimmed).unwrap_or_else(|_| message.clone())
            }
            other => serde_json::to_string(other).unwrap_or_else(|_| other.message().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn multi_recipient_total() {
        let intent = TransferIntent::batch(
            "0xself",
            vec![
                Recipient {
                    to_address: format!("0x{}", "a".repeat(40)),
                    amount: dec!(1.0),
                },
                Recipient {
                    to_address: format!("0x{}", "b".repeat(40)),
                    amount: dec!(2.0),
                },
            ],
            "devnet",
        );
        assert_eq!(intent.total_amount(), dec!(3.0));
        assert_eq!(intent.recipient_count(), 2);
    }

    #[test]
    fn single_transfer_wire_shape() {
        let envelope = Envelope::TransferIntent {
            transfer_intent: TransferIntent::single("0xSELF", "0xdest", dec!(1), "devnet"),
            message: "ok".to_string(),
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "transfer_intent");
        assert_eq!(value["transfer_intent"]["from_address"], "0xSELF");
        assert_eq!(value["transfer_intent"]["amount"].as_f64(), Some(1.0));
        assert_eq!(value["transfer_intent"]["token_type"], "SUI");
        assert_eq!(value["transfer_intent"]["requires_confirmation"], true);
        assert!(value["transfer_intent"].get("recipients").is_none());
    }

    #[test]
    fn chat_envelope_shape() {
        assert_eq!(
            serde_json::to_value(Envelope::chat("hello")).unwrap(),
            json!({"type": "chat", "message": "hello"})
        );
    }

    #[test]
    fn nft_info_merge_keeps_existing_fields() {
        let mut bag = NftInfo {
            name: Some("Cyber Cat".to_string()),
            ..NftInfo::default()
        };
        let newer: NftInfo =
            serde_json::from_value(json!({"description": "a neon cat", "name": "", "rarity": "rare"}))
                .unwrap();
        bag.merge(newer);
        assert_eq!(bag.name.as_deref(), Some("Cyber Cat"));
        assert_eq!(bag.description.as_deref(), Some("a neon cat"));
        assert_eq!(bag.extra.get("rarity"), Some(&json!("rare")));
        assert!(bag.is_complete());
        assert_eq!(bag.image_subject(), Some("a neon cat"));
    }

    #[test]
    fn transcript_omits_image_bytes() {
        let envelope = Envelope::NftCreationIntent {
            nft_creation_intent: NftInfo {
                name: Some("Fox".to_string()),
                image_base64: Some("AAAA".to_string()),
                ..NftInfo::default()
            },
            message: "done".to_string(),
        };
        let text = envelope.transcript_text();
        assert!(text.contains("nft_creation_intent"));
        assert!(!text.contains("AAAA"));
        assert_eq!(Envelope::chat("plain").transcript_text(), "plain");
    }

    #[test]
    fn total_saturates_instead_of_overflowing() {
        let big = Decimal::from_str_exact("50000000000000000000000000000").unwrap();
        let intent = TransferIntent::batch(
            "0xself",
            vec![
                Recipient {
                    to_address: format!("0x{}", "a".repeat(40)),
                    amount: big,
                },
                Recipient {
                    to_address: format!("0x{}", "b".repeat(40)),
                    amount: big,
                },
            ],
            "devnet",
        );
        assert_eq!(intent.checked_total(), None);
        assert_eq!(intent.total_amount(), Decimal::MAX);
    }

    #[test]
    fn nft_info_tolerates_mistyped_fields() {
        let info: NftInfo = serde_json::from_value(json!({
            "name": "Fox",
            "description": "a fox",
            "collection": {"name": "Foxes", "total_supply": "100"},
            "rarity": "rare"
        }))
        .unwrap();
        assert_eq!(info.name.as_deref(), Some("Fox"));
        assert_eq!(
            info.collection,
            Some(CollectionInfo {
                name: Some("Foxes".to_string()),
                total_supply: Some(100),
            })
        );
        assert_eq!(info.extra["rarity"], "rare");

        let info: NftInfo = serde_json::from_value(json!({
            "name": 7,
            "description": ["not", "text"],
            "collection": "Foxes",
            "image_url": null
        }))
        .unwrap();
        assert_eq!(info.name.as_deref(), Some("7"));
        assert_eq!(info.description, None);
        assert_eq!(info.image_url, None);
        assert_eq!(
            info.collection.and_then(|c| c.name).as_deref(),
            Some("Foxes")
        );

        let info: CollectionInfo =
            serde_json::from_value(json!({"total_supply": "lots"})).unwrap();
        assert_eq!(info.total_supply, None);
    }
}
