//! Error types for suichat.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Image service error: {0}")]
    Image(#[from] ImageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },
}

/// Failures talking to the hosted chat-completion endpoint.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("No credential configured for provider {provider}")]
    MissingCredential { provider: String },

    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} did not answer within {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Provider {provider} returned HTTP {status}: {body}")]
    HttpStatus {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} returned an empty completion")]
    EmptyCompletion { provider: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GatewayError {
    /// Whether a single retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::RequestFailed { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::MissingCredential { .. }
            | Self::InvalidResponse { .. }
            | Self::EmptyCompletion { .. } => false,
        }
    }
}

/// Failures from the text-to-image and image-hosting collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("{service} is not configured: missing {key}")]
    MissingCredential { service: String, key: String },

    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("No image data provided")]
    EmptyPayload,

    #[error("{service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("{service} did not answer within {timeout:?}")]
    Timeout { service: String, timeout: Duration },

    #[error("HTTP {status}: {body}")]
    HttpStatus {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },

    #[error("{reason}")]
    Rejected { service: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Transfer intent validation failures.
///
/// These never escape a request as errors on the chat path; they are folded
/// into a `transfer_error` envelope instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid wallet address format: {}", .0.join(", "))]
    InvalidAddress(Vec<String>),

    #[error("{0} is missing")]
    MissingField(&'static str),

    #[error("Transfer amount for {address} must be greater than zero")]
    NonPositiveAmount { address: String },

    #[error("Transfer has no recipients")]
    NoRecipients,

    #[error("Transfer total exceeds the supported amount range")]
    AmountOverflow,
}

impl ValidationError {
    /// Stable machine-readable code carried in `transfer_error` envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "invalid_address",
            Self::MissingField(_) | Self::NoRecipients => "missing_recipient",
            Self::NonPositiveAmount { .. } | Self::AmountOverflow => "invalid_amount",
        }
    }

    /// Addresses named by the failure, if any.
    pub fn offending_addresses(&self) -> &[String] {
        match self {
            Self::InvalidAddress(addresses) => addresses,
            _ => &[],
        }
    }
}
