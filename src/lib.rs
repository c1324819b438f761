//! Conversational wallet backend for Sui.
//!
//! Chat messages are routed to a transfer, NFT or generic handler, answered
//! by a hosted LLM and validated into structured intents that the frontend
//! turns into wallet-signed transactions. Nothing here holds keys or signs.

pub mod agent;
pub mod bootstrap;
pub mod channels;
pub mod config;
pub mod contract;
pub mod error;
pub mod llm;
pub mod media;
pub mod settings;

pub use config::Config;
pub use error::{Error, Result};
