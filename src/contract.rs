//! Deployed NFT contract record.
//!
//! The deploy script writes `contract_config.json` after publishing the Move
//! package. The service only ever reads it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MINT_FUNCTION: &str = "mint_nft";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDeployment {
    /// Published package id.
    pub contract_address: String,
    pub module_name: String,
    pub collection_type: String,
    pub nft_type: String,
    /// Unix seconds.
    pub deployed_at: i64,
    pub network: String,
}

impl ContractDeployment {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::MissingRequired {
                    key: path.display().to_string(),
                    hint: "Deploy the NFT contract first to create the contract config."
                        .to_string(),
                }
            } else {
                ConfigError::Io(e)
            }
        })?;

        let deployment: Self = serde_json::from_str(&raw).map_err(|e| {
            ConfigError::ParseError(format!("invalid contract config {}: {e}", path.display()))
        })?;
        if deployment.contract_address.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "contract_address".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(deployment)
    }

    /// Fully qualified Move call target for minting.
    pub fn mint_target(&self) -> String {
        format!(
            "{}::{}::{}",
            self.contract_address, self.module_name, MINT_FUNCTION
        )
    }
}
