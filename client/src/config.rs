//! Client configuration, loaded from JSON.

use std::path::Path;

use confidential_swap_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, eip712::Eip712Domain};

/// Seven days, the wallet-facing default for decryption grants.
pub const DEFAULT_GRANT_VALIDITY_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub chain_id: u64,
    #[serde(default = "default_domain_name")]
    pub domain_name: String,
    #[serde(default = "default_domain_version")]
    pub domain_version: String,
    /// Contract the decryption gateway verifies typed-data signatures for.
    pub verifying_contract: Address,
    pub input_token: Address,
    pub output_token: Address,
    pub swap_pool: Address,
    /// Lifetime of each decryption grant.
    #[serde(default = "default_grant_validity")]
    pub grant_validity_secs: u64,
}

fn default_domain_name() -> String {
    "Decryption".into()
}

fn default_domain_version() -> String {
    "1".into()
}

fn default_grant_validity() -> u64 {
    DEFAULT_GRANT_VALIDITY_SECS
}

impl ClientConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grant_validity_secs == 0 {
            return Err(ConfigError::Invalid("grantValiditySecs must be positive"));
        }
        if self.input_token == self.output_token {
            return Err(ConfigError::Invalid("inputToken and outputToken must differ"));
        }
        Ok(())
    }

    pub fn domain(&self) -> Eip712Domain {
        Eip712Domain {
            name: self.domain_name.clone(),
            version: self.domain_version.clone(),
            chain_id: self.chain_id,
            verifying_contract: self.verifying_contract,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"{
        "chainId": 31337,
        "verifyingContract": "0x00000000000000000000000000000000000000d0",
        "inputToken": "0x00000000000000000000000000000000000000e1",
        "outputToken": "0x00000000000000000000000000000000000000e2",
        "swapPool": "0x00000000000000000000000000000000000000f0"
    }"#;

    #[test]
    fn defaults_fill_domain_and_validity() {
        let cfg = ClientConfig::from_json(RAW).unwrap();
        assert_eq!(cfg.grant_validity_secs, DEFAULT_GRANT_VALIDITY_SECS);
        assert_eq!(cfg.domain().name, "Decryption");
        assert_eq!(cfg.domain().chain_id, 31337);
        assert_eq!(cfg.input_token, Address::from_low_u64_be(0xe1));
    }

    #[test]
    fn rejects_zero_validity_window() {
        let raw = RAW.replacen("\"chainId\"", "\"grantValiditySecs\": 0, \"chainId\"", 1);
        assert!(matches!(
            ClientConfig::from_json(&raw),
            Err(ConfigError::Invalid(_))
        ));
    }
}
