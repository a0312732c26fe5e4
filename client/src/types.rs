//! Handle-level data model shared by the oracle, ledger and client.

use confidential_swap_primitives::{Address, Handle, ZERO_HANDLE};
use serde::{Deserialize, Serialize};

/// An opaque ciphertext handle bound to the token contract that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedValue {
    #[serde(with = "hex_handle")]
    pub handle: Handle,
    pub contract: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_hint: Option<Address>,
}

impl EncryptedValue {
    pub fn new(handle: Handle, contract: Address) -> Self {
        Self {
            handle,
            contract,
            owner_hint: None,
        }
    }

    pub fn owned_by(mut self, owner: Address) -> Self {
        self.owner_hint = Some(owner);
        self
    }

    /// True for the sentinel that decrypts to `0` without an oracle call.
    pub fn is_zero(&self) -> bool {
        self.handle == ZERO_HANDLE
    }

    pub fn pair(&self) -> HandleContractPair {
        HandleContractPair {
            handle: self.handle,
            contract_address: self.contract,
        }
    }
}

/// Handles of one encryption request plus the proof binding them to
/// `(contract, owner, cleartexts)`. Single use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handles: Vec<EncryptedValue>,
    pub proof: Vec<u8>,
}

/// Wire form of a handle to decrypt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleContractPair {
    #[serde(with = "hex_handle")]
    pub handle: Handle,
    pub contract_address: Address,
}

pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(s)
}

pub fn handle_from_hex(s: &str) -> Option<Handle> {
    from_hex(s).ok()?.try_into().ok()
}

/// `0x`-prefixed hex for fixed 32-byte handles.
pub mod hex_handle {
    use super::*;
    use serde::{Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(handle: &Handle, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&to_hex(handle))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Handle, D::Error> {
        let raw = String::deserialize(d)?;
        handle_from_hex(&raw).ok_or_else(|| D::Error::custom("expected 32-byte hex handle"))
    }
}

/// `0x`-prefixed hex for byte strings.
pub mod hex_bytes {
    use super::*;
    use serde::{Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&to_hex(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(d)?;
        from_hex(&raw).map_err(D::Error::custom)
    }
}
