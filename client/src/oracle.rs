//! The encryption oracle boundary.
//!
//! Transports implement [`EncryptionOracle::encrypt`] and
//! [`EncryptionOracle::user_decrypt`], which carry the wire messages verbatim.
//! The provided methods add the client-side rules: zero handles never leave
//! the process, the ephemeral secret is never sent, and a decryption succeeds
//! only with one opened value per requested handle.

use std::{collections::HashMap, future::Future, sync::Arc};

use confidential_swap_primitives::{Address, Handle, ZERO_HANDLE};
use serde::{Deserialize, Serialize};

use crate::{
    OracleError,
    auth::DecryptionGrant,
    keys::EphemeralKeypair,
    types::{EncryptedInput, EncryptedValue, HandleContractPair, from_hex, handle_from_hex, hex_bytes, to_hex},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptRequest {
    pub contract_address: Address,
    pub user_address: Address,
    pub values: Vec<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptResponse {
    /// Hex handles, one per requested value.
    pub handles: Vec<String>,
    /// Hex input proof.
    pub input_proof: String,
}

/// Everything the gateway needs to authorize a user decryption. The
/// ephemeral secret key is deliberately absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDecryptRequest {
    pub handle_contract_pairs: Vec<HandleContractPair>,
    #[serde(with = "hex_bytes")]
    pub public_key: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
    pub contract_addresses: Vec<Address>,
    pub user_address: Address,
    pub start_timestamp: u64,
    pub duration_seconds: u64,
    #[serde(with = "hex_bytes")]
    pub extra_data: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDecryptResponse {
    /// Hex handle -> hex reply sealed to the request's public key.
    pub results: HashMap<String, String>,
}

pub trait EncryptionOracle: Send + Sync {
    fn encrypt(
        &self,
        request: EncryptRequest,
    ) -> impl Future<Output = Result<EncryptResponse, OracleError>> + Send;

    fn user_decrypt(
        &self,
        request: UserDecryptRequest,
    ) -> impl Future<Output = Result<UserDecryptResponse, OracleError>> + Send;

    /// Encrypt one value for (`contract`, `owner`).
    fn encrypt_u64(
        &self,
        contract: Address,
        owner: Address,
        value: u64,
    ) -> impl Future<Output = Result<EncryptedInput, OracleError>> + Send {
        async move {
            let response = self
                .encrypt(EncryptRequest {
                    contract_address: contract,
                    user_address: owner,
                    values: vec![value],
                })
                .await?;
            let input = parse_encrypt_response(&response, contract, owner)?;
            if input.handles.len() != 1 {
                return Err(OracleError::Malformed(format!(
                    "expected 1 handle, got {}",
                    input.handles.len()
                )));
            }
            Ok(input)
        }
    }

    /// Decrypt `pairs` under `grant`, returning cleartexts in request order.
    ///
    /// Zero handles decrypt to `0` locally; if every handle is zero the
    /// oracle is not contacted at all. The grant is consumed either way.
    fn decrypt(
        &self,
        pairs: &[HandleContractPair],
        grant: DecryptionGrant,
    ) -> impl Future<Output = Result<Vec<u64>, OracleError>> + Send {
        async move {
            let mut values = vec![0u64; pairs.len()];
            let pending: Vec<(usize, HandleContractPair)> = pairs
                .iter()
                .copied()
                .enumerate()
                .filter(|(_, p)| p.handle != ZERO_HANDLE)
                .collect();
            if pending.is_empty() {
                tracing::debug!("only zero handles requested, oracle skipped");
                grant.consume();
                return Ok(values);
            }

            let request = user_decrypt_request(&grant, pending.iter().map(|(_, p)| *p).collect());
            let opened = match self.user_decrypt(request).await {
                Ok(response) => open_replies(&response, &pending, grant.keypair()),
                Err(e) => Err(e),
            };
            grant.consume();

            for (idx, value) in opened? {
                values[idx] = value;
            }
            Ok(values)
        }
    }
}

fn user_decrypt_request(
    grant: &DecryptionGrant,
    handle_contract_pairs: Vec<HandleContractPair>,
) -> UserDecryptRequest {
    let statement = grant.statement();
    UserDecryptRequest {
        handle_contract_pairs,
        public_key: statement.public_key.clone(),
        signature: grant.signature().to_vec(),
        contract_addresses: statement.contract_addresses.clone(),
        user_address: grant.owner(),
        start_timestamp: statement.start_timestamp,
        duration_seconds: statement.duration_seconds,
        extra_data: statement.extra_data.clone(),
    }
}

/// Unseal one reply per pending handle. Keys are matched case-insensitively.
fn open_replies(
    response: &UserDecryptResponse,
    pending: &[(usize, HandleContractPair)],
    keypair: &EphemeralKeypair,
) -> Result<Vec<(usize, u64)>, OracleError> {
    let replies: HashMap<Handle, &str> = response
        .results
        .iter()
        .filter_map(|(k, v)| handle_from_hex(k).map(|h| (h, v.as_str())))
        .collect();

    pending
        .iter()
        .map(|(idx, pair)| {
            let reply = replies.get(&pair.handle).ok_or_else(|| {
                OracleError::Malformed(format!("no value for handle {}", to_hex(&pair.handle)))
            })?;
            let sealed = from_hex(reply).map_err(|e| OracleError::Malformed(e.to_string()))?;
            let value = keypair.unseal(&pair.handle, &sealed).ok_or_else(|| {
                OracleError::Malformed(format!("reply for {} does not open", to_hex(&pair.handle)))
            })?;
            Ok((*idx, value))
        })
        .collect()
}

fn parse_encrypt_response(
    response: &EncryptResponse,
    contract: Address,
    owner: Address,
) -> Result<EncryptedInput, OracleError> {
    let handles = response
        .handles
        .iter()
        .map(|h| {
            handle_from_hex(h)
                .map(|h| EncryptedValue::new(h, contract).owned_by(owner))
                .ok_or_else(|| OracleError::Malformed(format!("bad handle {h}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let proof =
        from_hex(&response.input_proof).map_err(|e| OracleError::Malformed(e.to_string()))?;
    Ok(EncryptedInput { handles, proof })
}

impl<T: EncryptionOracle + ?Sized> EncryptionOracle for Arc<T> {
    fn encrypt(
        &self,
        request: EncryptRequest,
    ) -> impl Future<Output = Result<EncryptResponse, OracleError>> + Send {
        (**self).encrypt(request)
    }

    fn user_decrypt(
        &self,
        request: UserDecryptRequest,
    ) -> impl Future<Output = Result<UserDecryptResponse, OracleError>> + Send {
        (**self).user_decrypt(request)
    }
}
