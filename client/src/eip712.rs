//! EIP-712 typed data for user decryption requests.

use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{SolStruct, eip712_domain, sol};
use confidential_swap_primitives::Address;
use sp_core::hashing::keccak_256;

use crate::SignerError;

sol! {
    /// What the user signs; the gateway rebuilds it from the request body.
    #[derive(Debug)]
    struct UserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 startTimestamp;
        uint256 durationSeconds;
        bytes extraData;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    fn to_sol(&self) -> alloy_sol_types::Eip712Domain {
        eip712_domain! {
            name: self.name.clone(),
            version: self.version.clone(),
            chain_id: self.chain_id,
            verifying_contract: evm_address(&self.verifying_contract),
        }
    }

    pub fn separator(&self) -> [u8; 32] {
        self.to_sol().separator().0
    }
}

/// The statement a wallet signs to authorize user decryption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDecryptStatement {
    pub public_key: Vec<u8>,
    pub contract_addresses: Vec<Address>,
    pub start_timestamp: u64,
    pub duration_seconds: u64,
    pub extra_data: Vec<u8>,
}

impl UserDecryptStatement {
    fn to_sol(&self) -> UserDecryptRequestVerification {
        UserDecryptRequestVerification {
            publicKey: Bytes::copy_from_slice(&self.public_key),
            contractAddresses: self.contract_addresses.iter().map(evm_address).collect(),
            startTimestamp: U256::from(self.start_timestamp),
            durationSeconds: U256::from(self.duration_seconds),
            extraData: Bytes::copy_from_slice(&self.extra_data),
        }
    }

    pub fn struct_hash(&self) -> [u8; 32] {
        self.to_sol().eip712_hash_struct().0
    }

    /// Last second at which a grant over this statement is usable.
    pub fn expires_at(&self) -> u64 {
        self.start_timestamp.saturating_add(self.duration_seconds)
    }
}

/// `keccak256(0x19 0x01 || domainSeparator || structHash)`.
pub fn signing_hash(domain: &Eip712Domain, statement: &UserDecryptStatement) -> [u8; 32] {
    statement.to_sol().eip712_signing_hash(&domain.to_sol()).0
}

/// Address of the key that produced `signature` (`r || s || v`) over `digest`.
pub fn recover_signer(digest: &[u8; 32], signature: &[u8]) -> Result<Address, SignerError> {
    let mut sig: [u8; 65] = signature
        .try_into()
        .map_err(|_| SignerError::BadSignatureLength(signature.len()))?;
    if sig[64] >= 27 {
        sig[64] -= 27;
    }
    let public = sp_io::crypto::secp256k1_ecdsa_recover(&sig, digest)
        .map_err(|_| SignerError::Unrecoverable)?;
    Ok(Address::from_slice(&keccak_256(&public)[12..]))
}

fn evm_address(a: &Address) -> alloy_primitives::Address {
    alloy_primitives::Address::from(a.0)
}
