//! Wallet boundary: whoever signs typed data on the owner's behalf.

use confidential_swap_primitives::Address;
use sp_core::{Pair as _, ecdsa, hashing::keccak_256};

use crate::{
    SignerError,
    eip712::{Eip712Domain, UserDecryptStatement, recover_signer, signing_hash},
};

/// Signs EIP-712 statements. Implemented by local keys, hardware wallets or
/// remote signers; the authorization protocol never sees the key itself.
pub trait TypedDataSigner: Send + Sync {
    fn address(&self) -> Address;

    /// 65-byte `r || s || v` signature over the EIP-712 digest.
    fn sign_typed_data(
        &self,
        domain: &Eip712Domain,
        statement: &UserDecryptStatement,
    ) -> Result<[u8; 65], SignerError>;
}

/// In-process secp256k1 key.
pub struct LocalWallet {
    pair: ecdsa::Pair,
    address: Address,
}

impl LocalWallet {
    pub fn from_seed(seed: [u8; 32]) -> Result<Self, SignerError> {
        let pair = ecdsa::Pair::from_seed(&seed);
        // The address is keccak of the uncompressed key, which is easiest to
        // obtain by recovering it from a throwaway signature.
        let digest = keccak_256(b"local-wallet/address");
        let address = recover_signer(&digest, &sign_digest(&pair, &digest))?;
        Ok(Self { pair, address })
    }

    /// Deterministic wallet for a well-known dev account name.
    pub fn dev(name: &str) -> Result<Self, SignerError> {
        Self::from_seed(keccak_256(format!("//{name}").as_bytes()))
    }

    pub fn random() -> Result<Self, SignerError> {
        let mut seed = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::rng(), &mut seed);
        Self::from_seed(seed)
    }
}

fn sign_digest(pair: &ecdsa::Pair, digest: &[u8; 32]) -> [u8; 65] {
    let sig = pair.sign_prehashed(digest);
    let mut raw = [0u8; 65];
    raw.copy_from_slice(sig.as_ref());
    // wallets emit v in {27, 28}
    raw[64] += 27;
    raw
}

impl TypedDataSigner for LocalWallet {
    fn address(&self) -> Address {
        self.address
    }

    fn sign_typed_data(
        &self,
        domain: &Eip712Domain,
        statement: &UserDecryptStatement,
    ) -> Result<[u8; 65], SignerError> {
        Ok(sign_digest(&self.pair, &signing_hash(domain, statement)))
    }
}

impl<S: TypedDataSigner + ?Sized> TypedDataSigner for std::sync::Arc<S> {
    fn address(&self) -> Address {
        (**self).address()
    }

    fn sign_typed_data(
        &self,
        domain: &Eip712Domain,
        statement: &UserDecryptStatement,
    ) -> Result<[u8; 65], SignerError> {
        (**self).sign_typed_data(domain, statement)
    }
}
