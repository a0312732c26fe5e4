//! Types and traits for confidential swap crates
#![cfg_attr(not(feature = "std"), no_std)]

use frame_support::{pallet_prelude::*, BoundedVec};
use sp_io::hashing::blake2_256;
use sp_std::prelude::*;

pub use sp_core::H160;

/// Opaque 256-bit ciphertext handle.
///
/// A handle is only meaningful in the context of the contract that owns it;
/// the same bit pattern under two contracts denotes unrelated values.
pub type Handle = [u8; 32];

/// Sentinel handle of a value that was never written. Always evaluates to 0.
pub const ZERO_HANDLE: Handle = [0u8; 32];

/// EVM-style 20-byte address identifying token contracts.
pub type Address = H160;

/// Proof blob accompanying freshly encrypted inputs.
pub type MaxProofLen = ConstU32<8192>;
pub type InputProof = BoundedVec<u8, MaxProofLen>;

/// Optional data payload for `*_and_call` variants.
pub type MaxCallbackDataLen = ConstU32<4096>;
pub type CallbackData = BoundedVec<u8, MaxCallbackDataLen>;

/// Token name / symbol bound.
pub type MaxMetadataLen = ConstU32<32>;

/// Domain separation labels shared by the coprocessor and its clients.
pub mod labels {
    pub const INPUT: &[u8] = b"fhe/input";
    pub const SEAL: &[u8] = b"fhe/seal";
    pub const OP: &[u8] = b"fhe/op";
}

/// Length of the MAC prefixing every input proof.
pub const MAC_LEN: usize = 32;

/// Body of an input proof.
///
/// Wire layout of the proof: `mac(32) || SCALE(InputAttestation)` where
/// `mac = blake2_256(sealing_key || SCALE(InputAttestation))`.
#[derive(Clone, PartialEq, Eq, Encode, Decode, RuntimeDebug)]
pub struct InputAttestation<AccountId> {
    /// Contract the inputs may be consumed by.
    pub contract: Address,
    /// Account the inputs were encrypted for.
    pub owner: AccountId,
    /// Handles in the order the cleartexts were supplied.
    pub handles: Vec<Handle>,
    /// `sealed[i]` is the cleartext behind `handles[i]`, masked with [`seal_mask`].
    pub sealed: Vec<u64>,
}

#[derive(Clone, Copy, PartialEq, Eq, RuntimeDebug)]
pub enum ProofError {
    Truncated,
    Malformed,
    BadMac,
}

impl<AccountId: Encode + Decode> InputAttestation<AccountId> {
    pub fn mac(&self, sealing_key: &[u8; 32]) -> [u8; MAC_LEN] {
        let mut buf = sealing_key.to_vec();
        buf.extend_from_slice(&self.encode());
        blake2_256(&buf)
    }

    pub fn to_proof(&self, sealing_key: &[u8; 32]) -> Vec<u8> {
        let mut out = self.mac(sealing_key).to_vec();
        out.extend_from_slice(&self.encode());
        out
    }

    /// Parse and authenticate a proof produced by [`Self::to_proof`].
    pub fn from_proof(proof: &[u8], sealing_key: &[u8; 32]) -> Result<Self, ProofError> {
        if proof.len() <= MAC_LEN {
            return Err(ProofError::Truncated);
        }
        let (mac, mut body) = proof.split_at(MAC_LEN);
        let attestation = Self::decode(&mut body).map_err(|_| ProofError::Malformed)?;
        if !body.is_empty() || attestation.handles.len() != attestation.sealed.len() {
            return Err(ProofError::Malformed);
        }
        if attestation.mac(sealing_key)[..] != mac[..] {
            return Err(ProofError::BadMac);
        }
        Ok(attestation)
    }

    /// Cleartext behind `handle`, if the attestation lists it.
    pub fn unseal(&self, sealing_key: &[u8; 32], handle: &Handle) -> Option<u64> {
        let idx = self.handles.iter().position(|h| h == handle)?;
        self.sealed
            .get(idx)
            .map(|s| s ^ seal_mask(sealing_key, handle))
    }
}

/// Handle of the `index`-th value of an encrypted input.
pub fn input_handle<AccountId: Encode>(
    contract: &Address,
    owner: &AccountId,
    nonce: &[u8; 32],
    index: u8,
) -> Handle {
    blake2_256(&(labels::INPUT, contract, owner, nonce, index).encode())
}

/// Per-handle mask applied to sealed input values.
pub fn seal_mask(sealing_key: &[u8; 32], handle: &Handle) -> u64 {
    let mut buf = sealing_key.to_vec();
    buf.extend_from_slice(labels::SEAL);
    buf.extend_from_slice(handle);
    let digest = blake2_256(&buf);
    let mut mask = [0u8; 8];
    mask.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(mask)
}

/// Encrypt `values` for (`contract`, `owner`) under `sealing_key`.
///
/// Off-chain counterpart of [`FheBackend::verify_input`]. Returns the input
/// handles in order together with the proof, or `None` when the batch does not
/// fit a single proof.
pub fn seal_inputs<AccountId: Clone + Encode + Decode>(
    sealing_key: &[u8; 32],
    contract: &Address,
    owner: &AccountId,
    nonce: &[u8; 32],
    values: &[u64],
) -> Option<(Vec<Handle>, InputProof)> {
    let handles = (0..values.len())
        .map(|i| u8::try_from(i).ok().map(|i| input_handle(contract, owner, nonce, i)))
        .collect::<Option<Vec<Handle>>>()?;
    let sealed = handles
        .iter()
        .zip(values)
        .map(|(h, v)| v ^ seal_mask(sealing_key, h))
        .collect();
    let attestation = InputAttestation {
        contract: *contract,
        owner: owner.clone(),
        handles: handles.clone(),
        sealed,
    };
    let proof = attestation.to_proof(sealing_key).try_into().ok()?;
    Some((handles, proof))
}

/// Homomorphic backend. Every operation works on handles; cleartexts never
/// leave the backend.
pub trait FheBackend<AccountId> {
    /// Validate an encrypted input for (`contract`, `owner`) and make
    /// `handle` usable on-chain. An input can be consumed once.
    fn verify_input(
        contract: &Address,
        owner: &AccountId,
        handle: &Handle,
        proof: &[u8],
    ) -> Result<Handle, DispatchError>;

    /// Trivially encrypt a public constant.
    fn as_encrypted(value: u64) -> Result<Handle, DispatchError>;

    fn add(lhs: &Handle, rhs: &Handle) -> Result<Handle, DispatchError>;
    fn sub(lhs: &Handle, rhs: &Handle) -> Result<Handle, DispatchError>;
    fn mul_scalar(lhs: &Handle, rhs: u64) -> Result<Handle, DispatchError>;

    /// Encrypted `lhs >= rhs`.
    fn ge(lhs: &Handle, rhs: &Handle) -> Result<Handle, DispatchError>;

    /// Encrypted `if cond { if_true } else { if_false }`.
    fn select(cond: &Handle, if_true: &Handle, if_false: &Handle)
        -> Result<Handle, DispatchError>;

    /// Abort the enclosing transaction unless the encrypted bool `cond` holds.
    fn require(cond: &Handle) -> DispatchResult;

    fn allow(handle: &Handle, who: &AccountId);
    fn allow_contract(handle: &Handle, contract: &Address);
    fn is_allowed(handle: &Handle, who: &AccountId) -> bool;
    fn is_allowed_contract(handle: &Handle, contract: &Address) -> bool;
}

/// Encrypted-balance token surface used by other pallets.
pub trait ConfidentialToken<AccountId> {
    fn balance_of(contract: &Address, who: &AccountId) -> Handle;

    /// Move up to `amount` from `from` to `to`. Returns the handle of the
    /// amount actually transferred (zero when `from` cannot cover it).
    fn transfer_encrypted(
        contract: &Address,
        from: &AccountId,
        to: &AccountId,
        amount: Handle,
    ) -> Result<Handle, DispatchError>;

    fn mint(contract: &Address, to: &AccountId, amount: u64) -> Result<Handle, DispatchError>;
}

/// Hook invoked by `*_and_call` transfers inside the same transaction.
pub trait ConfidentialReceiver<AccountId> {
    /// Returns `Ok(None)` when `to` has no hook, `Ok(Some(handle))` with the
    /// hook's encrypted result otherwise. An error reverts the transfer.
    fn on_confidential_received(
        token: &Address,
        from: &AccountId,
        to: &AccountId,
        amount: Handle,
        data: &[u8],
    ) -> Result<Option<Handle>, DispatchError>;
}

impl<AccountId> ConfidentialReceiver<AccountId> for () {
    #[inline]
    fn on_confidential_received(
        _token: &Address,
        _from: &AccountId,
        _to: &AccountId,
        _amount: Handle,
        _data: &[u8],
    ) -> Result<Option<Handle>, DispatchError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [42u8; 32];

    fn attestation() -> InputAttestation<u64> {
        let contract = Address::repeat_byte(0xE1);
        let (_, proof) = seal_inputs(&KEY, &contract, &1u64, &[7u8; 32], &[3]).expect("fits");
        InputAttestation::from_proof(&proof, &KEY).expect("valid proof")
    }

    #[test]
    fn proof_authenticates_and_unseals() {
        let att = attestation();
        let proof = att.to_proof(&KEY);
        let parsed = InputAttestation::<u64>::from_proof(&proof, &KEY).expect("valid proof");
        assert_eq!(parsed, att);
        assert_eq!(parsed.owner, 1);
        assert_eq!(parsed.handles.len(), 1);
        assert_eq!(parsed.unseal(&KEY, &att.handles[0]), Some(3));
        assert_eq!(parsed.unseal(&KEY, &[9u8; 32]), None);
    }

    #[test]
    fn tampered_or_foreign_proofs_are_rejected() {
        let att = attestation();
        let mut proof = att.to_proof(&KEY);
        let last = proof.len() - 1;
        proof[last] ^= 1;
        assert_eq!(
            InputAttestation::<u64>::from_proof(&proof, &KEY),
            Err(ProofError::BadMac)
        );

        let proof = att.to_proof(&KEY);
        assert_eq!(
            InputAttestation::<u64>::from_proof(&proof, &[1u8; 32]),
            Err(ProofError::BadMac)
        );
        assert_eq!(
            InputAttestation::<u64>::from_proof(&proof[..MAC_LEN], &KEY),
            Err(ProofError::Truncated)
        );
    }

    #[test]
    fn input_handles_depend_on_contract() {
        let nonce = [1u8; 32];
        let a = input_handle(&Address::repeat_byte(1), &1u64, &nonce, 0);
        let b = input_handle(&Address::repeat_byte(2), &1u64, &nonce, 0);
        assert_ne!(a, b);
        assert_ne!(a, ZERO_HANDLE);
    }
}
