//! Ephemeral re-encryption keys for user decryption.
//!
//! The gateway never returns a cleartext in the clear. Each value is sealed
//! to the requester's ephemeral Ristretto public key:
//!
//! ```text
//! r  <- random scalar
//! R  = r·G
//! m  = sha512(compress(r·PK) || handle)[..8]
//! reply = compress(R) || (value_le ^ m)
//! ```
//!
//! Only the holder of the matching secret recovers `value` via `sk·R`.

use confidential_swap_primitives::Handle;
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use rand::RngCore;
use sha2::{Digest, Sha512};

/// Length of a sealed reply.
pub const SEALED_LEN: usize = 32 + 8;

/// Per-request key pair. The secret never leaves this process.
pub struct EphemeralKeypair {
    secret: Scalar,
    public: RistrettoPoint,
}

impl core::fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EphemeralKeypair")
            .field("public", &hex::encode(self.public_bytes()))
            .finish_non_exhaustive()
    }
}

fn random_scalar() -> Scalar {
    let mut wide = [0u8; 64];
    rand::rng().fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

fn mask(shared: &RistrettoPoint, handle: &Handle) -> u64 {
    let digest = Sha512::new()
        .chain_update(shared.compress().as_bytes())
        .chain_update(handle)
        .finalize();
    let mut m = [0u8; 8];
    m.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(m)
}

impl EphemeralKeypair {
    pub fn generate() -> Self {
        let secret = random_scalar();
        Self {
            secret,
            public: secret * RISTRETTO_BASEPOINT_POINT,
        }
    }

    pub fn public_bytes(&self) -> [u8; 32] {
        self.public.compress().to_bytes()
    }

    /// Recover the value the gateway sealed for `handle`.
    pub fn unseal(&self, handle: &Handle, reply: &[u8]) -> Option<u64> {
        if reply.len() != SEALED_LEN {
            return None;
        }
        let ephemeral = CompressedRistretto::from_slice(&reply[..32])
            .ok()?
            .decompress()?;
        let mut masked = [0u8; 8];
        masked.copy_from_slice(&reply[32..]);
        Some(u64::from_le_bytes(masked) ^ mask(&(self.secret * ephemeral), handle))
    }
}

/// Seal `value` for the holder of `public_key`. Used by decryption gateways.
pub fn seal_for(public_key: &[u8], handle: &Handle, value: u64) -> Option<Vec<u8>> {
    let pk = CompressedRistretto::from_slice(public_key).ok()?.decompress()?;
    let r = random_scalar();
    let mut out = Vec::with_capacity(SEALED_LEN);
    out.extend_from_slice((r * RISTRETTO_BASEPOINT_POINT).compress().as_bytes());
    out.extend_from_slice(&(value ^ mask(&(r * pk), handle)).to_le_bytes());
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_value_opens_only_with_matching_key() {
        let kp = EphemeralKeypair::generate();
        let other = EphemeralKeypair::generate();
        let handle = [3u8; 32];

        let sealed = seal_for(&kp.public_bytes(), &handle, 3000).expect("valid key");
        assert_eq!(sealed.len(), SEALED_LEN);
        assert_eq!(kp.unseal(&handle, &sealed), Some(3000));
        assert_ne!(other.unseal(&handle, &sealed), Some(3000));
        assert_ne!(kp.unseal(&[4u8; 32], &sealed), Some(3000));
    }

    #[test]
    fn sealing_is_randomized() {
        let kp = EphemeralKeypair::generate();
        let a = seal_for(&kp.public_bytes(), &[1; 32], 5).unwrap();
        let b = seal_for(&kp.public_bytes(), &[1; 32], 5).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        let kp = EphemeralKeypair::generate();
        assert!(seal_for(&[0u8; 31], &[1; 32], 5).is_none());
        assert_eq!(kp.unseal(&[1; 32], &[0u8; 12]), None);
    }

    #[test]
    fn debug_does_not_print_the_secret() {
        let kp = EphemeralKeypair::generate();
        let dbg = format!("{kp:?}");
        assert!(dbg.contains(&hex::encode(kp.public_bytes())));
        assert!(!dbg.contains("secret"));
    }
}
