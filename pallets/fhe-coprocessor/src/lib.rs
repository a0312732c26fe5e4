//! pallet-fhe-coprocessor: mock-mode coprocessor behind [`FheBackend`].
//!
//! Ciphertexts are modelled as opaque 32-byte handles. This pallet keeps the
//! cleartext behind every handle in runtime storage so that the swap and token
//! pallets can be exercised end to end without a real FHE scheme. Nothing here
//! ever emits a cleartext in an event or error; only the decryption gateway
//! (off-chain, see [`Pallet::cleartext_of`]) reads them, after checking the ACL.
//!
//! Encrypted inputs arrive with a proof of the form
//! `mac || SCALE(InputAttestation)` (see `confidential-swap-primitives`), bound
//! to one `(contract, owner)` pair and sealed with [`Config::SealingKey`].

#![cfg_attr(not(feature = "std"), no_std)]

use confidential_swap_primitives::{
    labels, Address, FheBackend, Handle, InputAttestation, ProofError, ZERO_HANDLE,
};
use frame_support::pallet_prelude::*;
use frame_system::pallet_prelude::*;
use sp_runtime::ArithmeticError;
use sp_std::prelude::*;

pub use pallet::*;

#[cfg(test)]
mod mock;

const LOG_TARGET: &str = "runtime::fhe-coprocessor";

/// Cleartext of an encrypted `true`.
pub const TRUE: u64 = 1;
/// Cleartext of an encrypted `false`.
pub const FALSE: u64 = 0;

#[frame_support::pallet]
pub mod pallet {
    use super::*;

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Key input proofs are authenticated and sealed with.
        type SealingKey: Get<[u8; 32]>;

        type WeightInfo: WeightInfo;
    }

    pub trait WeightInfo {
        fn allow() -> Weight;
    }

    impl WeightInfo for () {
        fn allow() -> Weight {
            Weight::from_parts(8_000, 0)
        }
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    /// handle -> cleartext. Mock-mode only.
    #[pallet::storage]
    pub type Ciphertexts<T> = StorageMap<_, Identity, Handle, u64, OptionQuery>;

    #[pallet::storage]
    pub type NextOpNonce<T> = StorageValue<_, u64, ValueQuery>;

    /// Accounts permitted to use (and request decryption of) a handle.
    #[pallet::storage]
    pub type Acl<T: Config> =
        StorageDoubleMap<_, Identity, Handle, Blake2_128Concat, T::AccountId, (), OptionQuery>;

    /// Contracts permitted to compute on a handle.
    #[pallet::storage]
    pub type ContractAcl<T> =
        StorageDoubleMap<_, Identity, Handle, Blake2_128Concat, Address, (), OptionQuery>;

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// An encrypted input was accepted for `contract`.
        InputVerified {
            contract: Address,
            owner: T::AccountId,
            handle: Handle,
        },
        /// `owner` shared `handle` with `with`.
        AccessGranted {
            handle: Handle,
            owner: T::AccountId,
            with: T::AccountId,
        },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// Input proof failed authentication or does not cover this input.
        ProofRejected,
        /// Input handle was already consumed.
        InputAlreadyUsed,
        /// Handle does not refer to a known ciphertext.
        UnknownHandle,
        /// Encrypted condition evaluated to false.
        ConditionFailed,
        /// Handle used as a condition is not an encrypted bool.
        NotBoolean,
        /// Caller is not on the handle's ACL.
        NotAllowed,
    }

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Share a handle the caller may use with another account.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::allow())]
        pub fn allow(origin: OriginFor<T>, handle: Handle, with: T::AccountId) -> DispatchResult {
            let owner = ensure_signed(origin)?;
            ensure!(Self::is_allowed_for(&handle, &owner), Error::<T>::NotAllowed);
            Acl::<T>::insert(handle, &with, ());
            Self::deposit_event(Event::AccessGranted {
                handle,
                owner,
                with,
            });
            Ok(())
        }
    }

    impl<T: Config> Pallet<T> {
        /// Cleartext behind `handle`. Used by the decryption gateway only.
        pub fn cleartext_of(handle: &Handle) -> Option<u64> {
            if *handle == ZERO_HANDLE {
                return Some(0);
            }
            Ciphertexts::<T>::get(handle)
        }

        pub fn is_allowed_for(handle: &Handle, who: &T::AccountId) -> bool {
            *handle == ZERO_HANDLE || Acl::<T>::contains_key(handle, who)
        }

        fn value_of(handle: &Handle) -> Result<u64, DispatchError> {
            Self::cleartext_of(handle).ok_or_else(|| Error::<T>::UnknownHandle.into())
        }

        fn bool_of(handle: &Handle) -> Result<bool, DispatchError> {
            match Self::value_of(handle)? {
                TRUE => Ok(true),
                FALSE => Ok(false),
                _ => Err(Error::<T>::NotBoolean.into()),
            }
        }

        /// Store `value` under a fresh handle derived from the op and its operands.
        fn fresh(tag: &[u8], operands: &[&Handle], value: u64) -> Handle {
            let nonce = NextOpNonce::<T>::mutate(|n| {
                let cur = *n;
                *n = n.wrapping_add(1);
                cur
            });
            let handle =
                sp_io::hashing::blake2_256(&(labels::OP, tag, operands, nonce).encode());
            Ciphertexts::<T>::insert(handle, value);
            log::trace!(target: LOG_TARGET, "op {:?} -> {:?}", tag, handle);
            handle
        }

        fn map_proof_error(e: ProofError) -> Error<T> {
            log::debug!(target: LOG_TARGET, "input proof rejected: {:?}", e);
            Error::<T>::ProofRejected
        }
    }

    impl<T: Config> FheBackend<T::AccountId> for Pallet<T> {
        fn verify_input(
            contract: &Address,
            owner: &T::AccountId,
            handle: &Handle,
            proof: &[u8],
        ) -> Result<Handle, DispatchError> {
            let key = T::SealingKey::get();
            let attestation = InputAttestation::<T::AccountId>::from_proof(proof, &key)
                .map_err(Self::map_proof_error)?;
            ensure!(
                &attestation.contract == contract && &attestation.owner == owner,
                Error::<T>::ProofRejected
            );
            let value = attestation
                .unseal(&key, handle)
                .ok_or(Error::<T>::ProofRejected)?;
            ensure!(
                !Ciphertexts::<T>::contains_key(handle),
                Error::<T>::InputAlreadyUsed
            );

            Ciphertexts::<T>::insert(handle, value);
            Acl::<T>::insert(handle, owner, ());
            ContractAcl::<T>::insert(handle, contract, ());
            Self::deposit_event(Event::InputVerified {
                contract: *contract,
                owner: owner.clone(),
                handle: *handle,
            });
            Ok(*handle)
        }

        fn as_encrypted(value: u64) -> Result<Handle, DispatchError> {
            Ok(Self::fresh(b"trivial", &[], value))
        }

        fn add(lhs: &Handle, rhs: &Handle) -> Result<Handle, DispatchError> {
            let v = Self::value_of(lhs)?
                .checked_add(Self::value_of(rhs)?)
                .ok_or(ArithmeticError::Overflow)?;
            Ok(Self::fresh(b"add", &[lhs, rhs], v))
        }

        fn sub(lhs: &Handle, rhs: &Handle) -> Result<Handle, DispatchError> {
            let v = Self::value_of(lhs)?
                .checked_sub(Self::value_of(rhs)?)
                .ok_or(ArithmeticError::Underflow)?;
            Ok(Self::fresh(b"sub", &[lhs, rhs], v))
        }

        fn mul_scalar(lhs: &Handle, rhs: u64) -> Result<Handle, DispatchError> {
            let v = Self::value_of(lhs)?
                .checked_mul(rhs)
                .ok_or(ArithmeticError::Overflow)?;
            Ok(Self::fresh(b"mul", &[lhs], v))
        }

        fn ge(lhs: &Handle, rhs: &Handle) -> Result<Handle, DispatchError> {
            let v = Self::value_of(lhs)? >= Self::value_of(rhs)?;
            Ok(Self::fresh(b"ge", &[lhs, rhs], v as u64))
        }

        fn select(
            cond: &Handle,
            if_true: &Handle,
            if_false: &Handle,
        ) -> Result<Handle, DispatchError> {
            let v = if Self::bool_of(cond)? {
                Self::value_of(if_true)?
            } else {
                Self::value_of(if_false)?
            };
            Ok(Self::fresh(b"select", &[cond, if_true, if_false], v))
        }

        fn require(cond: &Handle) -> DispatchResult {
            ensure!(Self::bool_of(cond)?, Error::<T>::ConditionFailed);
            Ok(())
        }

        fn allow(handle: &Handle, who: &T::AccountId) {
            if *handle != ZERO_HANDLE {
                Acl::<T>::insert(handle, who, ());
            }
        }

        fn allow_contract(handle: &Handle, contract: &Address) {
            if *handle != ZERO_HANDLE {
                ContractAcl::<T>::insert(handle, contract, ());
            }
        }

        fn is_allowed(handle: &Handle, who: &T::AccountId) -> bool {
            Self::is_allowed_for(handle, who)
        }

        fn is_allowed_contract(handle: &Handle, contract: &Address) -> bool {
            *handle == ZERO_HANDLE || ContractAcl::<T>::contains_key(handle, contract)
        }
    }
}
