//! pallet-confidential-token: encrypted-balance token contracts.
//!
//! Every token is addressed by a 20-byte contract [`Address`]; balances are
//! coprocessor handles and all arithmetic on them goes through
//! [`Config::Fhe`]. Transfers follow confidential-token semantics: the moved
//! amount is `select(balance >= amount, amount, 0)` so an underfunded sender
//! transfers nothing instead of reverting (which would leak the comparison).
//!
//! `confidential_transfer_and_call` settles the transfer and then runs the
//! [`Config::Receiver`] hook inside the same storage transaction; a failing
//! hook reverts the transfer too.

#![cfg_attr(not(feature = "std"), no_std)]

use confidential_swap_primitives::{
    Address, CallbackData, ConfidentialReceiver, ConfidentialToken, FheBackend, Handle,
    InputProof, MaxMetadataLen, ZERO_HANDLE,
};
use frame_support::{pallet_prelude::*, transactional};
use frame_system::pallet_prelude::*;
use sp_std::prelude::*;

pub use pallet::*;

#[cfg(test)]
mod mock;

const LOG_TARGET: &str = "runtime::confidential-token";

#[derive(Encode, Decode, Clone, PartialEq, Eq, TypeInfo, MaxEncodedLen, RuntimeDebug)]
pub struct TokenMetadata {
    pub name: BoundedVec<u8, MaxMetadataLen>,
    pub symbol: BoundedVec<u8, MaxMetadataLen>,
    pub decimals: u8,
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        type Fhe: FheBackend<Self::AccountId>;

        /// Hook run by `confidential_transfer_and_call`.
        type Receiver: ConfidentialReceiver<Self::AccountId>;

        /// Who may mint cleartext amounts (faucet, pool seeding).
        type MintOrigin: EnsureOrigin<Self::RuntimeOrigin>;

        type WeightInfo: WeightInfo;
    }

    pub trait WeightInfo {
        fn create_token() -> Weight;
        fn mint() -> Weight;
        fn confidential_transfer() -> Weight;
        fn confidential_transfer_and_call() -> Weight;
    }

    impl WeightInfo for () {
        fn create_token() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn mint() -> Weight {
            Weight::from_parts(20_000, 0)
        }
        fn confidential_transfer() -> Weight {
            Weight::from_parts(40_000, 0)
        }
        fn confidential_transfer_and_call() -> Weight {
            Weight::from_parts(80_000, 0)
        }
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    #[pallet::storage]
    pub type Tokens<T> = StorageMap<_, Blake2_128Concat, Address, TokenMetadata, OptionQuery>;

    /// Encrypted balances. Never-written entries read as [`ZERO_HANDLE`].
    #[pallet::storage]
    pub type Balances<T: Config> = StorageDoubleMap<
        _,
        Blake2_128Concat,
        Address,
        Blake2_128Concat,
        T::AccountId,
        Handle,
        ValueQuery,
    >;

    #[pallet::storage]
    pub type TotalSupply<T> = StorageMap<_, Blake2_128Concat, Address, Handle, ValueQuery>;

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        TokenCreated {
            contract: Address,
            symbol: BoundedVec<u8, MaxMetadataLen>,
        },
        /// Cleartext mint; the amount is public by construction.
        Minted {
            contract: Address,
            to: T::AccountId,
            amount: u64,
        },
        ConfidentialTransfer {
            contract: Address,
            from: T::AccountId,
            to: T::AccountId,
            amount: Handle,
        },
    }

    #[pallet::error]
    pub enum Error<T> {
        UnknownToken,
        TokenExists,
        ZeroAmount,
        NameTooLong,
        /// Sender may not use the amount handle.
        HandleNotAllowed,
    }

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::create_token())]
        pub fn create_token(
            origin: OriginFor<T>,
            contract: Address,
            name: Vec<u8>,
            symbol: Vec<u8>,
            decimals: u8,
        ) -> DispatchResult {
            ensure_root(origin)?;
            ensure!(!Tokens::<T>::contains_key(contract), Error::<T>::TokenExists);
            let metadata = TokenMetadata {
                name: name.try_into().map_err(|_| Error::<T>::NameTooLong)?,
                symbol: symbol.try_into().map_err(|_| Error::<T>::NameTooLong)?,
                decimals,
            };
            let symbol = metadata.symbol.clone();
            Tokens::<T>::insert(contract, metadata);
            Self::deposit_event(Event::TokenCreated { contract, symbol });
            Ok(())
        }

        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::mint())]
        pub fn mint(
            origin: OriginFor<T>,
            contract: Address,
            to: T::AccountId,
            amount: u64,
        ) -> DispatchResult {
            T::MintOrigin::ensure_origin(origin)?;
            ensure!(amount > 0, Error::<T>::ZeroAmount);
            Self::do_mint(&contract, &to, amount)?;
            Ok(())
        }

        /// Transfer an encrypted input of the caller to `to`.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::confidential_transfer())]
        pub fn confidential_transfer(
            origin: OriginFor<T>,
            contract: Address,
            to: T::AccountId,
            amount: Handle,
            proof: InputProof,
        ) -> DispatchResult {
            let from = ensure_signed(origin)?;
            Self::ensure_token(&contract)?;
            let amount = T::Fhe::verify_input(&contract, &from, &amount, &proof)?;
            Self::do_transfer(&contract, &from, &to, amount)?;
            Ok(())
        }

        /// Transfer, then invoke the receiver hook of `to` atomically.
        #[pallet::call_index(3)]
        #[pallet::weight(T::WeightInfo::confidential_transfer_and_call())]
        pub fn confidential_transfer_and_call(
            origin: OriginFor<T>,
            contract: Address,
            to: T::AccountId,
            amount: Handle,
            proof: InputProof,
            data: CallbackData,
        ) -> DispatchResult {
            let from = ensure_signed(origin)?;
            Self::do_transfer_and_call(&contract, &from, &to, amount, &proof, &data)?;
            Ok(())
        }
    }

    impl<T: Config> Pallet<T> {
        pub fn balance_of(contract: &Address, who: &T::AccountId) -> Handle {
            Balances::<T>::get(contract, who)
        }

        pub fn total_supply(contract: &Address) -> Handle {
            TotalSupply::<T>::get(contract)
        }

        pub fn metadata(contract: &Address) -> Option<TokenMetadata> {
            Tokens::<T>::get(contract)
        }

        fn ensure_token(contract: &Address) -> DispatchResult {
            ensure!(Tokens::<T>::contains_key(contract), Error::<T>::UnknownToken);
            Ok(())
        }

        /// Verify `amount`, transfer it and run the receiver hook.
        ///
        /// Returns the transferred handle and the hook's result.
        #[transactional]
        pub fn do_transfer_and_call(
            contract: &Address,
            from: &T::AccountId,
            to: &T::AccountId,
            amount: Handle,
            proof: &[u8],
            data: &[u8],
        ) -> Result<(Handle, Option<Handle>), DispatchError> {
            Self::ensure_token(contract)?;
            let amount = T::Fhe::verify_input(contract, from, &amount, proof)?;
            let sent = Self::do_transfer(contract, from, to, amount)?;
            T::Fhe::allow_contract(&sent, contract);
            let result = T::Receiver::on_confidential_received(contract, from, to, sent, data)?;
            log::debug!(
                target: LOG_TARGET,
                "transfer_and_call on {:?}: hook returned {}",
                contract,
                if result.is_some() { "a handle" } else { "nothing" },
            );
            Ok((sent, result))
        }

        pub(crate) fn do_mint(
            contract: &Address,
            to: &T::AccountId,
            amount: u64,
        ) -> Result<Handle, DispatchError> {
            Self::ensure_token(contract)?;
            let minted = T::Fhe::as_encrypted(amount)?;

            let balance = T::Fhe::add(&Self::balance_of(contract, to), &minted)?;
            Self::store_balance(contract, to, balance);

            let supply = T::Fhe::add(&Self::total_supply(contract), &minted)?;
            T::Fhe::allow_contract(&supply, contract);
            TotalSupply::<T>::insert(contract, supply);

            Self::deposit_event(Event::Minted {
                contract: *contract,
                to: to.clone(),
                amount,
            });
            Ok(balance)
        }

        pub(crate) fn do_transfer(
            contract: &Address,
            from: &T::AccountId,
            to: &T::AccountId,
            amount: Handle,
        ) -> Result<Handle, DispatchError> {
            Self::ensure_token(contract)?;
            ensure!(T::Fhe::is_allowed(&amount, from), Error::<T>::HandleNotAllowed);

            let from_balance = Self::balance_of(contract, from);
            let covered = T::Fhe::ge(&from_balance, &amount)?;
            let sent = T::Fhe::select(&covered, &amount, &ZERO_HANDLE)?;

            let from_balance = T::Fhe::sub(&from_balance, &sent)?;
            Self::store_balance(contract, from, from_balance);
            // read after the debit so a self-transfer nets out
            let to_balance = T::Fhe::add(&Self::balance_of(contract, to), &sent)?;
            Self::store_balance(contract, to, to_balance);

            T::Fhe::allow(&sent, from);
            T::Fhe::allow(&sent, to);
            Self::deposit_event(Event::ConfidentialTransfer {
                contract: *contract,
                from: from.clone(),
                to: to.clone(),
                amount: sent,
            });
            Ok(sent)
        }

        fn store_balance(contract: &Address, who: &T::AccountId, balance: Handle) {
            T::Fhe::allow(&balance, who);
            T::Fhe::allow_contract(&balance, contract);
            Balances::<T>::insert(contract, who, balance);
        }
    }

    impl<T: Config> ConfidentialToken<T::AccountId> for Pallet<T> {
        fn balance_of(contract: &Address, who: &T::AccountId) -> Handle {
            Balances::<T>::get(contract, who)
        }

        fn transfer_encrypted(
            contract: &Address,
            from: &T::AccountId,
            to: &T::AccountId,
            amount: Handle,
        ) -> Result<Handle, DispatchError> {
            Self::do_transfer(contract, from, to, amount)
        }

        fn mint(contract: &Address, to: &T::AccountId, amount: u64) -> Result<Handle, DispatchError> {
            ensure!(amount > 0, Error::<T>::ZeroAmount);
            Self::do_mint(contract, to, amount)
        }
    }
}
