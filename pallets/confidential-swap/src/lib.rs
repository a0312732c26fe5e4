//! pallet-confidential-swap: fixed-rate swap between two encrypted-balance
//! tokens.
//!
//! Holders deposit the input token with `confidential_transfer_and_call`
//! addressed to [`Pallet::pool_account`]; the token pallet then runs this
//! pallet's [`ConfidentialReceiver`] hook in the same transaction, which
//! settles the swap:
//!
//! 1. only the configured input token may call the hook,
//! 2. `out = in * SwapRate` is computed homomorphically,
//! 3. an encrypted `reserve >= out` is required (a failure aborts the whole
//!    transaction, deposit included),
//! 4. `out` is paid from the pool's output-token balance to the depositor.
//!
//! No cleartext amount is ever computed here. The pool's reserves are only
//! available as handles via [`Pallet::pool_state`].

#![cfg_attr(not(feature = "std"), no_std)]

use confidential_swap_primitives::{
    Address, ConfidentialReceiver, ConfidentialToken, FheBackend, Handle,
};
use frame_support::{pallet_prelude::*, PalletId};
use frame_system::pallet_prelude::*;
use sp_runtime::{traits::AccountIdConversion, ArithmeticError};

pub use pallet::*;

#[cfg(test)]
mod mock;

const LOG_TARGET: &str = "runtime::confidential-swap";

/// Encrypted reserves held by the pool account.
#[derive(Encode, Decode, Clone, PartialEq, Eq, TypeInfo, MaxEncodedLen, RuntimeDebug)]
pub struct PoolState {
    pub input_reserve: Handle,
    pub output_reserve: Handle,
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        type Token: ConfidentialToken<Self::AccountId>;
        type Fhe: FheBackend<Self::AccountId>;

        /// Contract of the token the pool accepts.
        #[pallet::constant]
        type InputToken: Get<Address>;

        /// Contract of the token the pool pays out.
        #[pallet::constant]
        type OutputToken: Get<Address>;

        /// Output units paid per input unit. Must be non-zero.
        #[pallet::constant]
        type SwapRate: Get<u64>;

        /// PalletId to derive the pool account.
        #[pallet::constant]
        type PalletId: Get<PalletId>;
    }

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    #[pallet::hooks]
    impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
        fn integrity_test() {
            assert!(T::SwapRate::get() > 0, "swap rate must be non-zero");
            assert!(
                T::InputToken::get() != T::OutputToken::get(),
                "input and output token must differ"
            );
        }
    }

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        Swapped {
            who: T::AccountId,
            amount_in: Handle,
            amount_out: Handle,
        },
    }

    #[pallet::error]
    pub enum Error<T> {
        /// Hook invoked by a contract other than the input token.
        UnauthorizedCaller,
        /// Pool cannot cover the encrypted output amount.
        InsufficientPoolReserve,
        /// `amount_in * rate` does not fit the encrypted integer width.
        RateOverflow,
    }

    impl<T: Config> Pallet<T> {
        #[inline]
        pub fn pool_account() -> T::AccountId {
            T::PalletId::get().into_account_truncating()
        }

        pub fn swap_rate() -> u64 {
            T::SwapRate::get()
        }

        pub fn pool_state() -> PoolState {
            let pool = Self::pool_account();
            PoolState {
                input_reserve: T::Token::balance_of(&T::InputToken::get(), &pool),
                output_reserve: T::Token::balance_of(&T::OutputToken::get(), &pool),
            }
        }

        /// Output a cleartext input would yield; `None` on overflow.
        pub fn quote(amount_in: u64) -> Option<u64> {
            amount_in.checked_mul(T::SwapRate::get())
        }

        /// Settle a deposit of `amount_in` (already credited to the pool)
        /// made by `from` through `caller`. Returns the encrypted payout.
        pub fn on_receive(
            caller: &Address,
            from: &T::AccountId,
            amount_in: Handle,
        ) -> Result<Handle, DispatchError> {
            ensure!(*caller == T::InputToken::get(), Error::<T>::UnauthorizedCaller);

            let out =
                T::Fhe::mul_scalar(&amount_in, T::SwapRate::get()).map_err(|e| match e {
                    DispatchError::Arithmetic(ArithmeticError::Overflow) => {
                        Error::<T>::RateOverflow.into()
                    }
                    other => other,
                })?;

            let pool = Self::pool_account();
            let output_token = T::OutputToken::get();
            let reserve = T::Token::balance_of(&output_token, &pool);
            let solvent = T::Fhe::ge(&reserve, &out)?;
            T::Fhe::require(&solvent).map_err(|_| Error::<T>::InsufficientPoolReserve)?;

            T::Fhe::allow(&out, &pool);
            T::Fhe::allow_contract(&out, &output_token);
            let paid = T::Token::transfer_encrypted(&output_token, &pool, from, out)?;

            log::debug!(target: LOG_TARGET, "swap settled for {:?}", from);
            Self::deposit_event(Event::Swapped {
                who: from.clone(),
                amount_in,
                amount_out: paid,
            });
            Ok(paid)
        }
    }

    impl<T: Config> ConfidentialReceiver<T::AccountId> for Pallet<T> {
        fn on_confidential_received(
            token: &Address,
            from: &T::AccountId,
            to: &T::AccountId,
            amount: Handle,
            _data: &[u8],
        ) -> Result<Option<Handle>, DispatchError> {
            if *to != Self::pool_account() {
                return Ok(None);
            }
            Self::on_receive(token, from, amount).map(Some)
        }
    }
}
