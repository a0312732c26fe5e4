//! Client side of confidential fixed-rate swaps.
//!
//! * [`EncryptionOracle`]: encrypts inputs and serves user decryption.
//! * [`AuthorizationProtocol`]: builds the signed, time-boxed grant a user
//!   decryption needs.
//! * [`Ledger`]: the settlement layer holding encrypted balances.
//! * [`SwapClient`]: ties the three together for `swap` and `reveal_balance`.

pub mod auth;
pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod eip712;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod oracle;
pub mod types;
pub mod wallet;

pub use auth::{AuthorizationProtocol, DecryptionGrant, GrantState};
pub use cache::RevealCache;
pub use client::{SwapClient, parse_amount};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, DEFAULT_GRANT_VALIDITY_SECS};
pub use error::{
    ClientError, ConfigError, LedgerError, OracleError, RevealFailure, SignerError, SwapFailure,
};
pub use ledger::{Ledger, TxReceipt};
pub use oracle::EncryptionOracle;
pub use types::{EncryptedInput, EncryptedValue, HandleContractPair};
pub use wallet::{LocalWallet, TypedDataSigner};

pub use confidential_swap_primitives::{Address, Handle, ZERO_HANDLE};
