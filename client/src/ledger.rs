use std::{future::Future, sync::Arc};

use confidential_swap_primitives::{Address, Handle};

use crate::LedgerError;

/// Outcome of a confirmed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub block: u64,
    pub hash: [u8; 32],
    /// Handle returned by the receiver hook of a transfer-and-call, if any.
    pub hook_output: Option<Handle>,
}

/// The settlement layer as seen by the client. Every method resolves once
/// the underlying transaction is final; a revert leaves no trace.
pub trait Ledger: Send + Sync {
    fn confidential_balance_of(
        &self,
        contract: Address,
        owner: Address,
    ) -> impl Future<Output = Result<Handle, LedgerError>> + Send;

    /// Transfer an encrypted input from `from` and call `to`'s hook atomically.
    fn transfer_and_call(
        &self,
        from: Address,
        contract: Address,
        to: Address,
        amount: Handle,
        proof: Vec<u8>,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<TxReceipt, LedgerError>> + Send;

    fn mint(
        &self,
        minter: Address,
        contract: Address,
        to: Address,
        amount: u64,
    ) -> impl Future<Output = Result<TxReceipt, LedgerError>> + Send;

    fn swap_rate(&self) -> impl Future<Output = Result<u64, LedgerError>> + Send;
}

impl<T: Ledger + ?Sized> Ledger for Arc<T> {
    fn confidential_balance_of(
        &self,
        contract: Address,
        owner: Address,
    ) -> impl Future<Output = Result<Handle, LedgerError>> + Send {
        (**self).confidential_balance_of(contract, owner)
    }

    fn transfer_and_call(
        &self,
        from: Address,
        contract: Address,
        to: Address,
        amount: Handle,
        proof: Vec<u8>,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<TxReceipt, LedgerError>> + Send {
        (**self).transfer_and_call(from, contract, to, amount, proof, data)
    }

    fn mint(
        &self,
        minter: Address,
        contract: Address,
        to: Address,
        amount: u64,
    ) -> impl Future<Output = Result<TxReceipt, LedgerError>> + Send {
        (**self).mint(minter, contract, to, amount)
    }

    fn swap_rate(&self) -> impl Future<Output = Result<u64, LedgerError>> + Send {
        (**self).swap_rate()
    }
}
