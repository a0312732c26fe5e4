//! In-process ledger.
//!
//! The runtime state lives on a dedicated block-producer thread; callers send
//! it jobs over a channel, so transactions are applied strictly one at a time
//! in arrival order. Every transaction gets its own block.

use std::sync::mpsc;

use confidential_swap_client::{Ledger, LedgerError, TxReceipt};
use confidential_swap_primitives::{Address, Handle};
use frame_system::RawOrigin;
use pallet_confidential_swap::PoolState;
use parity_scale_codec::Encode;
use sp_io::TestExternalities;
use sp_runtime::{BuildStorage, DispatchError, ModuleError, traits::Dispatchable};
use tokio::sync::oneshot;

use crate::runtime::{
    AccountId, Coprocessor, Runtime, RuntimeCall, RuntimeEvent, Swap, System, Tokens,
    genesis_tokens,
};

type Job = Box<dyn FnOnce(&mut TestExternalities) + Send>;

/// Error name for module errors, the message otherwise.
pub fn revert_reason(err: DispatchError) -> String {
    match err {
        DispatchError::Module(ModuleError {
            message: Some(m), ..
        }) => m.to_string(),
        DispatchError::Other(m) => m.to_string(),
        other => format!("{other:?}"),
    }
}

fn reverted(err: DispatchError) -> LedgerError {
    LedgerError::Reverted {
        reason: revert_reason(err),
    }
}

fn stopped() -> LedgerError {
    LedgerError::Unavailable("dev chain stopped".into())
}

fn genesis() -> Result<TestExternalities, LedgerError> {
    let storage = frame_system::GenesisConfig::<Runtime>::default()
        .build_storage()
        .map_err(LedgerError::Unavailable)?;
    let mut ext = TestExternalities::new(storage);
    ext.execute_with(|| {
        System::set_block_number(1);
        for (contract, name, symbol, decimals) in genesis_tokens() {
            let call = RuntimeCall::Tokens(pallet_confidential_token::Call::create_token {
                contract,
                name: name.to_vec(),
                symbol: symbol.to_vec(),
                decimals,
            });
            call.dispatch(RawOrigin::Root.into())
                .map_err(|e| reverted(e.error))?;
        }
        Ok::<_, LedgerError>(())
    })?;
    Ok(ext)
}

/// Apply `call` from `origin` in a fresh block.
fn apply(origin: RawOrigin<AccountId>, call: RuntimeCall) -> Result<TxReceipt, LedgerError> {
    let block = System::block_number() + 1;
    System::set_block_number(block);
    System::reset_events();
    let hash = sp_io::hashing::blake2_256(&(block, &call).encode());

    if let Err(e) = call.dispatch(origin.into()) {
        let err = reverted(e.error);
        tracing::warn!(block, %err, "transaction reverted");
        return Err(err);
    }

    let hook_output = System::events().into_iter().find_map(|r| match r.event {
        RuntimeEvent::Swap(pallet_confidential_swap::Event::Swapped { amount_out, .. }) => {
            Some(amount_out)
        }
        _ => None,
    });
    tracing::debug!(block, hash = %hex::encode(hash), "transaction applied");
    Ok(TxReceipt {
        block,
        hash,
        hook_output,
    })
}

pub struct DevChain {
    jobs: mpsc::Sender<Job>,
}

impl DevChain {
    /// Build genesis (both tokens registered) and start the block producer.
    pub fn start() -> Result<Self, LedgerError> {
        let (jobs, inbox) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        std::thread::Builder::new()
            .name("devnet-block-producer".into())
            .spawn(move || {
                let mut ext = match genesis() {
                    Ok(ext) => {
                        let _ = ready_tx.send(Ok(()));
                        ext
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                while let Ok(job) = inbox.recv() {
                    job(&mut ext);
                }
                tracing::debug!("dev chain stopped");
            })
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        ready_rx.recv().map_err(|_| stopped())??;
        tracing::info!(weth = ?crate::runtime::WETH, wzama = ?crate::runtime::WZAMA, "dev chain started");
        Ok(Self { jobs })
    }

    /// Run `f` against the current state. Jobs are serialized with transactions.
    pub async fn read<R, F>(&self, f: F) -> Result<R, LedgerError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.jobs
            .send(Box::new(move |ext: &mut TestExternalities| {
                let _ = tx.send(ext.execute_with(f));
            }))
            .map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())
    }

    pub async fn submit(
        &self,
        origin: RawOrigin<AccountId>,
        call: RuntimeCall,
    ) -> Result<TxReceipt, LedgerError> {
        self.read(move || apply(origin, call)).await?
    }

    pub fn pool_account(&self) -> AccountId {
        Swap::pool_account()
    }

    pub async fn pool_state(&self) -> Result<PoolState, LedgerError> {
        self.read(Swap::pool_state).await
    }

    pub async fn block_number(&self) -> Result<u64, LedgerError> {
        self.read(System::block_number).await
    }

    /// Mock-mode cleartext of `handle`. Decryption gateways only.
    pub async fn cleartext_of(&self, handle: Handle) -> Result<Option<u64>, LedgerError> {
        self.read(move || Coprocessor::cleartext_of(&handle)).await
    }
}

impl Ledger for DevChain {
    async fn confidential_balance_of(
        &self,
        contract: Address,
        owner: Address,
    ) -> Result<Handle, LedgerError> {
        self.read(move || Tokens::balance_of(&contract, &owner)).await
    }

    async fn transfer_and_call(
        &self,
        from: Address,
        contract: Address,
        to: Address,
        amount: Handle,
        proof: Vec<u8>,
        data: Vec<u8>,
    ) -> Result<TxReceipt, LedgerError> {
        let too_large = |what: &str| LedgerError::Reverted {
            reason: format!("{what}TooLarge"),
        };
        let call = RuntimeCall::Tokens(
            pallet_confidential_token::Call::confidential_transfer_and_call {
                contract,
                to,
                amount,
                proof: proof.try_into().map_err(|_| too_large("Proof"))?,
                data: data.try_into().map_err(|_| too_large("Data"))?,
            },
        );
        self.submit(RawOrigin::Signed(from), call).await
    }

    async fn mint(
        &self,
        minter: Address,
        contract: Address,
        to: Address,
        amount: u64,
    ) -> Result<TxReceipt, LedgerError> {
        let call = RuntimeCall::Tokens(pallet_confidential_token::Call::mint {
            contract,
            to,
            amount,
        });
        self.submit(RawOrigin::Signed(minter), call).await
    }

    async fn swap_rate(&self) -> Result<u64, LedgerError> {
        Ok(Swap::swap_rate())
    }
}
