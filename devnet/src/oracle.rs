//! `MockOracle`: encryption service and user-decryption gateway for the dev
//! chain.
//!
//! Encryption seals inputs with the runtime's sealing key so the coprocessor
//! pallet accepts them. User decryption checks, in order: the typed-data
//! signature recovers to the requesting user, the grant window is open, every
//! handle's contract is in the signed scope, and the coprocessor ACL lets the
//! user (and the named contract) use the handle. Replies are sealed to the
//! request's ephemeral public key.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use confidential_swap_client::{
    Clock, EncryptionOracle, OracleError,
    eip712::{Eip712Domain, UserDecryptStatement, recover_signer, signing_hash},
    keys::seal_for,
    oracle::{EncryptRequest, EncryptResponse, UserDecryptRequest, UserDecryptResponse},
    types::to_hex,
};
use confidential_swap_primitives::{Address, FheBackend, Handle, seal_inputs};
use rand::RngCore;

use crate::{
    chain::DevChain,
    runtime::{AccountId, Coprocessor, SEALING_KEY},
};

/// An input handed out by `encrypt` that may not have reached the chain yet.
#[derive(Clone, Copy, Debug)]
struct IssuedInput {
    contract: Address,
    owner: Address,
    value: u64,
}

pub struct MockOracle<C> {
    chain: Arc<DevChain>,
    domain: Eip712Domain,
    clock: C,
    issued: Mutex<HashMap<Handle, IssuedInput>>,
    online: AtomicBool,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
}

impl<C: Clock> MockOracle<C> {
    pub fn new(chain: Arc<DevChain>, domain: Eip712Domain, clock: C) -> Self {
        Self {
            chain,
            domain,
            clock,
            issued: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            encrypt_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
        }
    }

    /// Take the oracle offline (or back online).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    pub fn round_trips(&self) -> usize {
        self.encrypt_calls() + self.decrypt_calls()
    }

    fn ensure_online(&self) -> Result<(), OracleError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(OracleError::Unavailable)
        }
    }

    fn authorize(&self, request: &UserDecryptRequest) -> Result<(), OracleError> {
        let statement = UserDecryptStatement {
            public_key: request.public_key.clone(),
            contract_addresses: request.contract_addresses.clone(),
            start_timestamp: request.start_timestamp,
            duration_seconds: request.duration_seconds,
            extra_data: request.extra_data.clone(),
        };
        let digest = signing_hash(&self.domain, &statement);
        let signer = recover_signer(&digest, &request.signature)
            .map_err(|e| OracleError::AuthorizationInvalid(e.to_string()))?;
        if signer != request.user_address {
            return Err(OracleError::AuthorizationInvalid(
                "signature was not produced by the requesting user".into(),
            ));
        }

        let now = self.clock.now();
        if now < statement.start_timestamp {
            return Err(OracleError::AuthorizationInvalid("grant not yet valid".into()));
        }
        if now > statement.expires_at() {
            return Err(OracleError::GrantExpired);
        }

        if let Some(pair) = request
            .handle_contract_pairs
            .iter()
            .find(|p| !statement.contract_addresses.contains(&p.contract_address))
        {
            return Err(OracleError::ScopeMismatch(pair.contract_address));
        }
        Ok(())
    }

    /// Inputs handed out by `encrypt` that the chain has not verified yet.
    pub fn pending_inputs(&self) -> usize {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Once verified on chain an input is served from chain state.
    fn forget_issued(&self, landed: &[Handle]) {
        if landed.is_empty() {
            return;
        }
        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        for handle in landed {
            issued.remove(handle);
        }
        tracing::trace!(count = landed.len(), "verified inputs dropped from the issued registry");
    }

    /// Cleartext of an input `user` encrypted for `contract` through this oracle.
    fn issued_value(&self, handle: &Handle, contract: Address, user: Address) -> Option<u64> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .filter(|i| i.contract == contract && i.owner == user)
            .map(|i| i.value)
    }
}

impl<C: Clock> EncryptionOracle for MockOracle<C> {
    async fn encrypt(&self, request: EncryptRequest) -> Result<EncryptResponse, OracleError> {
        self.ensure_online()?;
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);

        let mut nonce = [0u8; 32];
        rand::rng().fill_bytes(&mut nonce);
        let owner: AccountId = request.user_address;
        let (handles, proof) = seal_inputs(
            &SEALING_KEY,
            &request.contract_address,
            &owner,
            &nonce,
            &request.values,
        )
        .ok_or_else(|| OracleError::Malformed("too many values in one input".into()))?;

        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        for (handle, value) in handles.iter().zip(&request.values) {
            issued.insert(
                *handle,
                IssuedInput {
                    contract: request.contract_address,
                    owner,
                    value: *value,
                },
            );
        }
        tracing::debug!(contract = ?request.contract_address, count = handles.len(), "input encrypted");
        Ok(EncryptResponse {
            handles: handles.iter().map(|h| to_hex(h)).collect(),
            input_proof: to_hex(&proof),
        })
    }

    async fn user_decrypt(
        &self,
        request: UserDecryptRequest,
    ) -> Result<UserDecryptResponse, OracleError> {
        self.ensure_online()?;
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.authorize(&request) {
            tracing::warn!(user = ?request.user_address, error = %e, "user decryption refused");
            return Err(e);
        }

        let user = request.user_address;
        let pairs = request.handle_contract_pairs.clone();
        let issued: Vec<Handle> = self
            .issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        // (handle, contract, on-chain cleartext if the ACL allows it), plus
        // the issued inputs the chain has since verified
        let (onchain, landed): (Vec<(Handle, Address, Option<u64>)>, Vec<Handle>) = self
            .chain
            .read(move || {
                let onchain: Vec<(Handle, Address, Option<u64>)> = pairs
                    .iter()
                    .map(|p| {
                        let h = p.handle;
                        let allowed = Coprocessor::is_allowed_for(&h, &user)
                            && <Coprocessor as FheBackend<AccountId>>::is_allowed_contract(
                                &h,
                                &p.contract_address,
                            );
                        let value = if allowed { Coprocessor::cleartext_of(&h) } else { None };
                        (h, p.contract_address, value)
                    })
                    .collect();
                let landed: Vec<Handle> = issued
                    .into_iter()
                    .filter(|h| Coprocessor::cleartext_of(h).is_some())
                    .collect();
                (onchain, landed)
            })
            .await
            .map_err(|_| OracleError::Unavailable)?;
        self.forget_issued(&landed);

        let mut results = HashMap::with_capacity(onchain.len());
        for (handle, contract, value) in onchain {
            let value = value
                .or_else(|| self.issued_value(&handle, contract, user))
                .ok_or_else(|| {
                    OracleError::AuthorizationInvalid(format!(
                        "{} is not decryptable by {user:?} on {contract:?}",
                        to_hex(&handle)
                    ))
                })?;
            let sealed = seal_for(&request.public_key, &handle, value)
                .ok_or_else(|| OracleError::Malformed("public key is not a valid point".into()))?;
            results.insert(to_hex(&handle), to_hex(&sealed));
        }
        tracing::debug!(user = ?user, count = results.len(), "user decryption served");
        Ok(UserDecryptResponse { results })
    }
}
