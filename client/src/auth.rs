//! User decryption authorization.
//!
//! A grant is built in fixed steps, each a distinct type so a step cannot be
//! skipped or repeated:
//!
//! `DecryptionRequest -> KeyedRequest -> ComposedStatement -> SignedStatement -> DecryptionGrant`
//!
//! A grant lives for exactly one decryption call: [`crate::EncryptionOracle::decrypt`]
//! takes it by value.

use confidential_swap_primitives::Address;

use crate::{
    Clock, SignerError,
    eip712::{Eip712Domain, UserDecryptStatement, signing_hash},
    keys::EphemeralKeypair,
    types::HandleContractPair,
    wallet::TypedDataSigner,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantState {
    Issued,
    Consumed,
    Expired,
}

/// The `(handle, contract)` pairs `owner` wants revealed.
#[derive(Clone, Debug)]
pub struct DecryptionRequest {
    owner: Address,
    pairs: Vec<HandleContractPair>,
}

impl DecryptionRequest {
    pub fn new(owner: Address, pairs: Vec<HandleContractPair>) -> Self {
        Self { owner, pairs }
    }

    pub fn generate_keypair(self) -> KeyedRequest {
        let keypair = EphemeralKeypair::generate();
        tracing::debug!(owner = ?self.owner, handles = self.pairs.len(), "ephemeral keypair generated");
        KeyedRequest {
            request: self,
            keypair,
        }
    }
}

#[derive(Debug)]
pub struct KeyedRequest {
    request: DecryptionRequest,
    keypair: EphemeralKeypair,
}

impl KeyedRequest {
    /// Bind public key, contract scope and validity window into the typed
    /// statement. The scope is the distinct contracts of the request, in order.
    pub fn compose(
        self,
        domain: &Eip712Domain,
        issued_at: u64,
        validity_secs: u64,
    ) -> ComposedStatement {
        let mut scope: Vec<Address> = Vec::new();
        for pair in &self.request.pairs {
            if !scope.contains(&pair.contract_address) {
                scope.push(pair.contract_address);
            }
        }
        let statement = UserDecryptStatement {
            public_key: self.keypair.public_bytes().to_vec(),
            contract_addresses: scope,
            start_timestamp: issued_at,
            duration_seconds: validity_secs,
            extra_data: Vec::new(),
        };
        ComposedStatement {
            request: self.request,
            keypair: self.keypair,
            domain: domain.clone(),
            statement,
        }
    }
}

#[derive(Debug)]
pub struct ComposedStatement {
    request: DecryptionRequest,
    keypair: EphemeralKeypair,
    domain: Eip712Domain,
    statement: UserDecryptStatement,
}

impl ComposedStatement {
    /// What the wallet will be asked to sign.
    pub fn statement(&self) -> &UserDecryptStatement {
        &self.statement
    }

    pub fn digest(&self) -> [u8; 32] {
        signing_hash(&self.domain, &self.statement)
    }

    pub fn sign<S: TypedDataSigner + ?Sized>(
        self,
        signer: &S,
    ) -> Result<SignedStatement, SignerError> {
        let signature = signer.sign_typed_data(&self.domain, &self.statement)?;
        tracing::debug!(signer = ?signer.address(), "decryption statement signed");
        Ok(SignedStatement {
            composed: self,
            signature,
        })
    }
}

#[derive(Debug)]
pub struct SignedStatement {
    composed: ComposedStatement,
    signature: [u8; 65],
}

impl SignedStatement {
    pub fn issue(self) -> DecryptionGrant {
        let ComposedStatement {
            request,
            keypair,
            statement,
            ..
        } = self.composed;
        DecryptionGrant {
            owner: request.owner,
            pairs: request.pairs,
            keypair,
            statement,
            signature: self.signature,
        }
    }
}

/// A signed, time-boxed permission to decrypt specific handles for one owner.
#[derive(Debug)]
pub struct DecryptionGrant {
    owner: Address,
    pairs: Vec<HandleContractPair>,
    keypair: EphemeralKeypair,
    statement: UserDecryptStatement,
    signature: [u8; 65],
}

impl DecryptionGrant {
    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn pairs(&self) -> &[HandleContractPair] {
        &self.pairs
    }

    pub fn statement(&self) -> &UserDecryptStatement {
        &self.statement
    }

    pub fn signature(&self) -> &[u8; 65] {
        &self.signature
    }

    pub fn keypair(&self) -> &EphemeralKeypair {
        &self.keypair
    }

    pub fn contract_scope(&self) -> &[Address] {
        &self.statement.contract_addresses
    }

    /// `Issued` until `now` passes `issued_at + validity`, `Expired` after.
    pub fn state_at(&self, now: u64) -> GrantState {
        if now > self.statement.expires_at() {
            GrantState::Expired
        } else {
            GrantState::Issued
        }
    }

    /// End of life after a decryption call, whatever its outcome.
    pub fn consume(self) -> GrantState {
        tracing::debug!(owner = ?self.owner, "decryption grant consumed");
        GrantState::Consumed
    }
}

/// Drives a [`DecryptionRequest`] to a [`DecryptionGrant`].
#[derive(Debug)]
pub struct AuthorizationProtocol<C> {
    domain: Eip712Domain,
    validity_secs: u64,
    clock: C,
}

impl<C: Clock> AuthorizationProtocol<C> {
    pub fn new(domain: Eip712Domain, validity_secs: u64, clock: C) -> Self {
        Self {
            domain,
            validity_secs,
            clock,
        }
    }

    /// Generate keys, compose the statement at the current time and have
    /// `signer` sign it.
    pub fn authorize<S: TypedDataSigner + ?Sized>(
        &self,
        owner: Address,
        pairs: Vec<HandleContractPair>,
        signer: &S,
    ) -> Result<DecryptionGrant, SignerError> {
        let grant = DecryptionRequest::new(owner, pairs)
            .generate_keypair()
            .compose(&self.domain, self.clock.now(), self.validity_secs)
            .sign(signer)?
            .issue();
        Ok(grant)
    }
}
