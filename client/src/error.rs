use confidential_swap_primitives::Address;
use thiserror::Error;

/// Failures reported by an [`crate::EncryptionOracle`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("authorization invalid: {0}")]
    AuthorizationInvalid(String),
    #[error("decryption grant expired")]
    GrantExpired,
    #[error("contract {0:?} is outside the grant scope")]
    ScopeMismatch(Address),
    #[error("oracle unavailable")]
    Unavailable,
    #[error("malformed oracle message: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Transaction aborted; nothing was applied.
    #[error("transaction reverted: {reason}")]
    Reverted { reason: String },
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("invalid secret key")]
    InvalidKey,
    #[error("signature must be 65 bytes, got {0}")]
    BadSignatureLength(usize),
    #[error("signature does not recover to a public key")]
    Unrecoverable,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Why a swap did not settle. Balances are unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwapFailure {
    #[error("pool reserve cannot cover the output")]
    InsufficientPoolReserve,
    #[error("swap hook invoked by an unauthorized contract")]
    UnauthorizedCaller,
    #[error("encrypted input proof rejected")]
    ProofRejected,
    #[error(transparent)]
    Oracle(OracleError),
    #[error("reverted: {0}")]
    Reverted(String),
}

impl From<LedgerError> for SwapFailure {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Reverted { reason } => match reason.as_str() {
                "InsufficientPoolReserve" => SwapFailure::InsufficientPoolReserve,
                "UnauthorizedCaller" => SwapFailure::UnauthorizedCaller,
                "ProofRejected" | "InputAlreadyUsed" => SwapFailure::ProofRejected,
                _ => SwapFailure::Reverted(reason),
            },
            LedgerError::Unavailable(msg) => SwapFailure::Reverted(msg),
        }
    }
}

impl From<OracleError> for SwapFailure {
    fn from(e: OracleError) -> Self {
        SwapFailure::Oracle(e)
    }
}

/// Why a reveal produced no cleartext.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevealFailure {
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Rejected locally; nothing reached the oracle or the ledger.
    #[error("invalid amount {0:?}: expected a positive whole number")]
    InvalidAmount(String),
    #[error("swap failed: {reason}")]
    SwapFailed { reason: SwapFailure },
    #[error("reveal failed: {reason}")]
    RevealFailed { reason: RevealFailure },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ClientError {
    pub fn swap_failed(reason: impl Into<SwapFailure>) -> Self {
        ClientError::SwapFailed {
            reason: reason.into(),
        }
    }

    pub fn reveal_failed(reason: impl Into<RevealFailure>) -> Self {
        ClientError::RevealFailed {
            reason: reason.into(),
        }
    }
}
