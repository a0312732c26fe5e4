//! User-facing orchestration: swap and reveal.

use confidential_swap_primitives::{Address, Handle, ZERO_HANDLE};

use crate::{
    AuthorizationProtocol, ClientConfig, ClientError, Clock, ConfigError, EncryptionOracle,
    Ledger, OracleError, RevealCache, TxReceipt,
    types::{EncryptedValue, HandleContractPair},
    wallet::TypedDataSigner,
};

/// Parse a user-supplied amount: a positive whole number that fits in `u64`.
pub fn parse_amount(raw: &str) -> Result<u64, ClientError> {
    let trimmed = raw.trim();
    let invalid = || ClientError::InvalidAmount(raw.to_string());
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match trimmed.parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(invalid()),
    }
}

/// Coordinates the oracle, the authorization protocol and the ledger.
///
/// Holds no per-operation state: concurrent calls share only the
/// configuration and the reveal cache.
pub struct SwapClient<O, L, C> {
    oracle: O,
    ledger: L,
    auth: AuthorizationProtocol<C>,
    config: ClientConfig,
    cache: RevealCache,
}

impl<O, L, C> SwapClient<O, L, C>
where
    O: EncryptionOracle,
    L: Ledger,
    C: Clock,
{
    pub fn new(oracle: O, ledger: L, clock: C, config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let auth = AuthorizationProtocol::new(config.domain(), config.grant_validity_secs, clock);
        Ok(Self {
            oracle,
            ledger,
            auth,
            config,
            cache: RevealCache::default(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn cache(&self) -> &RevealCache {
        &self.cache
    }

    /// Swap `amount` input tokens of `owner` into output tokens.
    ///
    /// Resolves once the deposit-and-call transaction is confirmed. Any
    /// revert comes back as [`ClientError::SwapFailed`] with the reason.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn swap(&self, owner: Address, amount: &str) -> Result<TxReceipt, ClientError> {
        let amount = parse_amount(amount)?;
        let input = self
            .oracle
            .encrypt_u64(self.config.input_token, owner, amount)
            .await
            .map_err(ClientError::swap_failed)?;
        let handle = input
            .handles
            .first()
            .map(|v| v.handle)
            .ok_or_else(|| ClientError::swap_failed(OracleError::Malformed("no handle".into())))?;

        let receipt = self
            .ledger
            .transfer_and_call(
                owner,
                self.config.input_token,
                self.config.swap_pool,
                handle,
                input.proof,
                Vec::new(),
            )
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "swap reverted");
                ClientError::swap_failed(e)
            })?;
        self.cache.invalidate(owner, self.config.input_token);
        self.cache.invalidate(owner, self.config.output_token);
        tracing::info!(block = receipt.block, "swap confirmed");
        Ok(receipt)
    }

    /// Reveal the cleartext behind `handle` of `contract` to `owner`.
    ///
    /// The zero handle reveals as `0` without contacting the oracle.
    #[tracing::instrument(level = "debug", skip(self, signer, handle))]
    pub async fn reveal_balance<S: TypedDataSigner + ?Sized>(
        &self,
        signer: &S,
        owner: Address,
        handle: Handle,
        contract: Address,
    ) -> Result<u64, ClientError> {
        if handle == ZERO_HANDLE {
            return Ok(0);
        }
        let pair = HandleContractPair {
            handle,
            contract_address: contract,
        };
        let grant = self
            .auth
            .authorize(owner, vec![pair], signer)
            .map_err(ClientError::reveal_failed)?;
        let pairs = grant.pairs().to_vec();
        let values = self.oracle.decrypt(&pairs, grant).await.map_err(|e| {
            tracing::warn!(error = %e, "reveal failed");
            ClientError::reveal_failed(e)
        })?;
        values.first().copied().ok_or_else(|| {
            ClientError::reveal_failed(OracleError::Malformed("empty decryption".into()))
        })
    }

    /// Current encrypted balance of `owner` on `contract`.
    pub async fn balance_of(
        &self,
        owner: Address,
        contract: Address,
    ) -> Result<EncryptedValue, ClientError> {
        let handle = self.ledger.confidential_balance_of(contract, owner).await?;
        Ok(EncryptedValue::new(handle, contract).owned_by(owner))
    }

    /// Reveal `value`, reusing a previous cleartext for the exact same handle.
    pub async fn reveal_cached<S: TypedDataSigner + ?Sized>(
        &self,
        signer: &S,
        value: EncryptedValue,
    ) -> Result<u64, ClientError> {
        let owner = value.owner_hint.unwrap_or_else(|| signer.address());
        if let Some(hit) = self.cache.get(owner, value.contract, &value.handle) {
            return Ok(hit);
        }
        self.cache.observe(owner, value.contract, value.handle);
        let clear = self
            .reveal_balance(signer, owner, value.handle, value.contract)
            .await?;
        self.cache.insert(owner, value.contract, value.handle, clear);
        Ok(clear)
    }

    /// Fetch and reveal the signer's own balance of `contract`.
    pub async fn reveal_token_balance<S: TypedDataSigner + ?Sized>(
        &self,
        signer: &S,
        contract: Address,
    ) -> Result<u64, ClientError> {
        let handle = self
            .ledger
            .confidential_balance_of(contract, signer.address())
            .await
            .map_err(ClientError::reveal_failed)?;
        let value = EncryptedValue::new(handle, contract).owned_by(signer.address());
        self.reveal_cached(signer, value).await
    }

    pub async fn swap_rate(&self) -> Result<u64, ClientError> {
        Ok(self.ledger.swap_rate().await?)
    }

    /// Output `amount` would yield at the current rate.
    pub async fn quote(&self, amount: &str) -> Result<u64, ClientError> {
        let parsed = parse_amount(amount)?;
        let rate = self.swap_rate().await?;
        parsed
            .checked_mul(rate)
            .ok_or_else(|| ClientError::InvalidAmount(amount.to_string()))
    }

    pub async fn mint(
        &self,
        minter: Address,
        contract: Address,
        to: Address,
        amount: &str,
    ) -> Result<TxReceipt, ClientError> {
        let amount = parse_amount(amount)?;
        let receipt = self.ledger.mint(minter, contract, to, amount).await?;
        tracing::info!(?contract, ?to, amount, "minted");
        Ok(receipt)
    }

    /// Mint output tokens straight to the pool.
    pub async fn seed_pool(&self, minter: Address, amount: &str) -> Result<TxReceipt, ClientError> {
        self.mint(minter, self.config.output_token, self.config.swap_pool, amount)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        LedgerError, ManualClock,
        oracle::{EncryptRequest, EncryptResponse, UserDecryptRequest, UserDecryptResponse},
        wallet::LocalWallet,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        oracle_calls: AtomicUsize,
        ledger_calls: AtomicUsize,
        ledger_down: bool,
    }

    impl EncryptionOracle for Counting {
        async fn encrypt(&self, _: EncryptRequest) -> Result<EncryptResponse, OracleError> {
            self.oracle_calls.fetch_add(1, Ordering::SeqCst);
            Err(OracleError::Unavailable)
        }

        async fn user_decrypt(
            &self,
            _: UserDecryptRequest,
        ) -> Result<UserDecryptResponse, OracleError> {
            self.oracle_calls.fetch_add(1, Ordering::SeqCst);
            Err(OracleError::Unavailable)
        }
    }

    impl Ledger for Counting {
        async fn confidential_balance_of(&self, _: Address, _: Address) -> Result<Handle, LedgerError> {
            self.ledger_calls.fetch_add(1, Ordering::SeqCst);
            if self.ledger_down {
                return Err(LedgerError::Unavailable("down".into()));
            }
            Ok(ZERO_HANDLE)
        }

        async fn transfer_and_call(
            &self,
            _: Address,
            _: Address,
            _: Address,
            _: Handle,
            _: Vec<u8>,
            _: Vec<u8>,
        ) -> Result<TxReceipt, LedgerError> {
            self.ledger_calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Unavailable("offline".into()))
        }

        async fn mint(&self, _: Address, _: Address, _: Address, _: u64) -> Result<TxReceipt, LedgerError> {
            self.ledger_calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Unavailable("offline".into()))
        }

        async fn swap_rate(&self) -> Result<u64, LedgerError> {
            Ok(1000)
        }
    }

    fn config() -> ClientConfig {
        ClientConfig {
            chain_id: 31337,
            domain_name: "Decryption".into(),
            domain_version: "1".into(),
            verifying_contract: Address::repeat_byte(0xd0),
            input_token: Address::repeat_byte(0xe1),
            output_token: Address::repeat_byte(0xe2),
            swap_pool: Address::repeat_byte(0xf0),
            grant_validity_secs: 60,
        }
    }

    fn client() -> SwapClient<std::sync::Arc<Counting>, std::sync::Arc<Counting>, ManualClock> {
        let backend = std::sync::Arc::new(Counting::default());
        SwapClient::new(backend.clone(), backend, ManualClock::new(0), config()).unwrap()
    }

    #[test]
    fn parse_amount_accepts_only_positive_integers() {
        assert_eq!(parse_amount("3"), Ok(3));
        assert_eq!(parse_amount(" 42 "), Ok(42));
        for bad in ["", "0", "-1", "1.5", "1e3", "abc", "+3", "18446744073709551616"] {
            assert_eq!(parse_amount(bad), Err(ClientError::InvalidAmount(bad.into())));
        }
    }

    #[test_log::test(tokio::test)]
    async fn invalid_amount_never_reaches_oracle_or_ledger() {
        let client = client();
        for bad in ["0", "2.5", "-7"] {
            assert!(matches!(
                client.swap(Address::repeat_byte(1), bad).await,
                Err(ClientError::InvalidAmount(_))
            ));
        }
        assert_eq!(client.oracle().oracle_calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.ledger().ledger_calls.load(Ordering::SeqCst), 0);
    }

    #[test_log::test(tokio::test)]
    async fn oracle_outage_surfaces_as_swap_failure() {
        let client = client();
        assert_eq!(
            client.swap(Address::repeat_byte(1), "3").await,
            Err(ClientError::SwapFailed {
                reason: crate::SwapFailure::Oracle(OracleError::Unavailable)
            })
        );
        assert_eq!(client.ledger().ledger_calls.load(Ordering::SeqCst), 0);
    }

    #[test_log::test(tokio::test)]
    async fn zero_balance_reveals_without_round_trip() {
        let client = client();
        let wallet = LocalWallet::dev("alice").unwrap();
        assert_eq!(
            client.reveal_token_balance(&wallet, Address::repeat_byte(0xe2)).await,
            Ok(0)
        );
        assert_eq!(client.oracle().oracle_calls.load(Ordering::SeqCst), 0);
    }

    #[test_log::test(tokio::test)]
    async fn balance_fetch_failure_surfaces_as_reveal_failure() {
        let backend = std::sync::Arc::new(Counting {
            ledger_down: true,
            ..Default::default()
        });
        let client =
            SwapClient::new(backend.clone(), backend, ManualClock::new(0), config()).unwrap();
        let wallet = LocalWallet::dev("alice").unwrap();
        assert_eq!(
            client.reveal_token_balance(&wallet, Address::repeat_byte(0xe2)).await,
            Err(ClientError::RevealFailed {
                reason: crate::RevealFailure::Ledger(LedgerError::Unavailable("down".into()))
            })
        );
        assert_eq!(client.oracle().oracle_calls.load(Ordering::SeqCst), 0);
    }

    #[test_log::test(tokio::test)]
    async fn quote_applies_rate() {
        let client = client();
        assert_eq!(client.quote("3").await, Ok(3000));
        assert!(matches!(
            client.quote("18446744073709551615").await,
            Err(ClientError::InvalidAmount(_))
        ));
    }
}
