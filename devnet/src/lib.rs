//! Dev network for confidential swaps: the runtime in-process, a mock
//! encryption oracle / decryption gateway, and a ready-wired [`SwapClient`].

pub mod chain;
pub mod oracle;
pub mod runtime;

use std::sync::Arc;

use confidential_swap_client::{
    ClientConfig, Clock, ConfigError, DEFAULT_GRANT_VALIDITY_SECS, LedgerError, SwapClient,
};

pub use chain::DevChain;
pub use oracle::MockOracle;
pub use runtime::{CHAIN_ID, DECRYPTION_CONTRACT, SWAP_RATE, WETH, WZAMA};

pub type DevSwapClient<C> = SwapClient<Arc<MockOracle<C>>, Arc<DevChain>, C>;

#[derive(Debug, thiserror::Error)]
pub enum DevnetError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Client configuration matching the dev runtime.
pub fn client_config() -> ClientConfig {
    ClientConfig {
        chain_id: CHAIN_ID,
        domain_name: "Decryption".into(),
        domain_version: "1".into(),
        verifying_contract: DECRYPTION_CONTRACT,
        input_token: WETH,
        output_token: WZAMA,
        swap_pool: runtime::Swap::pool_account(),
        grant_validity_secs: DEFAULT_GRANT_VALIDITY_SECS,
    }
}

/// A running dev network.
pub struct DevNet<C> {
    pub chain: Arc<DevChain>,
    pub oracle: Arc<MockOracle<C>>,
    pub client: DevSwapClient<C>,
}

impl<C: Clock + Clone> DevNet<C> {
    pub fn start(clock: C) -> Result<Self, DevnetError> {
        Self::with_config(client_config(), clock)
    }

    /// Start with `config`. Token and pool addresses are those of the runtime;
    /// the signing domain and grant window come from `config`.
    pub fn with_config(config: ClientConfig, clock: C) -> Result<Self, DevnetError> {
        let config = ClientConfig {
            input_token: WETH,
            output_token: WZAMA,
            swap_pool: runtime::Swap::pool_account(),
            ..config
        };
        let chain = Arc::new(DevChain::start()?);
        let oracle = Arc::new(MockOracle::new(chain.clone(), config.domain(), clock.clone()));
        let client = SwapClient::new(oracle.clone(), chain.clone(), clock, config)?;
        Ok(Self {
            chain,
            oracle,
            client,
        })
    }
}
