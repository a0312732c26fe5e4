//! swap-devnet: drive the in-process dev network from the command line.
//!
//! ```text
//! swap-devnet addresses
//! swap-devnet quote --amount 3
//! swap-devnet scenario --mint 3 --seed 3000 --swap 3
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use confidential_swap_client::{ClientConfig, LocalWallet, SystemClock, TypedDataSigner};
use confidential_swap_devnet::{DevNet, WETH, WZAMA, client_config};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "swap-devnet", about = "Confidential wETH -> wZama swaps on an in-process dev chain")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print token, pool and dev account addresses.
    Addresses,
    /// Estimated wZama output for an amount of wETH.
    Quote {
        #[arg(long)]
        amount: String,
    },
    /// Mint wETH to alice, seed the pool, swap and reveal both balances.
    Scenario {
        #[arg(long, default_value = "3")]
        mint: String,
        #[arg(long, default_value = "3000")]
        seed: String,
        #[arg(long, default_value = "3")]
        swap: String,
        /// JSON client config overriding the signing domain and grant window.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let alice = LocalWallet::dev("alice")?;
    let faucet = LocalWallet::dev("faucet")?;

    match cli.command {
        Command::Addresses => {
            let cfg = client_config();
            println!("wETH:   {:?}", WETH);
            println!("wZama:  {:?}", WZAMA);
            println!("pool:   {:?}", cfg.swap_pool);
            println!("alice:  {:?}", alice.address());
            println!("faucet: {:?}", faucet.address());
        }
        Command::Quote { amount } => {
            let net = DevNet::start(SystemClock)?;
            let out = net.client.quote(&amount).await?;
            println!("{amount} wETH -> {out} wZama");
        }
        Command::Scenario {
            mint,
            seed,
            swap,
            config,
        } => {
            let config = match config {
                Some(path) => ClientConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => client_config(),
            };
            let net = DevNet::with_config(config, SystemClock)?;
            let client = &net.client;
            let owner = alice.address();

            client.mint(faucet.address(), WETH, owner, &mint).await?;
            client.seed_pool(faucet.address(), &seed).await?;
            let receipt = client.swap(owner, &swap).await?;
            tracing::info!(block = receipt.block, "swap included");

            let weth = client.reveal_token_balance(&alice, WETH).await?;
            let wzama = client.reveal_token_balance(&alice, WZAMA).await?;
            println!("alice wETH:  {weth}");
            println!("alice wZama: {wzama}");
            println!(
                "oracle round trips: {} (encrypt {}, decrypt {})",
                net.oracle.round_trips(),
                net.oracle.encrypt_calls(),
                net.oracle.decrypt_calls()
            );
        }
    }
    Ok(())
}
