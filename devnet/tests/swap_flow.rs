//! End-to-end swaps on the dev network.

use std::sync::Arc;

use confidential_swap_client::{
    Address, ClientError, LocalWallet, ManualClock, OracleError, SwapFailure, TypedDataSigner,
};
use confidential_swap_devnet::{DevNet, WETH, WZAMA};

const T0: u64 = 1_700_000_000;

fn devnet() -> DevNet<Arc<ManualClock>> {
    DevNet::start(Arc::new(ManualClock::new(T0))).unwrap()
}

fn faucet() -> Address {
    LocalWallet::dev("faucet").unwrap().address()
}

async fn cleartext_balance(net: &DevNet<Arc<ManualClock>>, token: Address, who: Address) -> u64 {
    let handle = net.client.balance_of(who, token).await.unwrap().handle;
    net.chain.cleartext_of(handle).await.unwrap().unwrap_or(0)
}

#[test_log::test(tokio::test)]
async fn three_weth_buys_three_thousand_wzama() {
    let net = devnet();
    let alice = LocalWallet::dev("alice").unwrap();

    net.client.mint(faucet(), WETH, alice.address(), "3").await.unwrap();
    net.client.seed_pool(faucet(), "3000").await.unwrap();

    let receipt = net.client.swap(alice.address(), "3").await.unwrap();
    assert!(receipt.hook_output.is_some());

    assert_eq!(net.client.reveal_token_balance(&alice, WZAMA).await, Ok(3000));
    assert_eq!(net.client.reveal_token_balance(&alice, WETH).await, Ok(0));

    let pool = net.chain.pool_account();
    assert_eq!(cleartext_balance(&net, WETH, pool).await, 3);
    assert_eq!(cleartext_balance(&net, WZAMA, pool).await, 0);
}

#[test_log::test(tokio::test)]
async fn output_is_exactly_rate_times_input() {
    let net = devnet();
    net.client.seed_pool(faucet(), "1000000").await.unwrap();

    for (i, amount) in [1u64, 2, 7, 50, 333].into_iter().enumerate() {
        let user = LocalWallet::dev(&format!("user-{i}")).unwrap();
        net.client
            .mint(faucet(), WETH, user.address(), &amount.to_string())
            .await
            .unwrap();
        net.client.swap(user.address(), &amount.to_string()).await.unwrap();

        assert_eq!(
            net.client.reveal_token_balance(&user, WZAMA).await,
            Ok(amount * 1000)
        );
        assert_eq!(net.client.reveal_token_balance(&user, WETH).await, Ok(0));
    }
}

#[test_log::test(tokio::test)]
async fn short_reserve_reverts_and_leaves_balances_alone() {
    let net = devnet();
    let alice = LocalWallet::dev("alice").unwrap();
    net.client.mint(faucet(), WETH, alice.address(), "3").await.unwrap();
    net.client.seed_pool(faucet(), "2999").await.unwrap();
    let before = net.chain.pool_state().await.unwrap();

    assert_eq!(
        net.client.swap(alice.address(), "3").await,
        Err(ClientError::SwapFailed {
            reason: SwapFailure::InsufficientPoolReserve
        })
    );

    assert_eq!(net.chain.pool_state().await.unwrap(), before);
    assert_eq!(net.client.reveal_token_balance(&alice, WETH).await, Ok(3));
    assert_eq!(net.client.reveal_token_balance(&alice, WZAMA).await, Ok(0));
    assert_eq!(cleartext_balance(&net, WZAMA, net.chain.pool_account()).await, 2999);
}

#[test_log::test(tokio::test)]
async fn malformed_amounts_are_rejected_before_any_round_trip() {
    let net = devnet();
    let alice = LocalWallet::dev("alice").unwrap();
    let block = net.chain.block_number().await.unwrap();

    for bad in ["", "0", "-3", "1.5", "three", "99999999999999999999"] {
        assert_eq!(
            net.client.swap(alice.address(), bad).await,
            Err(ClientError::InvalidAmount(bad.to_string()))
        );
    }
    assert_eq!(net.oracle.round_trips(), 0);
    assert_eq!(net.chain.block_number().await.unwrap(), block);
}

#[test_log::test(tokio::test)]
async fn swap_without_balance_pays_nothing() {
    let net = devnet();
    let alice = LocalWallet::dev("alice").unwrap();
    net.client.mint(faucet(), WETH, alice.address(), "1").await.unwrap();
    net.client.seed_pool(faucet(), "5000").await.unwrap();

    // the transfer clamps to zero instead of reverting
    net.client.swap(alice.address(), "3").await.unwrap();

    assert_eq!(net.client.reveal_token_balance(&alice, WETH).await, Ok(1));
    assert_eq!(net.client.reveal_token_balance(&alice, WZAMA).await, Ok(0));
    assert_eq!(cleartext_balance(&net, WZAMA, net.chain.pool_account()).await, 5000);
}

#[test_log::test(tokio::test)]
async fn offline_oracle_fails_the_swap_without_a_transaction() {
    let net = devnet();
    let alice = LocalWallet::dev("alice").unwrap();
    net.client.mint(faucet(), WETH, alice.address(), "3").await.unwrap();
    let block = net.chain.block_number().await.unwrap();

    net.oracle.set_online(false);
    assert_eq!(
        net.client.swap(alice.address(), "3").await,
        Err(ClientError::SwapFailed {
            reason: SwapFailure::Oracle(OracleError::Unavailable)
        })
    );
    assert_eq!(net.chain.block_number().await.unwrap(), block);

    net.oracle.set_online(true);
    net.client.seed_pool(faucet(), "3000").await.unwrap();
    net.client.swap(alice.address(), "3").await.unwrap();
    assert_eq!(net.client.reveal_token_balance(&alice, WZAMA).await, Ok(3000));
}

#[test_log::test(tokio::test)]
async fn replayed_input_is_rejected() {
    use confidential_swap_client::{EncryptionOracle, Ledger};

    let net = devnet();
    let alice = LocalWallet::dev("alice").unwrap();
    net.client.mint(faucet(), WETH, alice.address(), "2").await.unwrap();
    net.client.seed_pool(faucet(), "5000").await.unwrap();

    let input = net.oracle.encrypt_u64(WETH, alice.address(), 1).await.unwrap();
    let pool = net.chain.pool_account();
    let handle = input.handles[0].handle;
    net.chain
        .transfer_and_call(alice.address(), WETH, pool, handle, input.proof.clone(), Vec::new())
        .await
        .unwrap();
    let replay = net
        .chain
        .transfer_and_call(alice.address(), WETH, pool, handle, input.proof, Vec::new())
        .await
        .unwrap_err();
    assert_eq!(SwapFailure::from(replay), SwapFailure::ProofRejected);
    assert_eq!(net.client.reveal_token_balance(&alice, WZAMA).await, Ok(1000));
}

#[test_log::test(tokio::test)]
async fn concurrent_swaps_settle_only_while_the_reserve_lasts() {
    let net = Arc::new(devnet());
    net.client.seed_pool(faucet(), "2000").await.unwrap();

    let users: Vec<LocalWallet> = (0..4)
        .map(|i| LocalWallet::dev(&format!("racer-{i}")).unwrap())
        .collect();
    for user in &users {
        net.client.mint(faucet(), WETH, user.address(), "1").await.unwrap();
    }

    let tasks: Vec<_> = users
        .iter()
        .map(|user| {
            let net = net.clone();
            let owner = user.address();
            tokio::spawn(async move { net.client.swap(owner, "1").await })
        })
        .collect();

    let mut settled = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => settled += 1,
            Err(e) => assert_eq!(
                e,
                ClientError::SwapFailed {
                    reason: SwapFailure::InsufficientPoolReserve
                }
            ),
        }
    }
    assert_eq!(settled, 2);

    let mut paid = 0;
    for user in &users {
        let out = net.client.reveal_token_balance(user, WZAMA).await.unwrap();
        let left = net.client.reveal_token_balance(user, WETH).await.unwrap();
        // each user either swapped fully or kept the deposit
        assert!((out, left) == (1000, 0) || (out, left) == (0, 1));
        paid += out;
    }
    assert_eq!(paid, 2000);
    assert_eq!(cleartext_balance(&net, WZAMA, net.chain.pool_account()).await, 0);
}

#[test_log::test(tokio::test)]
async fn quote_uses_the_pool_rate() {
    let net = devnet();
    assert_eq!(net.client.swap_rate().await, Ok(1000));
    assert_eq!(net.client.quote("3").await, Ok(3000));
}

#[test_log::test(tokio::test)]
async fn settled_inputs_leave_the_gateway_registry() {
    use confidential_swap_client::EncryptionOracle;

    let net = devnet();
    let alice = LocalWallet::dev("alice").unwrap();
    net.client.mint(faucet(), WETH, alice.address(), "5").await.unwrap();
    net.client.seed_pool(faucet(), "5000").await.unwrap();

    net.client.swap(alice.address(), "2").await.unwrap();
    net.client.swap(alice.address(), "1").await.unwrap();
    let unsent = net.oracle.encrypt_u64(WETH, alice.address(), 4).await.unwrap();
    assert_eq!(net.oracle.pending_inputs(), 3);

    assert_eq!(net.client.reveal_token_balance(&alice, WZAMA).await, Ok(3000));
    // only the input that never reached the chain is still tracked
    assert_eq!(net.oracle.pending_inputs(), 1);
    assert!(!unsent.handles[0].is_zero());
}
