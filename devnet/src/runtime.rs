//! The dev chain runtime: coprocessor, two confidential tokens and the swap pool.

use confidential_swap_primitives::Address;
use frame_support::{construct_runtime, derive_impl, parameter_types, PalletId};
use frame_system::EnsureSigned;
use hex_literal::hex;
use sp_core::H160;
use sp_runtime::traits::IdentityLookup;

pub type AccountId = H160;

/// wETH, the token the pool accepts.
pub const WETH: Address = H160(hex!("5fbdb2315678afecb367f032d93f642f64180aa3"));
/// wZama, the token the pool pays out.
pub const WZAMA: Address = H160(hex!("e7f1725e7734ce288f8367e1bb143e90bb3f0512"));
/// Contract user decryption signatures are verified against.
pub const DECRYPTION_CONTRACT: Address = H160(hex!("9fe46736679d2d9a65f0992f2272de9f3c7fa6e0"));

pub const CHAIN_ID: u64 = 31337;
pub const SWAP_RATE: u64 = 1000;

/// Dev-only sealing key for encrypted inputs.
pub const SEALING_KEY: [u8; 32] =
    hex!("6465766e65742d7365616c696e672d6b65792d6e6f742d666f722d70726f6421");

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Runtime {
    type Block = frame_system::mocking::MockBlock<Runtime>;
    type AccountId = AccountId;
    type Lookup = IdentityLookup<AccountId>;
}

parameter_types! {
    pub const SealingKey: [u8; 32] = SEALING_KEY;
    pub const InputToken: Address = WETH;
    pub const OutputToken: Address = WZAMA;
    pub const SwapRate: u64 = SWAP_RATE;
    pub const SwapPalletId: PalletId = PalletId(*b"hushswap");
}

impl pallet_fhe_coprocessor::Config for Runtime {
    type RuntimeEvent = RuntimeEvent;
    type SealingKey = SealingKey;
    type WeightInfo = ();
}

impl pallet_confidential_token::Config for Runtime {
    type RuntimeEvent = RuntimeEvent;
    type Fhe = Coprocessor;
    type Receiver = Swap;
    // open faucet
    type MintOrigin = EnsureSigned<AccountId>;
    type WeightInfo = ();
}

impl pallet_confidential_swap::Config for Runtime {
    type RuntimeEvent = RuntimeEvent;
    type Token = Tokens;
    type Fhe = Coprocessor;
    type InputToken = InputToken;
    type OutputToken = OutputToken;
    type SwapRate = SwapRate;
    type PalletId = SwapPalletId;
}

construct_runtime!(
    pub enum Runtime {
        System: frame_system,
        Coprocessor: pallet_fhe_coprocessor,
        Tokens: pallet_confidential_token,
        Swap: pallet_confidential_swap,
    }
);

/// Tokens registered at genesis: (contract, name, symbol, decimals).
pub fn genesis_tokens() -> [(Address, &'static [u8], &'static [u8], u8); 2] {
    [
        (WETH, b"Wrapped Ether", b"wETH", 18),
        (WZAMA, b"Wrapped Zama", b"wZama", 18),
    ]
}
