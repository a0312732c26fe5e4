use crate as pallet_confidential_swap;
use confidential_swap_primitives::{seal_inputs, Address, CallbackData, Handle};
use frame_support::{construct_runtime, derive_impl, parameter_types, PalletId};
use frame_system::EnsureSigned;
use sp_runtime::{BuildStorage, DispatchResult};

pub type AccountId = u64;
pub const ALICE: AccountId = 1;
pub const BOB: AccountId = 2;
pub const RATE: u64 = 1000;

pub const SEALING_KEY: [u8; 32] = [0x22; 32];

pub fn weth() -> Address {
    Address::repeat_byte(0xE1)
}

pub fn wzama() -> Address {
    Address::repeat_byte(0xE2)
}

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Runtime {
    type Block = frame_system::mocking::MockBlock<Runtime>;
}

parameter_types! {
    pub const SealingKey: [u8; 32] = SEALING_KEY;
    pub InputToken: Address = weth();
    pub OutputToken: Address = wzama();
    pub const SwapRate: u64 = RATE;
    pub const SwapPalletId: PalletId = PalletId(*b"CnfSwap!");
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

pub fn new_test_ext() -> sp_io::TestExternalities {
    let t = frame_system::GenesisConfig::<Runtime>::default()
        .build_storage()
        .unwrap();
    let mut ext = sp_io::TestExternalities::new(t);
    ext.execute_with(|| {
        System::set_block_number(1);
        for (contract, name, symbol) in [
            (weth(), &b"Wrapped Ether"[..], &b"wETH"[..]),
            (wzama(), &b"Wrapped Zama"[..], &b"wZama"[..]),
        ] {
            Tokens::create_token(
                RuntimeOrigin::root(),
                contract,
                name.to_vec(),
                symbol.to_vec(),
                18,
            )
            .unwrap();
        }
    });
    ext
}

pub fn mint(contract: Address, to: AccountId, amount: u64) {
    Tokens::mint(RuntimeOrigin::signed(to), contract, to, amount).unwrap();
}

pub fn seed_pool(amount: u64) {
    Tokens::mint(RuntimeOrigin::signed(BOB), wzama(), Swap::pool_account(), amount).unwrap();
}

/// Deposit `amount` of `contract` into the pool with transfer-and-call.
pub fn swap_via(contract: Address, who: AccountId, salt: u8, amount: u64) -> DispatchResult {
    let (handles, proof) =
        seal_inputs(&SEALING_KEY, &contract, &who, &[salt; 32], &[amount]).expect("one value");
    Tokens::confidential_transfer_and_call(
        RuntimeOrigin::signed(who),
        contract,
        Swap::pool_account(),
        handles[0],
        proof,
        CallbackData::default(),
    )
}

pub fn swap(who: AccountId, salt: u8, amount: u64) -> DispatchResult {
    swap_via(weth(), who, salt, amount)
}

pub fn reveal(handle: Handle) -> u64 {
    Coprocessor::cleartext_of(&handle).expect("known handle")
}

pub fn balance(contract: Address, who: AccountId) -> u64 {
    reveal(Tokens::balance_of(&contract, &who))
}
