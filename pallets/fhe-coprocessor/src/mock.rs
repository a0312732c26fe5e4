use crate as pallet_fhe_coprocessor;
use confidential_swap_primitives::{seal_inputs, Address, Handle, InputProof};
use frame_support::{construct_runtime, derive_impl, parameter_types};
use sp_runtime::BuildStorage;

pub type AccountId = u64;
pub const ALICE: AccountId = 1;
pub const BOB: AccountId = 2;

pub const SEALING_KEY: [u8; 32] = [0x5e; 32];

pub fn token() -> Address {
    Address::repeat_byte(0xE1)
}

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Runtime {
    type Block = frame_system::mocking::MockBlock<Runtime>;
}

parameter_types! {
    pub const SealingKey: [u8; 32] = SEALING_KEY;
}

impl pallet_fhe_coprocessor::Config for Runtime {
    type RuntimeEvent = RuntimeEvent;
    type SealingKey = SealingKey;
    type WeightInfo = ();
}

construct_runtime!(
    pub enum Runtime {
        System: frame_system,
        Coprocessor: pallet_fhe_coprocessor,
    }
);

pub fn new_test_ext() -> sp_io::TestExternalities {
    let t = frame_system::GenesisConfig::<Runtime>::default()
        .build_storage()
        .unwrap();
    let mut ext = sp_io::TestExternalities::new(t);
    ext.execute_with(|| System::set_block_number(1));
    ext
}

/// Encrypt `values` for (`contract`, `owner`) with a nonce derived from `salt`.
pub fn encrypt_for(
    contract: Address,
    owner: AccountId,
    salt: u8,
    values: &[u64],
) -> (Vec<Handle>, InputProof) {
    seal_inputs(&SEALING_KEY, &contract, &owner, &[salt; 32], values).expect("small batch")
}
