use crate as pallet_confidential_token;
use confidential_swap_primitives::{
    seal_inputs, Address, ConfidentialReceiver, Handle, InputProof,
};
use frame_support::{construct_runtime, derive_impl, parameter_types};
use frame_system::EnsureSigned;
use sp_runtime::{BuildStorage, DispatchError};

pub type AccountId = u64;
pub const ALICE: AccountId = 1;
pub const BOB: AccountId = 2;
/// Receiver whose hook echoes the transferred amount back.
pub const HOOKED: AccountId = 9;
/// Receiver whose hook always fails.
pub const REJECTING: AccountId = 10;

pub const SEALING_KEY: [u8; 32] = [0x11; 32];

pub fn token() -> Address {
    Address::repeat_byte(0xE1)
}

pub struct MockReceiver;

impl ConfidentialReceiver<AccountId> for MockReceiver {
    fn on_confidential_received(
        _token: &Address,
        _from: &AccountId,
        to: &AccountId,
        amount: Handle,
        _data: &[u8],
    ) -> Result<Option<Handle>, DispatchError> {
        match *to {
            HOOKED => Ok(Some(amount)),
            REJECTING => Err(DispatchError::Other("hook rejected")),
            _ => Ok(None),
        }
    }
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

impl pallet_confidential_token::Config for Runtime {
    type RuntimeEvent = RuntimeEvent;
    type Fhe = Coprocessor;
    type Receiver = MockReceiver;
    type MintOrigin = EnsureSigned<AccountId>;
    type WeightInfo = ();
}

construct_runtime!(
    pub enum Runtime {
        System: frame_system,
        Coprocessor: pallet_fhe_coprocessor,
        Tokens: pallet_confidential_token,
    }
);

pub fn new_test_ext() -> sp_io::TestExternalities {
    let t = frame_system::GenesisConfig::<Runtime>::default()
        .build_storage()
        .unwrap();
    let mut ext = sp_io::TestExternalities::new(t);
    ext.execute_with(|| {
        System::set_block_number(1);
        Tokens::create_token(
            RuntimeOrigin::root(),
            token(),
            b"Wrapped Ether".to_vec(),
            b"wETH".to_vec(),
            18,
        )
        .unwrap();
    });
    ext
}

/// Encrypt a single amount of `token()` for `owner`.
pub fn encrypt(owner: AccountId, salt: u8, amount: u64) -> (Handle, InputProof) {
    let (handles, proof) =
        seal_inputs(&SEALING_KEY, &token(), &owner, &[salt; 32], &[amount]).expect("one value");
    (handles[0], proof)
}

/// Cleartext behind `handle`, straight from the mock coprocessor.
pub fn reveal(handle: Handle) -> u64 {
    Coprocessor::cleartext_of(&handle).expect("known handle")
}

pub fn balance(who: AccountId) -> u64 {
    reveal(Tokens::balance_of(&token(), &who))
}
