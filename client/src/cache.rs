use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use confidential_swap_primitives::{Address, Handle};

#[derive(Debug)]
struct Slot {
    latest: Handle,
    value: Option<u64>,
}

/// Revealed cleartexts keyed by `(owner, contract, handle)`.
///
/// A balance handle changes on every write, so a hit is only ever served
/// for the exact handle that was decrypted. Each `(owner, contract)` tracks
/// the handle it last observed; a value is recorded only while its handle is
/// still that one, so a slow reveal of an older handle never displaces a
/// newer value.
#[derive(Debug, Default)]
pub struct RevealCache {
    slots: Mutex<HashMap<(Address, Address), Slot>>,
}

impl RevealCache {
    pub fn get(&self, owner: Address, contract: Address, handle: &Handle) -> Option<u64> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(owner, contract))
            .filter(|slot| slot.latest == *handle)
            .and_then(|slot| slot.value)
    }

    /// Mark `handle` as the current one, dropping any value for another handle.
    pub fn observe(&self, owner: Address, contract: Address, handle: Handle) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry((owner, contract)).or_insert(Slot {
            latest: handle,
            value: None,
        });
        if slot.latest != handle {
            *slot = Slot {
                latest: handle,
                value: None,
            };
        }
    }

    /// Record `value` for `handle`. Ignored once another handle was observed.
    pub fn insert(&self, owner: Address, contract: Address, handle: Handle, value: u64) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry((owner, contract)).or_insert(Slot {
            latest: handle,
            value: None,
        });
        if slot.latest == handle {
            slot.value = Some(value);
        } else {
            tracing::trace!(?owner, ?contract, "stale reveal not cached");
        }
    }

    pub fn invalidate(&self, owner: Address, contract: Address) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(owner, contract));
    }

    /// Number of cached cleartexts.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.value.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
