// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use std::collections::BTreeMap;

use wvm_shared::output::StorageUpdate;
use wvm_shared::{Address, VMError};

use crate::blockchain::BlockchainHook;

use super::StateStackable;

/// Verdict of one storage write, also the integer the hostcall returns to the
/// contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum StorageStatus {
    Unchanged = 0,
    Modified = 1,
    Added = 2,
    Deleted = 3,
}

/// The per-contract key-value view. Writes stay in a pending set until the
/// frame commits; reads consult the pending set before falling back to the
/// node. Committed state only ever changes on the node's side, after the
/// whole execution succeeds.
pub struct StorageContext {
    address: Address,
    dirty: BTreeMap<(Address, Vec<u8>), Vec<u8>>,
    state_stack: Vec<StorageSnapshot>,
}

struct StorageSnapshot {
    address: Address,
    dirty: BTreeMap<(Address, Vec<u8>), Vec<u8>>,
}

impl StorageContext {
    pub fn new() -> Self {
        Self {
            address: Address::default(),
            dirty: BTreeMap::new(),
            state_stack: Vec::new(),
        }
    }

    pub fn set_address(&mut self, address: Address) {
        self.address = address;
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Reads one key of the current contract.
    pub fn load(&self, hook: &dyn BlockchainHook, key: &[u8]) -> Result<Vec<u8>, VMError> {
        if let Some(value) = self.dirty.get(&(self.address.clone(), key.to_vec())) {
            return Ok(value.clone());
        }
        hook.get_storage_data(&self.address, key)
    }

    /// Writes one key of the current contract, classifying the change. The
    /// returned previous length drives the caller's gas charge or refund.
    pub fn store(
        &mut self,
        hook: &dyn BlockchainHook,
        key: &[u8],
        value: &[u8],
    ) -> Result<(StorageStatus, usize), VMError> {
        let old = self.load(hook, key)?;
        let old_len = old.len();
        if old == value {
            return Ok((StorageStatus::Unchanged, old_len));
        }

        let status = if old.is_empty() {
            StorageStatus::Added
        } else if value.is_empty() {
            StorageStatus::Deleted
        } else {
            StorageStatus::Modified
        };
        self.dirty
            .insert((self.address.clone(), key.to_vec()), value.to_vec());
        Ok((status, old_len))
    }

    /// The pending write-set grouped per account, for output assembly.
    pub fn updates_for_output(&self) -> BTreeMap<Address, Vec<StorageUpdate>> {
        let mut grouped: BTreeMap<Address, Vec<StorageUpdate>> = BTreeMap::new();
        for ((address, key), value) in &self.dirty {
            grouped.entry(address.clone()).or_default().push(StorageUpdate {
                offset: key.clone(),
                data: value.clone(),
            });
        }
        grouped
    }
}

impl Default for StorageContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStackable for StorageContext {
    fn init_state(&mut self) {
        self.address = Address::default();
        self.dirty.clear();
    }

    fn push_state(&mut self) {
        self.state_stack.push(StorageSnapshot {
            address: self.address.clone(),
            dirty: self.dirty.clone(),
        });
    }

    fn pop_set_active_state(&mut self) {
        if let Some(snapshot) = self.state_stack.pop() {
            self.address = snapshot.address;
            self.dirty = snapshot.dirty;
        }
    }

    fn pop_discard(&mut self) {
        self.state_stack.pop();
    }

    fn clear_state_stack(&mut self) {
        self.state_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::blockchain::MockBlockchain;

    use super::*;

    fn storage_at(address: &[u8]) -> StorageContext {
        let mut storage = StorageContext::new();
        storage.set_address(address.to_vec());
        storage
    }

    #[test]
    fn store_classifies_the_transition() {
        let address = vec![9; 32];
        let hook = MockBlockchain::new();
        let mut storage = storage_at(&address);

        let (status, _) = storage.store(&hook, b"key", b"value").unwrap();
        assert_eq!(status, StorageStatus::Added);
        let (status, old_len) = storage.store(&hook, b"key", b"value2").unwrap();
        assert_eq!((status, old_len), (StorageStatus::Modified, 5));
        let (status, _) = storage.store(&hook, b"key", b"value2").unwrap();
        assert_eq!(status, StorageStatus::Unchanged);
        let (status, old_len) = storage.store(&hook, b"key", b"").unwrap();
        assert_eq!((status, old_len), (StorageStatus::Deleted, 6));
    }

    #[test]
    fn loads_see_pending_writes_before_the_node() {
        let address = vec![9; 32];
        let mut hook = MockBlockchain::new();
        hook.set_storage(address.clone(), b"key".to_vec(), b"committed".to_vec());
        let mut storage = storage_at(&address);

        assert_eq!(storage.load(&hook, b"key").unwrap(), b"committed");
        storage.store(&hook, b"key", b"pending").unwrap();
        assert_eq!(storage.load(&hook, b"key").unwrap(), b"pending");
    }

    #[test]
    fn rollback_discards_pending_writes() {
        let address = vec![9; 32];
        let hook = MockBlockchain::new();
        let mut storage = storage_at(&address);

        storage.store(&hook, b"key", b"parent").unwrap();
        storage.push_state();
        storage.store(&hook, b"key", b"child").unwrap();
        storage.pop_set_active_state();

        assert_eq!(storage.load(&hook, b"key").unwrap(), b"parent");
    }

    #[test]
    fn updates_group_by_account() {
        let address = vec![9; 32];
        let hook = MockBlockchain::new();
        let mut storage = storage_at(&address);
        storage.store(&hook, b"a", b"1").unwrap();
        storage.store(&hook, b"b", b"2").unwrap();

        let grouped = storage.updates_for_output();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[&address].len(), 2);
    }
}
