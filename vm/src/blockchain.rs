// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The node-side collaborator. Persistence lives with the node; the host
//! reaches it exclusively through this hook.

use std::collections::HashMap;

use num_bigint::BigInt;
use wvm_shared::crypto::hash;
use wvm_shared::{Address, VMError};

/// Blockchain state queries the host may issue while executing a contract.
/// In-process embedders implement this directly; the out-of-process mode
/// round-trips each call through the IPC transport.
pub trait BlockchainHook {
    fn account_exists(&self, address: &[u8]) -> Result<bool, VMError>;

    /// Computes the address of a contract deployed by `creator` at `nonce`.
    fn new_address(&self, creator: &[u8], nonce: u64, vm_type: &[u8]) -> Result<Address, VMError>;

    fn get_balance(&self, address: &[u8]) -> Result<BigInt, VMError>;

    fn get_nonce(&self, address: &[u8]) -> Result<u64, VMError>;

    fn get_storage_data(&self, address: &[u8], key: &[u8]) -> Result<Vec<u8>, VMError>;

    fn is_code_empty(&self, address: &[u8]) -> Result<bool, VMError>;

    fn get_code(&self, address: &[u8]) -> Result<Vec<u8>, VMError>;

    fn get_blockhash(&self, nonce: u64) -> Result<Vec<u8>, VMError>;

    fn last_nonce(&self) -> u64 {
        0
    }

    fn last_round(&self) -> u64 {
        0
    }

    fn last_timestamp(&self) -> u64 {
        0
    }

    fn last_epoch(&self) -> u64 {
        0
    }

    fn last_random_seed(&self) -> Vec<u8> {
        Vec::new()
    }

    fn current_nonce(&self) -> u64 {
        0
    }

    fn current_round(&self) -> u64 {
        0
    }

    fn current_timestamp(&self) -> u64 {
        0
    }

    fn current_epoch(&self) -> u64 {
        0
    }

    fn current_random_seed(&self) -> Vec<u8> {
        Vec::new()
    }

    fn state_root_hash(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// One account of the in-memory world model.
#[derive(Clone, Debug, Default)]
pub struct MockAccount {
    pub nonce: u64,
    pub balance: BigInt,
    pub code: Vec<u8>,
    pub storage: HashMap<Vec<u8>, Vec<u8>>,
}

/// An in-memory [`BlockchainHook`] for tests and local tooling.
#[derive(Default)]
pub struct MockBlockchain {
    pub accounts: HashMap<Address, MockAccount>,
    pub block_nonce: u64,
    pub block_timestamp: u64,
}

impl MockBlockchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_account(&mut self, address: Address, account: MockAccount) {
        self.accounts.insert(address, account);
    }

    pub fn set_code(&mut self, address: Address, code: Vec<u8>) {
        self.accounts.entry(address).or_default().code = code;
    }

    pub fn set_storage(&mut self, address: Address, key: Vec<u8>, value: Vec<u8>) {
        self.accounts
            .entry(address)
            .or_default()
            .storage
            .insert(key, value);
    }
}

impl BlockchainHook for MockBlockchain {
    fn account_exists(&self, address: &[u8]) -> Result<bool, VMError> {
        Ok(self.accounts.contains_key(address))
    }

    fn new_address(&self, creator: &[u8], nonce: u64, vm_type: &[u8]) -> Result<Address, VMError> {
        let mut preimage = creator.to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        preimage.extend_from_slice(vm_type);
        Ok(hash::sha256(&preimage).to_vec())
    }

    fn get_balance(&self, address: &[u8]) -> Result<BigInt, VMError> {
        Ok(self
            .accounts
            .get(address)
            .map(|a| a.balance.clone())
            .unwrap_or_default())
    }

    fn get_nonce(&self, address: &[u8]) -> Result<u64, VMError> {
        Ok(self.accounts.get(address).map(|a| a.nonce).unwrap_or(0))
    }

    fn get_storage_data(&self, address: &[u8], key: &[u8]) -> Result<Vec<u8>, VMError> {
        Ok(self
            .accounts
            .get(address)
            .and_then(|a| a.storage.get(key))
            .cloned()
            .unwrap_or_default())
    }

    fn is_code_empty(&self, address: &[u8]) -> Result<bool, VMError> {
        Ok(self
            .accounts
            .get(address)
            .map(|a| a.code.is_empty())
            .unwrap_or(true))
    }

    fn get_code(&self, address: &[u8]) -> Result<Vec<u8>, VMError> {
        Ok(self
            .accounts
            .get(address)
            .map(|a| a.code.clone())
            .unwrap_or_default())
    }

    fn get_blockhash(&self, nonce: u64) -> Result<Vec<u8>, VMError> {
        Ok(hash::sha256(&nonce.to_be_bytes()).to_vec())
    }

    fn current_nonce(&self) -> u64 {
        self.block_nonce
    }

    fn current_timestamp(&self) -> u64 {
        self.block_timestamp
    }
}
