// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_traits::Signed;
use wvm_shared::output::{LogEntry, OutputAccount, OutputTransfer, StorageUpdate, VMOutput};
use wvm_shared::{Address, ReturnCode, VMError};

use super::StateStackable;

/// Everything the frame has produced so far: return data, logs, balance
/// movements, and the verdict. A failed frame surfaces only the verdict; the
/// accumulated effects are dropped when the output is assembled.
pub struct OutputContext {
    return_data: Vec<Vec<u8>>,
    return_code: ReturnCode,
    return_message: String,
    vm_error: Option<VMError>,
    logs: Vec<LogEntry>,
    output_accounts: BTreeMap<Address, OutputAccount>,
    deleted_accounts: Vec<Address>,
    state_stack: Vec<OutputSnapshot>,
}

struct OutputSnapshot {
    return_data: Vec<Vec<u8>>,
    return_code: ReturnCode,
    return_message: String,
    vm_error: Option<VMError>,
    logs: Vec<LogEntry>,
    output_accounts: BTreeMap<Address, OutputAccount>,
    deleted_accounts: Vec<Address>,
}

impl OutputContext {
    pub fn new() -> Self {
        Self {
            return_data: Vec::new(),
            return_code: ReturnCode::Ok,
            return_message: String::new(),
            vm_error: None,
            logs: Vec::new(),
            output_accounts: BTreeMap::new(),
            deleted_accounts: Vec::new(),
            state_stack: Vec::new(),
        }
    }

    /// Appends one return-data item.
    pub fn finish(&mut self, data: Vec<u8>) {
        self.return_data.push(data);
    }

    pub fn return_data(&self) -> &[Vec<u8>] {
        &self.return_data
    }

    pub fn return_code(&self) -> ReturnCode {
        self.return_code
    }

    pub fn set_return_code(&mut self, code: ReturnCode) {
        self.return_code = code;
    }

    pub fn return_message(&self) -> &str {
        &self.return_message
    }

    pub fn set_return_message(&mut self, message: String) {
        self.return_message = message;
    }

    pub fn vm_error(&self) -> Option<&VMError> {
        self.vm_error.as_ref()
    }

    /// Records the typed error a failing frame surfaces to its caller.
    pub fn record_error(&mut self, err: VMError) {
        self.return_message = err.to_string();
        self.vm_error = Some(err);
    }

    /// Records the typed error without touching an already-set message
    /// (user signals carry their own text).
    pub fn set_vm_error(&mut self, err: VMError) {
        self.vm_error = Some(err);
    }

    pub fn write_log(&mut self, address: Address, topics: Vec<Vec<u8>>, data: Vec<u8>) {
        self.logs.push(LogEntry {
            address,
            topics,
            data,
        });
    }

    pub fn account_mut(&mut self, address: &[u8]) -> &mut OutputAccount {
        self.output_accounts
            .entry(address.to_vec())
            .or_insert_with(|| OutputAccount::new(address.to_vec()))
    }

    /// Moves `value` between two accounts' balance deltas.
    pub fn transfer_value(
        &mut self,
        sender: &[u8],
        destination: &[u8],
        value: &BigInt,
    ) -> Result<(), VMError> {
        if value.is_negative() {
            return Err(VMError::InvalidArgument);
        }
        self.account_mut(sender).balance_delta -= value;
        self.account_mut(destination).balance_delta += value;
        Ok(())
    }

    /// A transfer that carries call data, as produced by async calls.
    pub fn transfer_with_data(
        &mut self,
        sender: &[u8],
        destination: &[u8],
        value: &BigInt,
        data: Vec<u8>,
        gas_limit: u64,
    ) -> Result<(), VMError> {
        self.transfer_value(sender, destination, value)?;
        self.account_mut(destination)
            .output_transfers
            .push(OutputTransfer {
                value: value.clone(),
                data,
                gas_limit,
                sender_address: sender.to_vec(),
            });
        Ok(())
    }

    pub fn set_code(&mut self, address: &[u8], code: Vec<u8>) {
        self.account_mut(address).code = Some(code);
    }

    /// Assembles the final output of the frame. `storage_updates` comes from
    /// the storage context's pending write-set.
    pub fn build_vm_output(
        &self,
        gas_remaining: u64,
        gas_refund: u64,
        storage_updates: BTreeMap<Address, Vec<StorageUpdate>>,
    ) -> VMOutput {
        if self.return_code != ReturnCode::Ok {
            return VMOutput {
                return_code: self.return_code,
                return_message: self.return_message.clone(),
                vm_error: self.vm_error.clone(),
                ..Default::default()
            };
        }

        let mut accounts = self.output_accounts.clone();
        for (address, updates) in storage_updates {
            accounts
                .entry(address.clone())
                .or_insert_with(|| OutputAccount::new(address))
                .storage_updates = updates;
        }

        VMOutput {
            return_data: self.return_data.clone(),
            return_code: self.return_code,
            return_message: self.return_message.clone(),
            vm_error: self.vm_error.clone(),
            gas_remaining,
            gas_refund,
            output_accounts: accounts.into_values().collect(),
            deleted_accounts: self.deleted_accounts.clone(),
            logs: self.logs.clone(),
        }
    }
}

impl Default for OutputContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStackable for OutputContext {
    fn init_state(&mut self) {
        self.return_data.clear();
        self.return_code = ReturnCode::Ok;
        self.return_message.clear();
        self.vm_error = None;
        self.logs.clear();
        self.output_accounts.clear();
        self.deleted_accounts.clear();
    }

    fn push_state(&mut self) {
        self.state_stack.push(OutputSnapshot {
            return_data: self.return_data.clone(),
            return_code: self.return_code,
            return_message: self.return_message.clone(),
            vm_error: self.vm_error.clone(),
            logs: self.logs.clone(),
            output_accounts: self.output_accounts.clone(),
            deleted_accounts: self.deleted_accounts.clone(),
        });
    }

    fn pop_set_active_state(&mut self) {
        if let Some(snapshot) = self.state_stack.pop() {
            self.return_data = snapshot.return_data;
            self.return_code = snapshot.return_code;
            self.return_message = snapshot.return_message;
            self.vm_error = snapshot.vm_error;
            self.logs = snapshot.logs;
            self.output_accounts = snapshot.output_accounts;
            self.deleted_accounts = snapshot.deleted_accounts;
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

    use super::*;

    #[test]
    fn rollback_discards_accumulated_output() {
        let mut output = OutputContext::new();
        output.finish(b"parent".to_vec());

        output.push_state();
        output.finish(b"child".to_vec());
        output.write_log(vec![1; 32], vec![], b"log".to_vec());
        output.pop_set_active_state();

        assert_eq!(output.return_data(), &[b"parent".to_vec()]);
        let out = output.build_vm_output(0, 0, BTreeMap::new());
        assert!(out.logs.is_empty());
    }

    #[test]
    fn commit_keeps_child_output_visible_to_the_parent() {
        let mut output = OutputContext::new();
        output.finish(b"parent".to_vec());

        output.push_state();
        output.finish(b"child".to_vec());
        output.pop_discard();

        assert_eq!(
            output.return_data(),
            &[b"parent".to_vec(), b"child".to_vec()]
        );
    }

    #[test]
    fn failed_frames_surface_only_the_verdict() {
        let mut output = OutputContext::new();
        output.finish(b"data".to_vec());
        output.transfer_value(&[1; 32], &[2; 32], &BigInt::from(5)).unwrap();
        output.set_return_code(ReturnCode::UserError);
        output.record_error(VMError::SignalError);

        let out = output.build_vm_output(7, 0, BTreeMap::new());
        assert_eq!(out.return_code, ReturnCode::UserError);
        assert_eq!(out.vm_error, Some(VMError::SignalError));
        assert!(out.return_data.is_empty());
        assert!(out.output_accounts.is_empty());
        assert_eq!(out.gas_remaining, 0);
    }

    #[test]
    fn transfers_balance_the_deltas() {
        let mut output = OutputContext::new();
        let sender = vec![1; 32];
        let dest = vec![2; 32];
        output.transfer_value(&sender, &dest, &BigInt::from(100)).unwrap();

        let out = output.build_vm_output(0, 0, BTreeMap::new());
        let total: BigInt = out
            .output_accounts
            .iter()
            .map(|a| a.balance_delta.clone())
            .sum();
        assert_eq!(total, BigInt::from(0));
    }

    #[test]
    fn negative_transfers_are_rejected() {
        let mut output = OutputContext::new();
        assert_eq!(
            output.transfer_value(&[1; 32], &[2; 32], &BigInt::from(-1)),
            Err(VMError::InvalidArgument)
        );
    }
}
