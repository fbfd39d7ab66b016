// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The host facade: one live instance of every context, composed behind a
//! shared handle that doubles as the store data of each wasm instance — the
//! opaque pointer through which hostcalls reach their contexts.

use std::cell::RefCell;
use std::rc::Rc;

use rand::RngCore;
use wvm_shared::gas_schedule::GasSchedule;
use wvm_shared::input::{ContractCallInput, ContractCreateInput, HostParameters};
use wvm_shared::output::VMOutput;
use wvm_shared::{Address, Breakpoint, VMError};

use crate::blockchain::BlockchainHook;
use crate::contexts::{
    ManagedTypeContext, MeteringContext, OutputContext, RuntimeContext, StateStackable,
    StorageContext, StorageStatus,
};
use crate::engine::Engine;

pub(crate) mod execution;

/// The shared handle hostcalls and the executor use to reach the host.
pub type HostRef = Rc<RefCell<DefaultHost>>;

/// Owns the per-execution contexts and the collaborators (engine, node hook,
/// key-generation RNG).
pub struct DefaultHost {
    runtime: RuntimeContext,
    metering: MeteringContext,
    managed_types: ManagedTypeContext,
    output: OutputContext,
    storage: StorageContext,
    blockchain: Box<dyn BlockchainHook>,
    engine: Engine,
    rng: Box<dyn RngCore>,
}

impl DefaultHost {
    pub fn new(
        blockchain: Box<dyn BlockchainHook>,
        parameters: HostParameters,
        schedule: GasSchedule,
    ) -> Result<Self, VMError> {
        Ok(Self {
            runtime: RuntimeContext::new(parameters.vm_type),
            metering: MeteringContext::new(schedule, parameters.block_gas_limit),
            managed_types: ManagedTypeContext::new(),
            output: OutputContext::new(),
            storage: StorageContext::new(),
            blockchain,
            engine: Engine::new()?,
            rng: Box::new(rand::rngs::OsRng),
        })
    }

    pub fn runtime(&self) -> &RuntimeContext {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut RuntimeContext {
        &mut self.runtime
    }

    pub fn metering(&self) -> &MeteringContext {
        &self.metering
    }

    pub fn metering_mut(&mut self) -> &mut MeteringContext {
        &mut self.metering
    }

    pub fn managed_types(&self) -> &ManagedTypeContext {
        &self.managed_types
    }

    pub fn managed_types_mut(&mut self) -> &mut ManagedTypeContext {
        &mut self.managed_types
    }

    pub fn output(&self) -> &OutputContext {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputContext {
        &mut self.output
    }

    pub fn storage(&self) -> &StorageContext {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut StorageContext {
        &mut self.storage
    }

    pub fn blockchain(&self) -> &dyn BlockchainHook {
        self.blockchain.as_ref()
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn rng_mut(&mut self) -> &mut dyn RngCore {
        self.rng.as_mut()
    }

    /// Replaces the key-generation RNG (deterministic tests).
    pub fn set_rng(&mut self, rng: Box<dyn RngCore>) {
        self.rng = rng;
    }

    /// Debits gas; a failed debit marks the frame out-of-gas and raises the
    /// breakpoint the engine polls.
    pub fn use_gas(&mut self, amount: u64) -> Result<(), VMError> {
        match self.metering.use_gas(amount) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.runtime.set_breakpoint(Breakpoint::OutOfGas);
                Err(err)
            }
        }
    }

    /// Ends the frame with the given error; the engine unwinds at its next
    /// poll and the error surfaces in the frame's output.
    pub fn fail_execution(&mut self, err: VMError) {
        log::trace!("execution failed: {}", err);
        self.output.record_error(err.clone());
        self.runtime.fail_execution(&err);
    }

    /// The contract-visible error signal: ends the frame as a user error
    /// carrying the contract's own message.
    pub fn signal_user_error(&mut self, message: &str) {
        self.output.set_return_message(message.to_string());
        self.runtime.set_breakpoint(Breakpoint::SignalError);
    }

    /// Reads one storage key of the current contract.
    pub fn load_storage(&self, key: &[u8]) -> Result<Vec<u8>, VMError> {
        self.storage.load(self.blockchain.as_ref(), key)
    }

    /// Writes one storage key of the current contract.
    pub fn store_storage(
        &mut self,
        key: &[u8],
        value: &[u8],
    ) -> Result<(StorageStatus, usize), VMError> {
        self.storage.store(self.blockchain.as_ref(), key, value)
    }

    // The snapshot protocol is always driven on every context, in this fixed
    // order, so the per-context stacks share the same depth at all times.

    fn init_all_states(&mut self) {
        self.runtime.init_state();
        self.runtime.clear_state_stack();
        self.metering.init_state();
        self.metering.clear_state_stack();
        self.output.init_state();
        self.output.clear_state_stack();
        self.storage.init_state();
        self.storage.clear_state_stack();
        self.managed_types.init_state();
        self.managed_types.clear_state_stack();
    }

    fn push_all_states(&mut self) {
        self.runtime.push_state();
        self.metering.push_state();
        self.output.push_state();
        self.storage.push_state();
        self.managed_types.push_state();
    }

    /// Rolls a nested frame back: every context returns to its pre-push
    /// state; the gas the child burned stays billed to the parent.
    pub(crate) fn rollback_nested_call(&mut self) {
        self.runtime.pop_set_active_state();
        self.metering.pop_set_active_state();
        self.output.pop_set_active_state();
        self.storage.pop_set_active_state();
        self.managed_types.pop_set_active_state();
    }

    /// Commits a nested frame: output and storage effects publish to the
    /// parent in one step, while the frame-local slices (runtime, metering,
    /// managed types) are restored, handing back the child's unspent gas.
    pub(crate) fn commit_nested_call(&mut self) {
        let unspent = self.metering.gas_left();
        let refunded = self.metering.gas_refunded();
        self.runtime.pop_set_active_state();
        self.metering.pop_set_active_state();
        self.output.pop_discard();
        self.storage.pop_discard();
        self.managed_types.pop_set_active_state();
        self.metering.restore_gas(unspent);
        self.metering.use_gas_refund(refunded);
    }

    /// Prepares the top-level frame of one contract call.
    pub(crate) fn init_execution(&mut self, input: &ContractCallInput) -> Result<(), VMError> {
        self.init_all_states();
        self.metering.begin_execution();
        self.metering.init_for_call(input.vm_input.gas_provided)?;
        self.runtime.init_from_call_input(input);
        self.storage.set_address(input.recipient_addr.clone());
        Ok(())
    }

    /// Prepares the top-level frame of one deploy; returns the address the
    /// new contract will live at.
    pub(crate) fn init_create(&mut self, input: &ContractCreateInput) -> Result<Address, VMError> {
        self.init_all_states();
        self.metering.begin_execution();
        self.metering.init_for_call(input.vm_input.gas_provided)?;

        let caller = &input.vm_input.caller_addr;
        let nonce = self.blockchain.get_nonce(caller)?;
        let address = self
            .blockchain
            .new_address(caller, nonce, self.runtime.vm_type())?;

        let call_input = ContractCallInput {
            vm_input: input.vm_input.clone(),
            recipient_addr: address.clone(),
            function: "init".to_string(),
        };
        self.runtime.init_from_call_input(&call_input);
        self.storage.set_address(address.clone());

        let compile_cost = (input.contract_code.len() as u64)
            .saturating_mul(self.metering.gas_schedule().base_operation_cost.compile_per_byte);
        self.use_gas(compile_cost)?;
        Ok(address)
    }

    /// Prepares a child frame for a nested contract-to-contract call. The
    /// child's gas allowance is debited from the parent up front; unspent
    /// gas comes back only if the child commits.
    pub(crate) fn begin_nested_call(&mut self, input: &ContractCallInput) -> Result<(), VMError> {
        self.use_gas(input.vm_input.gas_provided)?;
        self.push_all_states();
        self.managed_types.init_state();
        self.runtime.init_from_call_input(input);
        self.metering.init_for_nested_call(input.vm_input.gas_provided);
        self.storage.set_address(input.recipient_addr.clone());
        if let Err(err) = self.output.transfer_value(
            &input.vm_input.caller_addr,
            &input.recipient_addr,
            &input.vm_input.call_value,
        ) {
            self.rollback_nested_call();
            return Err(err);
        }
        Ok(())
    }

    /// Assembles the output of the finished top-level frame.
    pub(crate) fn build_vm_output(&mut self) -> VMOutput {
        let gas_remaining = self.metering.gas_left();
        let gas_refund = self.metering.gas_refunded();
        self.output
            .build_vm_output(gas_remaining, gas_refund, self.storage.updates_for_output())
    }
}

/// The public entry points of the host: one top-level execution at a time,
/// against a fresh context set.
pub struct Host {
    host: HostRef,
}

impl Host {
    pub fn new(
        blockchain: Box<dyn BlockchainHook>,
        parameters: HostParameters,
        schedule: GasSchedule,
    ) -> Result<Self, VMError> {
        let host = DefaultHost::new(blockchain, parameters, schedule)?;
        Ok(Self {
            host: Rc::new(RefCell::new(host)),
        })
    }

    /// Deploys a contract: runs its `init` export and returns the recorded
    /// effects, including the new account's code.
    pub fn run_contract_create(&self, input: &ContractCreateInput) -> VMOutput {
        execution::run_contract_create(&self.host, input)
    }

    /// Runs a named export of a deployed contract.
    pub fn run_contract_call(&self, input: &ContractCallInput) -> VMOutput {
        execution::run_contract_call(&self.host, input)
    }

    /// Swaps the gas schedule between executions.
    pub fn gas_schedule_change(&self, schedule: GasSchedule) -> Result<(), VMError> {
        self.host.borrow_mut().metering_mut().set_gas_schedule(schedule)
    }

    /// Direct access to the context set, for embedders and tests.
    pub fn host_ref(&self) -> &HostRef {
        &self.host
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use pretty_assertions::assert_eq;
    use wvm_shared::input::VMInput;

    use crate::blockchain::MockBlockchain;

    use super::*;

    fn test_host() -> DefaultHost {
        DefaultHost::new(
            Box::new(MockBlockchain::new()),
            HostParameters::default(),
            GasSchedule::dummy(),
        )
        .unwrap()
    }

    fn call_input(function: &str, gas: u64) -> ContractCallInput {
        ContractCallInput {
            vm_input: VMInput {
                caller_addr: vec![1; 32],
                gas_provided: gas,
                ..Default::default()
            },
            recipient_addr: vec![2; 32],
            function: function.to_string(),
        }
    }

    #[test]
    fn nested_rollback_restores_parent_handles() {
        let mut host = test_host();
        host.init_execution(&call_input("parent", 1_000)).unwrap();
        let handle = host.managed_types_mut().put_big_int(7);

        host.begin_nested_call(&call_input("child", 100)).unwrap();
        // The child starts with fresh tables; the parent's handle is not
        // visible here.
        assert!(host.managed_types().get_big_int(handle).is_err());
        let child_handle = host.managed_types_mut().put_big_int(99);
        assert_eq!(child_handle, 0);

        host.rollback_nested_call();
        assert_eq!(host.managed_types().get_big_int(handle), Ok(&BigInt::from(7)));
    }

    #[test]
    fn nested_commit_restores_tables_and_returns_unspent_gas() {
        let mut host = test_host();
        host.init_execution(&call_input("parent", 1_000)).unwrap();
        let handle = host.managed_types_mut().put_big_int(7);

        host.begin_nested_call(&call_input("child", 100)).unwrap();
        assert_eq!(host.metering().gas_left(), 100);
        host.use_gas(40).unwrap();
        host.output_mut().finish(b"child".to_vec());

        host.commit_nested_call();
        // Parent pre-paid 100, the child spent 40.
        assert_eq!(host.metering().gas_left(), 1_000 - 40);
        assert_eq!(host.managed_types().get_big_int(handle), Ok(&BigInt::from(7)));
        // Committed child output is visible in the parent frame.
        assert_eq!(host.output().return_data(), &[b"child".to_vec()]);
    }

    #[test]
    fn nested_call_allowance_failure_raises_out_of_gas() {
        let mut host = test_host();
        host.init_execution(&call_input("parent", 50)).unwrap();
        let err = host.begin_nested_call(&call_input("child", 100));
        assert_eq!(err, Err(VMError::NotEnoughGas));
        assert_eq!(host.runtime().breakpoint(), Breakpoint::OutOfGas);
    }

    #[test]
    fn redundant_pops_are_tolerated() {
        let mut host = test_host();
        host.init_execution(&call_input("parent", 1_000)).unwrap();
        host.begin_nested_call(&call_input("child", 10)).unwrap();
        host.begin_nested_call(&call_input("grandchild", 5)).unwrap();
        host.rollback_nested_call();
        host.rollback_nested_call();
        // One pop too many: a no-op, and the parent frame stays intact.
        host.rollback_nested_call();
        assert_eq!(host.runtime().function(), "parent");
    }

    #[test]
    fn signal_user_error_raises_the_breakpoint_with_the_message() {
        let mut host = test_host();
        host.init_execution(&call_input("f", 1_000)).unwrap();
        host.signal_user_error("balance too low");
        assert_eq!(host.runtime().breakpoint(), Breakpoint::SignalError);
        assert_eq!(host.output().return_message(), "balance too low");
    }
}
