// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use wvm_shared::input::{AsyncCallInfo, ContractCallInput, VMInput};
use wvm_shared::{Address, Breakpoint, VMError};

use super::StateStackable;

/// The current frame: who called, with what, into which function — plus the
/// breakpoint slot the engine polls and the per-API failure toggles.
pub struct RuntimeContext {
    vm_type: Vec<u8>,
    vm_input: VMInput,
    sc_address: Address,
    function: String,
    read_only: bool,
    breakpoint: Breakpoint,
    async_call_info: Option<AsyncCallInfo>,
    fail_crypto_api: bool,
    fail_big_int_api: bool,
    fail_protocol_api: bool,
    state_stack: Vec<RuntimeSnapshot>,
}

struct RuntimeSnapshot {
    vm_input: VMInput,
    sc_address: Address,
    function: String,
    read_only: bool,
    breakpoint: Breakpoint,
    async_call_info: Option<AsyncCallInfo>,
}

impl RuntimeContext {
    pub fn new(vm_type: Vec<u8>) -> Self {
        Self {
            vm_type,
            vm_input: VMInput::default(),
            sc_address: Address::default(),
            function: String::new(),
            read_only: false,
            breakpoint: Breakpoint::None,
            async_call_info: None,
            fail_crypto_api: true,
            fail_big_int_api: true,
            fail_protocol_api: true,
            state_stack: Vec::new(),
        }
    }

    /// Installs a fresh frame from the given call input.
    pub fn init_from_call_input(&mut self, input: &ContractCallInput) {
        self.vm_input = input.vm_input.clone();
        self.sc_address = input.recipient_addr.clone();
        self.function = input.function.clone();
        self.read_only = false;
        self.breakpoint = Breakpoint::None;
        self.async_call_info = None;
    }

    pub fn vm_type(&self) -> &[u8] {
        &self.vm_type
    }

    pub fn vm_input(&self) -> &VMInput {
        &self.vm_input
    }

    pub fn set_vm_input(&mut self, vm_input: VMInput) {
        self.vm_input = vm_input;
    }

    pub fn sc_address(&self) -> &Address {
        &self.sc_address
    }

    pub fn set_sc_address(&mut self, sc_address: Address) {
        self.sc_address = sc_address;
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn set_function(&mut self, function: String) {
        self.function = function;
    }

    pub fn arguments(&self) -> &[Vec<u8>] {
        &self.vm_input.arguments
    }

    pub fn current_tx_hash(&self) -> &[u8] {
        &self.vm_input.current_tx_hash
    }

    pub fn original_tx_hash(&self) -> &[u8] {
        &self.vm_input.original_tx_hash
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn breakpoint(&self) -> Breakpoint {
        self.breakpoint
    }

    pub fn set_breakpoint(&mut self, value: Breakpoint) {
        self.breakpoint = value;
    }

    pub fn async_call_info(&self) -> Option<&AsyncCallInfo> {
        self.async_call_info.as_ref()
    }

    pub fn set_async_call_info(&mut self, info: AsyncCallInfo) {
        self.async_call_info = Some(info);
    }

    pub fn take_async_call_info(&mut self) -> Option<AsyncCallInfo> {
        self.async_call_info.take()
    }

    pub fn crypto_api_error_should_fail_execution(&self) -> bool {
        self.fail_crypto_api
    }

    pub fn big_int_api_error_should_fail_execution(&self) -> bool {
        self.fail_big_int_api
    }

    pub fn protocol_api_error_should_fail_execution(&self) -> bool {
        self.fail_protocol_api
    }

    pub fn set_crypto_api_error_should_fail_execution(&mut self, fail: bool) {
        self.fail_crypto_api = fail;
    }

    pub fn set_big_int_api_error_should_fail_execution(&mut self, fail: bool) {
        self.fail_big_int_api = fail;
    }

    pub fn set_protocol_api_error_should_fail_execution(&mut self, fail: bool) {
        self.fail_protocol_api = fail;
    }

    /// Raises the breakpoint that ends the frame with the given error. The
    /// error itself is recorded by the output context; see
    /// [`crate::host::DefaultHost::fail_execution`].
    pub fn fail_execution(&mut self, _err: &VMError) {
        self.breakpoint = Breakpoint::ExecutionFailed;
    }

    pub fn signal_exit(&mut self) {
        self.breakpoint = Breakpoint::SignalError;
    }
}

impl StateStackable for RuntimeContext {
    fn init_state(&mut self) {
        self.vm_input = VMInput::default();
        self.sc_address = Address::default();
        self.function = String::new();
        self.read_only = false;
        self.breakpoint = Breakpoint::None;
        self.async_call_info = None;
    }

    fn push_state(&mut self) {
        self.state_stack.push(RuntimeSnapshot {
            vm_input: self.vm_input.clone(),
            sc_address: self.sc_address.clone(),
            function: self.function.clone(),
            read_only: self.read_only,
            breakpoint: self.breakpoint,
            async_call_info: self.async_call_info.clone(),
        });
    }

    fn pop_set_active_state(&mut self) {
        if let Some(snapshot) = self.state_stack.pop() {
            self.vm_input = snapshot.vm_input;
            self.sc_address = snapshot.sc_address;
            self.function = snapshot.function;
            self.read_only = snapshot.read_only;
            self.breakpoint = snapshot.breakpoint;
            self.async_call_info = snapshot.async_call_info;
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
    use super::*;

    fn call_input(function: &str) -> ContractCallInput {
        ContractCallInput {
            recipient_addr: vec![7; 32],
            function: function.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn nested_frame_restores_the_parent_on_pop() {
        let mut runtime = RuntimeContext::new(vec![5, 0]);
        runtime.init_from_call_input(&call_input("parentFunc"));
        runtime.set_breakpoint(Breakpoint::AsyncCall);

        runtime.push_state();
        runtime.init_from_call_input(&call_input("childFunc"));
        assert_eq!(runtime.function(), "childFunc");
        assert_eq!(runtime.breakpoint(), Breakpoint::None);

        runtime.pop_set_active_state();
        assert_eq!(runtime.function(), "parentFunc");
        assert_eq!(runtime.breakpoint(), Breakpoint::AsyncCall);
    }

    #[test]
    fn pop_on_empty_stack_is_a_no_op() {
        let mut runtime = RuntimeContext::new(vec![5, 0]);
        runtime.set_function("f".to_string());
        runtime.pop_set_active_state();
        runtime.pop_discard();
        assert_eq!(runtime.function(), "f");
    }
}
