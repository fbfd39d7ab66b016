// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use std::rc::Rc;

use wvm_shared::gas_schedule::GasSchedule;
use wvm_shared::VMError;

use super::StateStackable;

/// Gas accounting for the current frame. Debits saturate: once a charge
/// underflows the remaining gas, the frame is marked out-of-gas and every
/// later debit is a no-op.
pub struct MeteringContext {
    gas_schedule: Rc<GasSchedule>,
    block_gas_limit: u64,
    gas_left: u64,
    gas_refunded: u64,
    out_of_gas: bool,
    execution_active: bool,
    state_stack: Vec<MeteringSnapshot>,
}

struct MeteringSnapshot {
    gas_left: u64,
    gas_refunded: u64,
    out_of_gas: bool,
}

impl MeteringContext {
    pub fn new(gas_schedule: GasSchedule, block_gas_limit: u64) -> Self {
        Self {
            gas_schedule: Rc::new(gas_schedule),
            block_gas_limit,
            gas_left: 0,
            gas_refunded: 0,
            out_of_gas: false,
            execution_active: false,
            state_stack: Vec::new(),
        }
    }

    pub fn gas_schedule(&self) -> &GasSchedule {
        &self.gas_schedule
    }

    pub fn block_gas_limit(&self) -> u64 {
        self.block_gas_limit
    }

    /// Swaps the cost table. Valid only between executions; the schedule is
    /// read-only from the moment a call begins.
    pub fn set_gas_schedule(&mut self, schedule: GasSchedule) -> Result<(), VMError> {
        if self.execution_active {
            return Err(VMError::GasScheduleChangeDuringExecution);
        }
        self.gas_schedule = Rc::new(schedule);
        Ok(())
    }

    pub fn begin_execution(&mut self) {
        self.execution_active = true;
    }

    pub fn end_execution(&mut self) {
        self.execution_active = false;
    }

    /// Arms the frame with the gas granted by the caller of the host.
    pub fn init_for_call(&mut self, gas_provided: u64) -> Result<(), VMError> {
        if gas_provided > self.block_gas_limit {
            return Err(VMError::MaxGasLimitExceeded);
        }
        self.init_for_nested_call(gas_provided);
        Ok(())
    }

    /// Arms a child frame; its allowance was already debited from the parent
    /// and therefore cannot exceed the block gas limit.
    pub fn init_for_nested_call(&mut self, gas_provided: u64) {
        self.gas_left = gas_provided;
        self.gas_refunded = 0;
        self.out_of_gas = false;
    }

    /// Debits `amount`. On underflow the remaining gas drops to zero, the
    /// frame is marked out-of-gas and the debit reports failure; the caller
    /// raises the runtime breakpoint.
    pub fn use_gas(&mut self, amount: u64) -> Result<(), VMError> {
        if self.out_of_gas {
            return Err(VMError::NotEnoughGas);
        }
        if amount > self.gas_left {
            log::trace!("out of gas: charge {} > left {}", amount, self.gas_left);
            self.gas_left = 0;
            self.out_of_gas = true;
            return Err(VMError::NotEnoughGas);
        }
        self.gas_left -= amount;
        Ok(())
    }

    /// Returns unspent gas from a committed child frame.
    pub fn restore_gas(&mut self, amount: u64) {
        self.gas_left = self.gas_left.saturating_add(amount);
    }

    pub fn use_gas_refund(&mut self, amount: u64) {
        self.gas_refunded = self.gas_refunded.saturating_add(amount);
    }

    pub fn gas_left(&self) -> u64 {
        self.gas_left
    }

    pub fn gas_refunded(&self) -> u64 {
        self.gas_refunded
    }

    pub fn is_out_of_gas(&self) -> bool {
        self.out_of_gas
    }
}

impl StateStackable for MeteringContext {
    fn init_state(&mut self) {
        self.gas_left = 0;
        self.gas_refunded = 0;
        self.out_of_gas = false;
    }

    fn push_state(&mut self) {
        self.state_stack.push(MeteringSnapshot {
            gas_left: self.gas_left,
            gas_refunded: self.gas_refunded,
            out_of_gas: self.out_of_gas,
        });
    }

    fn pop_set_active_state(&mut self) {
        if let Some(snapshot) = self.state_stack.pop() {
            self.gas_left = snapshot.gas_left;
            self.gas_refunded = snapshot.gas_refunded;
            self.out_of_gas = snapshot.out_of_gas;
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

    fn metering(gas: u64) -> MeteringContext {
        let mut m = MeteringContext::new(GasSchedule::dummy(), 10_000_000);
        m.init_for_call(gas).unwrap();
        m
    }

    #[test]
    fn debits_are_monotonic() {
        let mut m = metering(100);
        m.use_gas(40).unwrap();
        assert_eq!(m.gas_left(), 60);
        m.use_gas(60).unwrap();
        assert_eq!(m.gas_left(), 0);
        assert!(!m.is_out_of_gas());
    }

    #[test]
    fn underflow_marks_out_of_gas_and_sticks() {
        let mut m = metering(10);
        assert_eq!(m.use_gas(11), Err(VMError::NotEnoughGas));
        assert!(m.is_out_of_gas());
        assert_eq!(m.gas_left(), 0);
        // Once out of gas, every debit fails without touching state.
        assert_eq!(m.use_gas(0), Err(VMError::NotEnoughGas));
    }

    #[test]
    fn saturated_charges_trip_out_of_gas() {
        let mut m = metering(1_000_000);
        let charge = u64::MAX;
        assert_eq!(m.use_gas(charge), Err(VMError::NotEnoughGas));
        assert!(m.is_out_of_gas());
    }

    #[test]
    fn gas_provided_is_capped_by_the_block_limit() {
        let mut m = MeteringContext::new(GasSchedule::dummy(), 1_000);
        assert_eq!(m.init_for_call(1_001), Err(VMError::MaxGasLimitExceeded));
    }

    #[test]
    fn schedule_change_is_rejected_mid_execution() {
        let mut m = metering(10);
        m.begin_execution();
        assert_eq!(
            m.set_gas_schedule(GasSchedule::dummy()),
            Err(VMError::GasScheduleChangeDuringExecution)
        );
        m.end_execution();
        assert!(m.set_gas_schedule(GasSchedule::dummy()).is_ok());
    }

    #[test]
    fn nested_frame_gas_is_restored_on_pop() {
        let mut m = metering(100);
        m.use_gas(30).unwrap();
        m.push_state();
        m.init_for_nested_call(30);
        m.use_gas(30).unwrap();
        assert!(m.use_gas(1).is_err());
        m.pop_set_active_state();
        assert_eq!(m.gas_left(), 70);
        assert!(!m.is_out_of_gas());
    }
}
