// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use num_bigint::BigInt;
use wvm_shared::gas_schedule::GasSchedule;
use wvm_shared::VMError;

use crate::contexts::ManagedTypeContext;
use crate::host::DefaultHost;

/// A bounds-checked view of the contract's linear memory, valid for the
/// duration of one hostcall.
pub struct Memory<'a> {
    data: &'a mut [u8],
}

impl<'a> Memory<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    fn checked_range(&self, offset: i32, length: i32) -> Result<(usize, usize), VMError> {
        if offset < 0 || length < 0 {
            return Err(VMError::MemoryOutOfBounds);
        }
        let start = offset as usize;
        let end = start
            .checked_add(length as usize)
            .ok_or(VMError::MemoryOutOfBounds)?;
        if end > self.data.len() {
            return Err(VMError::MemoryOutOfBounds);
        }
        Ok((start, end))
    }

    /// Copies `length` bytes starting at `offset` out of the instance memory.
    pub fn load(&self, offset: i32, length: i32) -> Result<Vec<u8>, VMError> {
        let (start, end) = self.checked_range(offset, length)?;
        Ok(self.data[start..end].to_vec())
    }

    /// Copies `bytes` into the instance memory at `offset`.
    pub fn store(&mut self, offset: i32, bytes: &[u8]) -> Result<(), VMError> {
        let (start, end) = self.checked_range(offset, bytes.len() as i32)?;
        self.data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What one hostcall sees: the live contexts plus the caller's memory.
pub struct HostcallContext<'a> {
    pub host: &'a mut DefaultHost,
    pub memory: Memory<'a>,
}

impl HostcallContext<'_> {
    pub fn schedule(&self) -> &GasSchedule {
        self.host.metering().gas_schedule()
    }

    /// Debits gas, raising the out-of-gas breakpoint on underflow.
    pub fn use_gas(&mut self, amount: u64) -> Result<(), VMError> {
        self.host.use_gas(amount)
    }

    /// Charges for copying big integers: `byte_len × DataCopyPerByte` per
    /// value, free at or below the 32-byte threshold.
    pub fn use_gas_for_big_int_copies(&mut self, values: &[&BigInt]) -> Result<(), VMError> {
        let per_byte = self.schedule().base_operation_cost.data_copy_per_byte;
        let mut total: u64 = 0;
        for value in values {
            let weight = ManagedTypeContext::big_int_copy_weight(value);
            total = total.saturating_add(weight.saturating_mul(per_byte));
        }
        if total == 0 {
            return Ok(());
        }
        self.use_gas(total)
    }

    pub fn mem_load(&self, offset: i32, length: i32) -> Result<Vec<u8>, VMError> {
        self.memory.load(offset, length)
    }

    pub fn mem_store(&mut self, offset: i32, bytes: &[u8]) -> Result<(), VMError> {
        self.memory.store(offset, bytes)
    }

    /// The uniform failure hook: when the API family's toggle says so, the
    /// fault ends the frame; otherwise only the return code reports it.
    pub fn with_fault(&mut self, err: VMError, should_fail_execution: bool) {
        log::trace!("hostcall fault: {}", err);
        if should_fail_execution {
            self.host.fail_execution(err);
        }
    }

    pub fn crypto_should_fail(&self) -> bool {
        self.host
            .runtime()
            .crypto_api_error_should_fail_execution()
    }

    pub fn big_int_should_fail(&self) -> bool {
        self.host
            .runtime()
            .big_int_api_error_should_fail_execution()
    }

    pub fn protocol_should_fail(&self) -> bool {
        self.host
            .runtime()
            .protocol_api_error_should_fail_execution()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_are_bounds_checked() {
        let mut data = vec![1, 2, 3, 4];
        let memory = Memory::new(&mut data);
        assert_eq!(memory.load(1, 2).unwrap(), vec![2, 3]);
        assert_eq!(memory.load(0, 0).unwrap(), Vec::<u8>::new());
        assert_eq!(memory.load(3, 2), Err(VMError::MemoryOutOfBounds));
        assert_eq!(memory.load(-1, 1), Err(VMError::MemoryOutOfBounds));
        assert_eq!(memory.load(0, -1), Err(VMError::MemoryOutOfBounds));
        assert_eq!(memory.load(i32::MAX, i32::MAX), Err(VMError::MemoryOutOfBounds));
    }

    #[test]
    fn stores_are_bounds_checked() {
        let mut data = vec![0u8; 4];
        let mut memory = Memory::new(&mut data);
        memory.store(1, &[9, 9]).unwrap();
        assert_eq!(memory.store(3, &[1, 2]), Err(VMError::MemoryOutOfBounds));
        drop(memory);
        assert_eq!(data, vec![0, 9, 9, 0]);
    }
}
