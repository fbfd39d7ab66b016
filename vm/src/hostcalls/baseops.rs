// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Protocol-level imports: frame accessors, output, storage, transfers, and
//! the asynchronous/nested call entry points.

use num_bigint::{BigInt, Sign};
use wvm_shared::input::{AsyncCallInfo, ContractCallInput, VMInput};
use wvm_shared::{Breakpoint, VMError, ADDRESS_LENGTH, BALANCE_BYTE_LENGTH};

use crate::contexts::StorageStatus;

use super::HostcallContext;

const TOPIC_LENGTH: i32 = 32;

fn balance_bytes(value: &BigInt) -> [u8; BALANCE_BYTE_LENGTH] {
    let raw = value.magnitude().to_bytes_be();
    let mut out = [0u8; BALANCE_BYTE_LENGTH];
    if raw.len() <= BALANCE_BYTE_LENGTH {
        out[BALANCE_BYTE_LENGTH - raw.len()..].copy_from_slice(&raw);
    }
    out
}

pub fn get_caller(ctx: &mut HostcallContext<'_>, result_offset: i32) {
    let gas = ctx.schedule().base_ops_api_cost.get_caller;
    if ctx.use_gas(gas).is_err() {
        return;
    }

    let caller = ctx.host.runtime().vm_input().caller_addr.clone();
    if let Err(err) = ctx.mem_store(result_offset, &caller) {
        ctx.with_fault(err, ctx.protocol_should_fail());
    }
}

pub fn get_call_value(ctx: &mut HostcallContext<'_>, result_offset: i32) -> i32 {
    let gas = ctx.schedule().base_ops_api_cost.get_call_value;
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    let value = balance_bytes(&ctx.host.runtime().vm_input().call_value);
    if let Err(err) = ctx.mem_store(result_offset, &value) {
        ctx.with_fault(err, ctx.protocol_should_fail());
        return 1;
    }
    0
}

pub fn get_num_arguments(ctx: &mut HostcallContext<'_>) -> i32 {
    let gas = ctx.schedule().base_ops_api_cost.get_argument;
    if ctx.use_gas(gas).is_err() {
        return -1;
    }
    ctx.host.runtime().arguments().len() as i32
}

pub fn get_argument(ctx: &mut HostcallContext<'_>, id: i32, arg_offset: i32) -> i32 {
    let gas = ctx.schedule().base_ops_api_cost.get_argument;
    if ctx.use_gas(gas).is_err() {
        return -1;
    }

    let argument = match ctx.host.runtime().arguments().get(id as usize) {
        Some(argument) => argument.clone(),
        None => {
            ctx.with_fault(VMError::InvalidArgument, ctx.protocol_should_fail());
            return -1;
        }
    };
    if let Err(err) = ctx.mem_store(arg_offset, &argument) {
        ctx.with_fault(err, ctx.protocol_should_fail());
        return -1;
    }
    argument.len() as i32
}

pub fn get_function(ctx: &mut HostcallContext<'_>, result_offset: i32) -> i32 {
    let gas = ctx.schedule().base_ops_api_cost.get_function;
    if ctx.use_gas(gas).is_err() {
        return -1;
    }

    let function = ctx.host.runtime().function().as_bytes().to_vec();
    if let Err(err) = ctx.mem_store(result_offset, &function) {
        ctx.with_fault(err, ctx.protocol_should_fail());
        return -1;
    }
    function.len() as i32
}

pub fn get_sc_address(ctx: &mut HostcallContext<'_>, result_offset: i32) {
    let gas = ctx.schedule().base_ops_api_cost.get_sc_address;
    if ctx.use_gas(gas).is_err() {
        return;
    }

    let address = ctx.host.runtime().sc_address().clone();
    if let Err(err) = ctx.mem_store(result_offset, &address) {
        ctx.with_fault(err, ctx.protocol_should_fail());
    }
}

pub fn get_gas_left(ctx: &mut HostcallContext<'_>) -> i64 {
    let gas = ctx.schedule().base_ops_api_cost.get_gas_left;
    if ctx.use_gas(gas).is_err() {
        return 0;
    }
    ctx.host.metering().gas_left().min(i64::MAX as u64) as i64
}

pub fn get_block_timestamp(ctx: &mut HostcallContext<'_>) -> i64 {
    let gas = ctx.schedule().base_ops_api_cost.get_block_info;
    if ctx.use_gas(gas).is_err() {
        return 0;
    }
    ctx.host.blockchain().current_timestamp().min(i64::MAX as u64) as i64
}

pub fn get_block_nonce(ctx: &mut HostcallContext<'_>) -> i64 {
    let gas = ctx.schedule().base_ops_api_cost.get_block_info;
    if ctx.use_gas(gas).is_err() {
        return 0;
    }
    ctx.host.blockchain().current_nonce().min(i64::MAX as u64) as i64
}

pub fn get_original_tx_hash(ctx: &mut HostcallContext<'_>, result_offset: i32) {
    let gas = ctx.schedule().base_ops_api_cost.get_original_tx_hash;
    if ctx.use_gas(gas).is_err() {
        return;
    }

    let hash = ctx.host.runtime().original_tx_hash().to_vec();
    if let Err(err) = ctx.mem_store(result_offset, &hash) {
        ctx.with_fault(err, ctx.protocol_should_fail());
    }
}

pub fn signal_error(ctx: &mut HostcallContext<'_>, message_offset: i32, message_length: i32) {
    let schedule = ctx.schedule();
    let gas = schedule.base_ops_api_cost.signal_error.saturating_add(
        schedule
            .base_operation_cost
            .data_copy_per_byte
            .saturating_mul(message_length as u64),
    );
    if ctx.use_gas(gas).is_err() {
        return;
    }

    let message = match ctx.mem_load(message_offset, message_length) {
        Ok(message) => message,
        Err(err) => {
            ctx.with_fault(err, ctx.protocol_should_fail());
            return;
        }
    };
    let message = String::from_utf8_lossy(&message).into_owned();
    ctx.host.signal_user_error(&message);
}

pub fn write_log(
    ctx: &mut HostcallContext<'_>,
    data_pointer: i32,
    data_length: i32,
    topic_pointer: i32,
    num_topics: i32,
) {
    if num_topics < 0 {
        ctx.with_fault(VMError::InvalidArgument, ctx.protocol_should_fail());
        return;
    }
    let schedule = ctx.schedule();
    let copied = (data_length as u64).saturating_add(num_topics as u64 * TOPIC_LENGTH as u64);
    let gas = schedule.base_ops_api_cost.log.saturating_add(
        schedule
            .base_operation_cost
            .data_copy_per_byte
            .saturating_mul(copied),
    );
    if ctx.use_gas(gas).is_err() {
        return;
    }

    let data = match ctx.mem_load(data_pointer, data_length) {
        Ok(data) => data,
        Err(err) => {
            ctx.with_fault(err, ctx.protocol_should_fail());
            return;
        }
    };
    let mut topics = Vec::with_capacity(num_topics as usize);
    for i in 0..num_topics {
        match ctx.mem_load(topic_pointer + i * TOPIC_LENGTH, TOPIC_LENGTH) {
            Ok(topic) => topics.push(topic),
            Err(err) => {
                ctx.with_fault(err, ctx.protocol_should_fail());
                return;
            }
        }
    }

    let address = ctx.host.runtime().sc_address().clone();
    ctx.host.output_mut().write_log(address, topics, data);
}

pub fn finish(ctx: &mut HostcallContext<'_>, pointer: i32, length: i32) {
    let schedule = ctx.schedule();
    let gas = schedule.base_ops_api_cost.finish.saturating_add(
        schedule
            .base_operation_cost
            .data_copy_per_byte
            .saturating_mul(length as u64),
    );
    if ctx.use_gas(gas).is_err() {
        return;
    }

    let data = match ctx.mem_load(pointer, length) {
        Ok(data) => data,
        Err(err) => {
            ctx.with_fault(err, ctx.protocol_should_fail());
            return;
        }
    };
    ctx.host.output_mut().finish(data);
}

pub fn storage_store(
    ctx: &mut HostcallContext<'_>,
    key_offset: i32,
    key_length: i32,
    data_offset: i32,
    data_length: i32,
) -> i32 {
    let gas = ctx.schedule().base_ops_api_cost.storage_store;
    if ctx.use_gas(gas).is_err() {
        return -1;
    }
    if ctx.host.runtime().read_only() {
        ctx.with_fault(VMError::InvalidCallOnReadOnlyMode, ctx.protocol_should_fail());
        return -1;
    }

    let key = match ctx.mem_load(key_offset, key_length) {
        Ok(key) => key,
        Err(err) => {
            ctx.with_fault(err, ctx.protocol_should_fail());
            return -1;
        }
    };
    let value = match ctx.mem_load(data_offset, data_length) {
        Ok(value) => value,
        Err(err) => {
            ctx.with_fault(err, ctx.protocol_should_fail());
            return -1;
        }
    };

    let stored = ctx.host.store_storage(&key, &value);
    let (status, old_len) = match stored {
        Ok(result) => result,
        Err(err) => {
            ctx.with_fault(err, ctx.protocol_should_fail());
            return -1;
        }
    };

    // Persistence gas: adds bill the full value, growth bills the delta,
    // shrinkage and deletes refund the released bytes.
    let base_cost = ctx.schedule().base_operation_cost.clone();
    let new_len = value.len() as u64;
    let old_len = old_len as u64;
    let outcome = match status {
        StorageStatus::Added => ctx.use_gas(base_cost.store_per_byte.saturating_mul(new_len)),
        StorageStatus::Modified if new_len > old_len => {
            ctx.use_gas(base_cost.persist_per_byte.saturating_mul(new_len - old_len))
        }
        StorageStatus::Modified => {
            ctx.host
                .metering_mut()
                .use_gas_refund(base_cost.release_per_byte.saturating_mul(old_len - new_len));
            Ok(())
        }
        StorageStatus::Deleted => {
            ctx.host
                .metering_mut()
                .use_gas_refund(base_cost.release_per_byte.saturating_mul(old_len));
            Ok(())
        }
        StorageStatus::Unchanged => {
            ctx.use_gas(base_cost.data_copy_per_byte.saturating_mul(new_len))
        }
    };
    if outcome.is_err() {
        return -1;
    }
    status as i32
}

pub fn storage_load(
    ctx: &mut HostcallContext<'_>,
    key_offset: i32,
    key_length: i32,
    result_offset: i32,
) -> i32 {
    let gas = ctx.schedule().base_ops_api_cost.storage_load;
    if ctx.use_gas(gas).is_err() {
        return -1;
    }

    let key = match ctx.mem_load(key_offset, key_length) {
        Ok(key) => key,
        Err(err) => {
            ctx.with_fault(err, ctx.protocol_should_fail());
            return -1;
        }
    };
    let value = match ctx.host.load_storage(&key) {
        Ok(value) => value,
        Err(err) => {
            ctx.with_fault(err, ctx.protocol_should_fail());
            return -1;
        }
    };

    let per_byte = ctx.schedule().base_operation_cost.data_copy_per_byte;
    if ctx
        .use_gas(per_byte.saturating_mul(value.len() as u64))
        .is_err()
    {
        return -1;
    }
    if let Err(err) = ctx.mem_store(result_offset, &value) {
        ctx.with_fault(err, ctx.protocol_should_fail());
        return -1;
    }
    value.len() as i32
}

pub fn transfer_value(
    ctx: &mut HostcallContext<'_>,
    destination_offset: i32,
    value_offset: i32,
    data_offset: i32,
    length: i32,
) -> i32 {
    let schedule = ctx.schedule();
    let gas = schedule.base_ops_api_cost.transfer_value.saturating_add(
        schedule
            .base_operation_cost
            .data_copy_per_byte
            .saturating_mul(length as u64),
    );
    if ctx.use_gas(gas).is_err() {
        return 1;
    }
    if ctx.host.runtime().read_only() {
        ctx.with_fault(VMError::InvalidCallOnReadOnlyMode, ctx.protocol_should_fail());
        return 1;
    }

    let loaded = load_transfer_args(ctx, destination_offset, value_offset, data_offset, length);
    let (destination, value, data) = match loaded {
        Ok(args) => args,
        Err(err) => {
            ctx.with_fault(err, ctx.protocol_should_fail());
            return 1;
        }
    };

    let sender = ctx.host.runtime().sc_address().clone();
    if let Err(err) = ctx
        .host
        .output_mut()
        .transfer_with_data(&sender, &destination, &value, data, 0)
    {
        ctx.with_fault(err, ctx.protocol_should_fail());
        return 1;
    }
    0
}

pub fn async_call(
    ctx: &mut HostcallContext<'_>,
    destination_offset: i32,
    value_offset: i32,
    data_offset: i32,
    length: i32,
) {
    let schedule = ctx.schedule();
    let gas = schedule.base_ops_api_cost.async_call_step.saturating_add(
        schedule
            .base_operation_cost
            .data_copy_per_byte
            .saturating_mul(length as u64),
    );
    if ctx.use_gas(gas).is_err() {
        return;
    }

    let loaded = load_transfer_args(ctx, destination_offset, value_offset, data_offset, length);
    let (destination, value, data) = match loaded {
        Ok(args) => args,
        Err(err) => {
            ctx.with_fault(err, ctx.protocol_should_fail());
            return;
        }
    };

    let gas_limit = ctx.host.metering().gas_left();
    ctx.host.runtime_mut().set_async_call_info(AsyncCallInfo {
        destination,
        data,
        gas_limit,
        value_bytes: balance_bytes(&value).to_vec(),
    });
    ctx.host.runtime_mut().set_breakpoint(Breakpoint::AsyncCall);
}

fn load_transfer_args(
    ctx: &HostcallContext<'_>,
    destination_offset: i32,
    value_offset: i32,
    data_offset: i32,
    length: i32,
) -> Result<(Vec<u8>, BigInt, Vec<u8>), VMError> {
    let destination = ctx.mem_load(destination_offset, ADDRESS_LENGTH as i32)?;
    let value_bytes = ctx.mem_load(value_offset, BALANCE_BYTE_LENGTH as i32)?;
    let data = ctx.mem_load(data_offset, length)?;
    let value = BigInt::from_bytes_be(Sign::Plus, &value_bytes);
    Ok((destination, value, data))
}

/// Parses the in-memory argument block of `executeOnDestContext` and debits
/// the call's fixed and per-byte costs. Returns `None` when a fault was
/// recorded; the import then reports failure to the contract.
#[allow(clippy::too_many_arguments)]
pub(crate) fn prepare_execute_on_dest_context(
    ctx: &mut HostcallContext<'_>,
    gas_limit: i64,
    address_offset: i32,
    value_offset: i32,
    function_offset: i32,
    function_length: i32,
    num_arguments: i32,
    arguments_length_offset: i32,
    data_offset: i32,
) -> Option<ContractCallInput> {
    let gas = ctx.schedule().base_ops_api_cost.execute_on_dest_context;
    if ctx.use_gas(gas).is_err() {
        return None;
    }
    if gas_limit < 0 || num_arguments < 0 {
        ctx.with_fault(VMError::InvalidArgument, ctx.protocol_should_fail());
        return None;
    }

    let parsed: Result<ContractCallInput, VMError> = (|| {
        let destination = ctx.mem_load(address_offset, ADDRESS_LENGTH as i32)?;
        let value_bytes = ctx.mem_load(value_offset, BALANCE_BYTE_LENGTH as i32)?;
        let function_bytes = ctx.mem_load(function_offset, function_length)?;
        let function =
            String::from_utf8(function_bytes).map_err(|_| VMError::InvalidFunctionName)?;

        let words_length = num_arguments
            .checked_mul(4)
            .ok_or(VMError::MemoryOutOfBounds)?;
        let length_words = ctx.mem_load(arguments_length_offset, words_length)?;
        let mut arguments = Vec::with_capacity(num_arguments as usize);
        let mut cursor = data_offset;
        for word in length_words.chunks_exact(4) {
            let length = i32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            arguments.push(ctx.mem_load(cursor, length)?);
            cursor = cursor.checked_add(length).ok_or(VMError::MemoryOutOfBounds)?;
        }

        let parent_input = ctx.host.runtime().vm_input();
        Ok(ContractCallInput {
            vm_input: VMInput {
                caller_addr: ctx.host.runtime().sc_address().clone(),
                arguments,
                call_value: BigInt::from_bytes_be(Sign::Plus, &value_bytes),
                gas_price: parent_input.gas_price,
                gas_provided: gas_limit as u64,
                current_tx_hash: parent_input.current_tx_hash.clone(),
                original_tx_hash: parent_input.original_tx_hash.clone(),
            },
            recipient_addr: destination,
            function,
        })
    })();

    let input = match parsed {
        Ok(input) => input,
        Err(err) => {
            ctx.with_fault(err, ctx.protocol_should_fail());
            return None;
        }
    };

    let copied: u64 = input
        .vm_input
        .arguments
        .iter()
        .map(|a| a.len() as u64)
        .sum();
    let per_byte = ctx.schedule().base_operation_cost.data_copy_per_byte;
    if ctx.use_gas(per_byte.saturating_mul(copied)).is_err() {
        return None;
    }
    Some(input)
}
