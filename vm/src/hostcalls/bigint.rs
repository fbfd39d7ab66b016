// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Big-integer imports. Values live in the managed-type context's handle
//! table; contracts only ever see handles. Results are assigned through the
//! destination handle so its identity is preserved.

use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};
use wvm_shared::VMError;

use super::HostcallContext;

/// Big-endian magnitude; zero encodes to the empty string, as contracts
/// expect.
fn magnitude_bytes(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        Vec::new()
    } else {
        value.magnitude().to_bytes_be()
    }
}

pub fn big_int_new(ctx: &mut HostcallContext<'_>, initial: i64) -> i32 {
    let gas = ctx.schedule().big_int_api_cost.big_int_new;
    if ctx.use_gas(gas).is_err() {
        return -1;
    }
    ctx.host.managed_types_mut().put_big_int(initial)
}

pub fn big_int_byte_length(ctx: &mut HostcallContext<'_>, handle: i32) -> i32 {
    let gas = ctx.schedule().big_int_api_cost.big_int_byte_length;
    if ctx.use_gas(gas).is_err() {
        return -1;
    }
    match ctx.host.managed_types().get_big_int(handle) {
        Ok(value) => ((value.bits() + 7) / 8) as i32,
        Err(err) => {
            ctx.with_fault(err, ctx.big_int_should_fail());
            -1
        }
    }
}

pub fn big_int_get_bytes(ctx: &mut HostcallContext<'_>, handle: i32, result_offset: i32) -> i32 {
    let gas = ctx.schedule().big_int_api_cost.big_int_get_bytes;
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    let bytes = match ctx.host.managed_types().get_big_int(handle) {
        Ok(value) => magnitude_bytes(value),
        Err(err) => {
            ctx.with_fault(err, ctx.big_int_should_fail());
            return 1;
        }
    };
    let per_byte = ctx.schedule().base_operation_cost.data_copy_per_byte;
    if ctx
        .use_gas(per_byte.saturating_mul(bytes.len() as u64))
        .is_err()
    {
        return 1;
    }
    if let Err(err) = ctx.mem_store(result_offset, &bytes) {
        ctx.with_fault(err, ctx.big_int_should_fail());
        return 1;
    }
    bytes.len() as i32
}

pub fn big_int_set_bytes(
    ctx: &mut HostcallContext<'_>,
    destination: i32,
    byte_offset: i32,
    byte_length: i32,
) {
    let schedule = ctx.schedule();
    let gas = schedule.big_int_api_cost.big_int_set_bytes.saturating_add(
        schedule
            .base_operation_cost
            .data_copy_per_byte
            .saturating_mul(byte_length as u64),
    );
    if ctx.use_gas(gas).is_err() {
        return;
    }

    let bytes = match ctx.mem_load(byte_offset, byte_length) {
        Ok(bytes) => bytes,
        Err(err) => {
            ctx.with_fault(err, ctx.big_int_should_fail());
            return;
        }
    };
    *ctx.host.managed_types_mut().get_big_int_or_create(destination) =
        BigInt::from_bytes_be(Sign::Plus, &bytes);
}

pub fn big_int_get_int64(ctx: &mut HostcallContext<'_>, handle: i32) -> i64 {
    let gas = ctx.schedule().big_int_api_cost.big_int_get_int64;
    if ctx.use_gas(gas).is_err() {
        return 0;
    }
    ctx.host
        .managed_types_mut()
        .get_big_int_or_create(handle)
        .to_i64()
        .unwrap_or_default()
}

pub fn big_int_set_int64(ctx: &mut HostcallContext<'_>, destination: i32, value: i64) {
    let gas = ctx.schedule().big_int_api_cost.big_int_set_int64;
    if ctx.use_gas(gas).is_err() {
        return;
    }
    *ctx.host.managed_types_mut().get_big_int_or_create(destination) = BigInt::from(value);
}

fn binary_op(
    ctx: &mut HostcallContext<'_>,
    fixed_gas: u64,
    destination: i32,
    op1: i32,
    op2: i32,
    apply: impl FnOnce(&BigInt, &BigInt) -> BigInt,
) {
    if ctx.use_gas(fixed_gas).is_err() {
        return;
    }

    ctx.host.managed_types_mut().get_big_int_or_create(destination);
    let operands = (|| -> Result<(BigInt, BigInt), VMError> {
        let a = ctx.host.managed_types().get_big_int(op1)?.clone();
        let b = ctx.host.managed_types().get_big_int(op2)?.clone();
        Ok((a, b))
    })();
    let (a, b) = match operands {
        Ok(operands) => operands,
        Err(err) => {
            ctx.with_fault(err, ctx.big_int_should_fail());
            return;
        }
    };
    if ctx.use_gas_for_big_int_copies(&[&a, &b]).is_err() {
        return;
    }
    ctx.host
        .managed_types_mut()
        .set_big_int(destination, apply(&a, &b));
}

pub fn big_int_add(ctx: &mut HostcallContext<'_>, destination: i32, op1: i32, op2: i32) {
    let gas = ctx.schedule().big_int_api_cost.big_int_add;
    binary_op(ctx, gas, destination, op1, op2, |a, b| a + b)
}

pub fn big_int_sub(ctx: &mut HostcallContext<'_>, destination: i32, op1: i32, op2: i32) {
    let gas = ctx.schedule().big_int_api_cost.big_int_sub;
    binary_op(ctx, gas, destination, op1, op2, |a, b| a - b)
}

pub fn big_int_mul(ctx: &mut HostcallContext<'_>, destination: i32, op1: i32, op2: i32) {
    let gas = ctx.schedule().big_int_api_cost.big_int_mul;
    binary_op(ctx, gas, destination, op1, op2, |a, b| a * b)
}

pub fn big_int_cmp(ctx: &mut HostcallContext<'_>, op1: i32, op2: i32) -> i32 {
    let gas = ctx.schedule().big_int_api_cost.big_int_cmp;
    if ctx.use_gas(gas).is_err() {
        return -2;
    }

    let operands = (|| -> Result<(BigInt, BigInt), VMError> {
        let a = ctx.host.managed_types().get_big_int(op1)?.clone();
        let b = ctx.host.managed_types().get_big_int(op2)?.clone();
        Ok((a, b))
    })();
    match operands {
        Ok((a, b)) => match a.cmp(&b) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        },
        Err(err) => {
            ctx.with_fault(err, ctx.big_int_should_fail());
            -2
        }
    }
}

pub fn big_int_finish(ctx: &mut HostcallContext<'_>, handle: i32) {
    let gas = ctx.schedule().big_int_api_cost.big_int_finish;
    if ctx.use_gas(gas).is_err() {
        return;
    }

    let bytes = match ctx.host.managed_types().get_big_int(handle) {
        Ok(value) => magnitude_bytes(value),
        Err(err) => {
            ctx.with_fault(err, ctx.big_int_should_fail());
            return;
        }
    };
    let per_byte = ctx.schedule().base_operation_cost.data_copy_per_byte;
    if ctx
        .use_gas(per_byte.saturating_mul(bytes.len() as u64))
        .is_err()
    {
        return;
    }
    ctx.host.output_mut().finish(bytes);
}
