// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The WASM import surface. Every import follows one pattern: fetch the
//! contexts through the store data, debit the fixed cost, debit per-byte
//! costs before touching memory, validate handles, do the work, and report
//! an integer status. A breakpoint raised anywhere in a hostcall becomes a
//! trap when the hostcall returns — that is the engine's poll point.

use anyhow::anyhow;
use wasmtime::{Caller, Linker};
use wvm_shared::Breakpoint;

mod baseops;
mod bigint;
mod context;
mod crypto;

pub use context::{HostcallContext, Memory};

use crate::host::{execution, HostRef};

/// The namespace contracts import from.
const ENV_MODULE: &str = "env";

/// Marker error carrying a raised breakpoint out of a hostcall as a trap.
#[derive(Debug, thiserror::Error)]
#[error("runtime breakpoint {0:?}")]
pub(crate) struct BreakpointReached(pub Breakpoint);

fn memory_export(caller: &mut Caller<'_, HostRef>) -> Result<wasmtime::Memory, wasmtime::Error> {
    caller
        .get_export("memory")
        .and_then(|export| export.into_memory())
        .ok_or_else(|| anyhow!("contract memory export not found"))
}

/// Runs one hostcall body against the caller's host and memory, then polls
/// the breakpoint slot.
pub(crate) fn enter<R>(
    caller: &mut Caller<'_, HostRef>,
    body: impl FnOnce(&mut HostcallContext<'_>) -> R,
) -> Result<R, wasmtime::Error> {
    let host = caller.data().clone();
    let memory = memory_export(caller)?;
    let (data, _) = memory.data_and_store_mut(&mut *caller);
    let mut host = host.borrow_mut();
    let ret = {
        let mut ctx = HostcallContext {
            host: &mut *host,
            memory: Memory::new(data),
        };
        body(&mut ctx)
    };
    let breakpoint = host.runtime().breakpoint();
    if breakpoint != Breakpoint::None {
        return Err(wasmtime::Error::new(BreakpointReached(breakpoint)));
    }
    Ok(ret)
}

fn poll_breakpoint(host: &HostRef) -> Result<(), wasmtime::Error> {
    let breakpoint = host.borrow().runtime().breakpoint();
    if breakpoint != Breakpoint::None {
        return Err(wasmtime::Error::new(BreakpointReached(breakpoint)));
    }
    Ok(())
}

macro_rules! link_hostcall {
    ($linker:expr, $name:literal, $func:path, ($($arg:ident : $ty:ty),*) -> $ret:ty) => {
        $linker.func_wrap(
            ENV_MODULE,
            $name,
            move |mut caller: Caller<'_, HostRef>, $($arg: $ty),*| -> Result<$ret, wasmtime::Error> {
                enter(&mut caller, |ctx| $func(ctx, $($arg),*))
            },
        )?
    };
}

/// Installs every import the host exposes to contracts.
pub fn register(linker: &mut Linker<HostRef>) -> anyhow::Result<()> {
    // Frame accessors, output, storage.
    link_hostcall!(linker, "getCaller", baseops::get_caller, (result_offset: i32) -> ());
    link_hostcall!(linker, "getCallValue", baseops::get_call_value, (result_offset: i32) -> i32);
    link_hostcall!(linker, "getNumArguments", baseops::get_num_arguments, () -> i32);
    link_hostcall!(linker, "getArgument", baseops::get_argument, (id: i32, arg_offset: i32) -> i32);
    link_hostcall!(linker, "getFunction", baseops::get_function, (result_offset: i32) -> i32);
    link_hostcall!(linker, "getSCAddress", baseops::get_sc_address, (result_offset: i32) -> ());
    link_hostcall!(linker, "getGasLeft", baseops::get_gas_left, () -> i64);
    link_hostcall!(linker, "getBlockTimestamp", baseops::get_block_timestamp, () -> i64);
    link_hostcall!(linker, "getBlockNonce", baseops::get_block_nonce, () -> i64);
    link_hostcall!(linker, "getOriginalTxHash", baseops::get_original_tx_hash, (result_offset: i32) -> ());
    link_hostcall!(linker, "signalError", baseops::signal_error, (message_offset: i32, message_length: i32) -> ());
    link_hostcall!(linker, "writeLog", baseops::write_log, (data_pointer: i32, data_length: i32, topic_pointer: i32, num_topics: i32) -> ());
    link_hostcall!(linker, "finish", baseops::finish, (pointer: i32, length: i32) -> ());
    link_hostcall!(linker, "storageStore", baseops::storage_store, (key_offset: i32, key_length: i32, data_offset: i32, data_length: i32) -> i32);
    link_hostcall!(linker, "storageLoad", baseops::storage_load, (key_offset: i32, key_length: i32, result_offset: i32) -> i32);
    link_hostcall!(linker, "transferValue", baseops::transfer_value, (destination_offset: i32, value_offset: i32, data_offset: i32, length: i32) -> i32);
    link_hostcall!(linker, "asyncCall", baseops::async_call, (destination_offset: i32, value_offset: i32, data_offset: i32, length: i32) -> ());

    // Big integers.
    link_hostcall!(linker, "bigIntNew", bigint::big_int_new, (initial: i64) -> i32);
    link_hostcall!(linker, "bigIntByteLength", bigint::big_int_byte_length, (handle: i32) -> i32);
    link_hostcall!(linker, "bigIntGetBytes", bigint::big_int_get_bytes, (handle: i32, result_offset: i32) -> i32);
    link_hostcall!(linker, "bigIntSetBytes", bigint::big_int_set_bytes, (destination: i32, byte_offset: i32, byte_length: i32) -> ());
    link_hostcall!(linker, "bigIntGetInt64", bigint::big_int_get_int64, (handle: i32) -> i64);
    link_hostcall!(linker, "bigIntSetInt64", bigint::big_int_set_int64, (destination: i32, value: i64) -> ());
    link_hostcall!(linker, "bigIntAdd", bigint::big_int_add, (destination: i32, op1: i32, op2: i32) -> ());
    link_hostcall!(linker, "bigIntSub", bigint::big_int_sub, (destination: i32, op1: i32, op2: i32) -> ());
    link_hostcall!(linker, "bigIntMul", bigint::big_int_mul, (destination: i32, op1: i32, op2: i32) -> ());
    link_hostcall!(linker, "bigIntCmp", bigint::big_int_cmp, (op1: i32, op2: i32) -> i32);
    link_hostcall!(linker, "bigIntFinish", bigint::big_int_finish, (handle: i32) -> ());

    // Hashes, signatures, elliptic curves.
    link_hostcall!(linker, "sha256", crypto::sha256, (data_offset: i32, length: i32, result_offset: i32) -> i32);
    link_hostcall!(linker, "keccak256", crypto::keccak256, (data_offset: i32, length: i32, result_offset: i32) -> i32);
    link_hostcall!(linker, "ripemd160", crypto::ripemd160, (data_offset: i32, length: i32, result_offset: i32) -> i32);
    link_hostcall!(linker, "verifyBLS", crypto::verify_bls, (key_offset: i32, message_offset: i32, message_length: i32, sig_offset: i32) -> i32);
    link_hostcall!(linker, "verifyEd25519", crypto::verify_ed25519, (key_offset: i32, message_offset: i32, message_length: i32, sig_offset: i32) -> i32);
    link_hostcall!(linker, "verifySecp256k1", crypto::verify_secp256k1, (key_offset: i32, key_length: i32, message_offset: i32, message_length: i32, sig_offset: i32) -> i32);
    link_hostcall!(linker, "addEC", crypto::add_ec, (x_result_handle: i32, y_result_handle: i32, ec_handle: i32, fst_point_x_handle: i32, fst_point_y_handle: i32, snd_point_x_handle: i32, snd_point_y_handle: i32) -> ());
    link_hostcall!(linker, "doubleEC", crypto::double_ec, (x_result_handle: i32, y_result_handle: i32, ec_handle: i32, point_x_handle: i32, point_y_handle: i32) -> ());
    link_hostcall!(linker, "isOnCurveEC", crypto::is_on_curve_ec, (ec_handle: i32, point_x_handle: i32, point_y_handle: i32) -> i32);
    link_hostcall!(linker, "scalarBaseMultEC", crypto::scalar_base_mult_ec, (x_result_handle: i32, y_result_handle: i32, ec_handle: i32, k_offset: i32, length: i32) -> i32);
    link_hostcall!(linker, "scalarMultEC", crypto::scalar_mult_ec, (x_result_handle: i32, y_result_handle: i32, ec_handle: i32, point_x_handle: i32, point_y_handle: i32, k_offset: i32, length: i32) -> i32);
    link_hostcall!(linker, "marshalEC", crypto::marshal_ec, (point_x_handle: i32, point_y_handle: i32, ec_handle: i32, result_offset: i32) -> i32);
    link_hostcall!(linker, "marshalCompressedEC", crypto::marshal_compressed_ec, (point_x_handle: i32, point_y_handle: i32, ec_handle: i32, result_offset: i32) -> i32);
    link_hostcall!(linker, "unmarshalEC", crypto::unmarshal_ec, (x_pair_handle: i32, y_pair_handle: i32, ec_handle: i32, data_offset: i32, length: i32) -> i32);
    link_hostcall!(linker, "unmarshalCompressedEC", crypto::unmarshal_compressed_ec, (x_pair_handle: i32, y_pair_handle: i32, ec_handle: i32, data_offset: i32, length: i32) -> i32);
    link_hostcall!(linker, "generateKeyEC", crypto::generate_key_ec, (x_pub_key_handle: i32, y_pub_key_handle: i32, ec_handle: i32, result_offset: i32) -> i32);
    link_hostcall!(linker, "ellipticCurveNew", crypto::elliptic_curve_new, (field_order_handle: i32, base_point_order_handle: i32, eq_constant_handle: i32, x_base_point_handle: i32, y_base_point_handle: i32, size_of_field: i32) -> i32);

    // The nested-call import releases the host borrow around the child
    // execution, so it cannot go through `enter`.
    linker.func_wrap(
        ENV_MODULE,
        "executeOnDestContext",
        |mut caller: Caller<'_, HostRef>,
         gas_limit: i64,
         address_offset: i32,
         value_offset: i32,
         function_offset: i32,
         function_length: i32,
         num_arguments: i32,
         arguments_length_offset: i32,
         data_offset: i32|
         -> Result<i32, wasmtime::Error> {
            let host = caller.data().clone();
            let input = {
                let memory = memory_export(&mut caller)?;
                let (data, _) = memory.data_and_store_mut(&mut caller);
                let mut h = host.borrow_mut();
                let mut ctx = HostcallContext {
                    host: &mut *h,
                    memory: Memory::new(data),
                };
                baseops::prepare_execute_on_dest_context(
                    &mut ctx,
                    gas_limit,
                    address_offset,
                    value_offset,
                    function_offset,
                    function_length,
                    num_arguments,
                    arguments_length_offset,
                    data_offset,
                )
            };

            let status = match input {
                Some(input) => match execution::execute_on_dest_context(&host, input) {
                    Ok(()) => 0,
                    Err(err) => {
                        let mut h = host.borrow_mut();
                        if h.runtime().protocol_api_error_should_fail_execution() {
                            h.fail_execution(err);
                        }
                        1
                    }
                },
                None => 1,
            };

            poll_breakpoint(&host)?;
            Ok(status)
        },
    )?;

    Ok(())
}
