// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Drives contract executions: top-level calls and deploys, nested
//! contract-to-contract calls, and the breakpoint resolution that turns an
//! unwound frame into a verdict.

use num_bigint::{BigInt, Sign};
use wvm_shared::input::{ContractCallInput, ContractCreateInput};
use wvm_shared::output::VMOutput;
use wvm_shared::{Breakpoint, ReturnCode, VMError};

use crate::engine;
use crate::host::HostRef;

pub(crate) fn run_contract_call(host: &HostRef, input: &ContractCallInput) -> VMOutput {
    log::debug!("run contract call: function {:?}", input.function);

    let prepared: Result<Vec<u8>, VMError> = {
        let mut h = host.borrow_mut();
        h.init_execution(input).and_then(|()| {
            if input.function == "init" {
                return Err(VMError::InitFuncCalledInRun);
            }
            engine::validate_function_name(&input.function)?;
            let code = h.blockchain().get_code(&input.recipient_addr)?;
            if code.is_empty() {
                return Err(VMError::ContractNotFound);
            }
            Ok(code)
        })
    };

    let result = prepared.and_then(|code| run_wasm(host, &code, &input.function));

    let mut h = host.borrow_mut();
    h.metering_mut().end_execution();
    match result {
        Ok(()) => h.build_vm_output(),
        Err(err) => VMOutput::from_error(return_code_for_error(&err), err),
    }
}

pub(crate) fn run_contract_create(host: &HostRef, input: &ContractCreateInput) -> VMOutput {
    log::debug!(
        "run contract create: {} bytes of code",
        input.contract_code.len()
    );

    let prepared: Result<Vec<u8>, VMError> = {
        let mut h = host.borrow_mut();
        h.init_create(input)
    };

    let result = prepared.clone().and_then(|_| {
        if input.contract_code.is_empty() {
            return Err(VMError::ContractInvalid);
        }
        run_wasm(host, &input.contract_code, "init")
    });

    let mut h = host.borrow_mut();
    h.metering_mut().end_execution();
    match (prepared, result) {
        (Ok(address), Ok(())) => {
            if h.output().return_code() == ReturnCode::Ok {
                h.output_mut().set_code(&address, input.contract_code.clone());
            }
            h.build_vm_output()
        }
        (_, Err(err)) | (Err(err), _) => VMOutput::from_error(return_code_for_error(&err), err),
    }
}

/// The nested-call protocol: push every context, run the callee in a child
/// frame, then commit (publishing its effects) or roll back (publishing
/// none). The child's billed gas stays consumed either way.
pub(crate) fn execute_on_dest_context(
    host: &HostRef,
    input: ContractCallInput,
) -> Result<(), VMError> {
    log::debug!("execute on dest context: function {:?}", input.function);
    {
        let mut h = host.borrow_mut();
        h.begin_nested_call(&input)?;
    }

    let run: Result<(), VMError> = {
        if input.function == "init" {
            Err(VMError::InitFuncCalledInRun)
        } else {
            engine::validate_function_name(&input.function).and_then(|()| {
                let code = host.borrow().blockchain().get_code(&input.recipient_addr)?;
                if code.is_empty() {
                    return Err(VMError::ContractNotFound);
                }
                run_wasm(host, &code, &input.function)
            })
        }
    };

    let mut h = host.borrow_mut();
    match run {
        Ok(()) => {
            if h.output().return_code() == ReturnCode::Ok {
                h.commit_nested_call();
                Ok(())
            } else {
                log::trace!(
                    "nested call failed: {} ({})",
                    h.output().return_code(),
                    h.output().return_message()
                );
                h.rollback_nested_call();
                Err(VMError::ReturnCodeNotOk)
            }
        }
        Err(err) => {
            h.rollback_nested_call();
            Err(err)
        }
    }
}

/// Compiles and runs one exported function. A trap is not an error by
/// itself: the runtime breakpoint decides the frame's verdict.
fn run_wasm(host: &HostRef, code: &[u8], function: &str) -> Result<(), VMError> {
    let engine = host.borrow().engine().clone();
    let module = engine.compile(code)?;
    let mut instance = engine::instantiate(&engine, host.clone(), &module)?;
    match instance.call_export(function) {
        Ok(()) => Ok(()),
        Err(VMError::ExecutionFailed) => {
            resolve_breakpoint(host);
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Reads and clears the breakpoint of an unwound frame, recording the
/// verdict in the output context.
fn resolve_breakpoint(host: &HostRef) {
    let mut h = host.borrow_mut();
    let breakpoint = h.runtime().breakpoint();
    h.runtime_mut().set_breakpoint(Breakpoint::None);
    log::trace!("resolving breakpoint {:?}", breakpoint);

    match breakpoint {
        Breakpoint::OutOfGas => {
            h.output_mut().set_return_code(ReturnCode::OutOfGas);
            h.output_mut().record_error(VMError::NotEnoughGas);
        }
        Breakpoint::SignalError => {
            h.output_mut().set_return_code(ReturnCode::UserError);
            h.output_mut().set_vm_error(VMError::SignalError);
        }
        Breakpoint::ExecutionFailed => {
            h.output_mut().set_return_code(ReturnCode::ExecutionFailed);
            if h.output().vm_error().is_none() {
                h.output_mut().record_error(VMError::ExecutionFailed);
            }
        }
        Breakpoint::AsyncCall => match h.runtime_mut().take_async_call_info() {
            Some(info) => {
                let sender = h.runtime().sc_address().clone();
                let value = BigInt::from_bytes_be(Sign::Plus, &info.value_bytes);
                if h.output_mut()
                    .transfer_with_data(&sender, &info.destination, &value, info.data, info.gas_limit)
                    .is_err()
                {
                    h.output_mut().set_return_code(ReturnCode::ExecutionFailed);
                    h.output_mut().record_error(VMError::ExecutionFailed);
                }
            }
            None => {
                h.output_mut().set_return_code(ReturnCode::ExecutionFailed);
                h.output_mut().record_error(VMError::UnhandledBreakpoint);
            }
        },
        Breakpoint::None => {
            // A genuine wasm trap with no breakpoint behind it.
            h.output_mut().set_return_code(ReturnCode::ExecutionFailed);
            h.output_mut().record_error(VMError::ExecutionFailed);
        }
    }
}

fn return_code_for_error(err: &VMError) -> ReturnCode {
    match err {
        VMError::FuncNotFound | VMError::InvalidFunctionName => ReturnCode::FunctionNotFound,
        VMError::FuncWrongSignature => ReturnCode::FunctionWrongSignature,
        VMError::InitFuncCalledInRun => ReturnCode::UserError,
        VMError::ContractNotFound => ReturnCode::ContractNotFound,
        VMError::ContractInvalid | VMError::MemoryDeclarationMissing => ReturnCode::ContractInvalid,
        VMError::NotEnoughGas | VMError::MaxGasLimitExceeded => ReturnCode::OutOfGas,
        VMError::SignalError => ReturnCode::UserError,
        _ => ReturnCode::ExecutionFailed,
    }
}
