// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! End-to-end executions: real wasm contracts driven through the public host
//! facade against an in-memory blockchain.

use pretty_assertions::assert_eq;
use wvm::{Host, MockBlockchain};
use wvm_shared::gas_schedule::GasSchedule;
use wvm_shared::input::{ContractCallInput, ContractCreateInput, HostParameters, VMInput};
use wvm_shared::{ReturnCode, VMError};

const ECHO_CONTRACT: &str = r#"
(module
  (import "env" "finish" (func $finish (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "hi")
  (func (export "init"))
  (func (export "echo")
    (call $finish (i32.const 0) (i32.const 2))))
"#;

const SIGNAL_CONTRACT: &str = r#"
(module
  (import "env" "signalError" (func $signalError (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "oops")
  (func (export "init"))
  (func (export "fail")
    (call $signalError (i32.const 0) (i32.const 4))))
"#;

const STORAGE_CONTRACT: &str = r#"
(module
  (import "env" "storageStore" (func $store (param i32 i32 i32 i32) (result i32)))
  (import "env" "storageLoad" (func $load (param i32 i32 i32) (result i32)))
  (import "env" "finish" (func $finish (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "key!")
  (data (i32.const 8) "value")
  (func (export "init"))
  (func (export "roundtrip")
    (drop (call $store (i32.const 0) (i32.const 4) (i32.const 8) (i32.const 5)))
    (drop (call $load (i32.const 0) (i32.const 4) (i32.const 64)))
    (call $finish (i32.const 64) (i32.const 5))))
"#;

const PARENT_CONTRACT: &str = r#"
(module
  (import "env" "executeOnDestContext"
    (func $exec (param i64 i32 i32 i32 i32 i32 i32 i32) (result i32)))
  (memory (export "memory") 1)
  (data (i32.const 0)
    "\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02\02")
  (data (i32.const 64) "childFn")
  (func (export "init"))
  (func (export "parentFn")
    (drop (call $exec
      (i64.const 100000)
      (i32.const 0)   ;; child address
      (i32.const 32)  ;; zero call value
      (i32.const 64) (i32.const 7)
      (i32.const 0) (i32.const 100) (i32.const 100)))))
"#;

const CHILD_CONTRACT: &str = r#"
(module
  (import "env" "finish" (func $finish (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "pong")
  (func (export "init"))
  (func (export "childFn")
    (call $finish (i32.const 0) (i32.const 4))))
"#;

fn contract_address(tag: u8) -> Vec<u8> {
    vec![tag; 32]
}

fn host_with(contracts: &[(Vec<u8>, &str)]) -> Host {
    let mut world = MockBlockchain::new();
    for (address, code) in contracts {
        world.set_code(address.clone(), code.as_bytes().to_vec());
    }
    Host::new(
        Box::new(world),
        HostParameters::default(),
        GasSchedule::dummy(),
    )
    .unwrap()
}

fn call(recipient: Vec<u8>, function: &str, gas: u64) -> ContractCallInput {
    ContractCallInput {
        vm_input: VMInput {
            caller_addr: contract_address(9),
            gas_provided: gas,
            ..Default::default()
        },
        recipient_addr: recipient,
        function: function.to_string(),
    }
}

#[test]
fn a_contract_can_return_data() {
    let address = contract_address(1);
    let host = host_with(&[(address.clone(), ECHO_CONTRACT)]);

    let output = host.run_contract_call(&call(address, "echo", 10_000));
    assert_eq!(output.return_code, ReturnCode::Ok);
    assert_eq!(output.return_data, vec![b"hi".to_vec()]);
    assert!(output.gas_remaining < 10_000);
}

#[test]
fn signal_error_becomes_a_user_error() {
    let address = contract_address(1);
    let host = host_with(&[(address.clone(), SIGNAL_CONTRACT)]);

    let output = host.run_contract_call(&call(address, "fail", 10_000));
    assert_eq!(output.return_code, ReturnCode::UserError);
    assert_eq!(output.return_message, "oops");
    assert!(output.return_data.is_empty());
}

#[test]
fn running_out_of_gas_fails_the_frame() {
    let address = contract_address(1);
    let host = host_with(&[(address.clone(), ECHO_CONTRACT)]);

    // finish costs 1 + 2 bytes of data copy under the dummy schedule.
    let output = host.run_contract_call(&call(address, "echo", 2));
    assert_eq!(output.return_code, ReturnCode::OutOfGas);
    assert_eq!(output.vm_error, Some(VMError::NotEnoughGas));
    assert!(output.return_data.is_empty());
}

#[test]
fn missing_function_is_reported() {
    let address = contract_address(1);
    let host = host_with(&[(address.clone(), ECHO_CONTRACT)]);

    let output = host.run_contract_call(&call(address, "nope", 10_000));
    assert_eq!(output.return_code, ReturnCode::FunctionNotFound);
    assert_eq!(output.vm_error, Some(VMError::FuncNotFound));
}

#[test]
fn calling_init_from_run_is_rejected() {
    let address = contract_address(1);
    let host = host_with(&[(address.clone(), ECHO_CONTRACT)]);

    let output = host.run_contract_call(&call(address, "init", 10_000));
    assert_eq!(output.return_code, ReturnCode::UserError);
    assert_eq!(output.vm_error, Some(VMError::InitFuncCalledInRun));
}

#[test]
fn unknown_contract_is_reported() {
    let host = host_with(&[]);
    let output = host.run_contract_call(&call(contract_address(1), "echo", 10_000));
    assert_eq!(output.return_code, ReturnCode::ContractNotFound);
}

#[test]
fn a_module_without_memory_is_invalid() {
    let address = contract_address(1);
    let host = host_with(&[(
        address.clone(),
        r#"(module (func (export "init")) (func (export "echo")))"#,
    )]);

    let output = host.run_contract_call(&call(address, "echo", 10_000));
    assert_eq!(output.return_code, ReturnCode::ContractInvalid);
    assert_eq!(output.vm_error, Some(VMError::MemoryDeclarationMissing));
}

#[test]
fn storage_writes_round_trip_within_a_frame() {
    let address = contract_address(1);
    let host = host_with(&[(address.clone(), STORAGE_CONTRACT)]);

    let output = host.run_contract_call(&call(address.clone(), "roundtrip", 100_000));
    assert_eq!(output.return_code, ReturnCode::Ok);
    assert_eq!(output.return_data, vec![b"value".to_vec()]);

    let account = output
        .output_accounts
        .iter()
        .find(|a| a.address == address)
        .expect("storage account present");
    assert_eq!(account.storage_updates.len(), 1);
    assert_eq!(account.storage_updates[0].offset, b"key!".to_vec());
    assert_eq!(account.storage_updates[0].data, b"value".to_vec());
}

#[test]
fn nested_calls_publish_child_effects_on_commit() {
    let parent = contract_address(1);
    let child = contract_address(2);
    let host = host_with(&[
        (parent.clone(), PARENT_CONTRACT),
        (child.clone(), CHILD_CONTRACT),
    ]);

    let output = host.run_contract_call(&call(parent, "parentFn", 1_000_000));
    assert_eq!(output.return_code, ReturnCode::Ok);
    // The committed child frame contributed its return data.
    assert_eq!(output.return_data, vec![b"pong".to_vec()]);
}

#[test]
fn deploy_runs_init_and_records_the_code() {
    let host = host_with(&[]);
    let input = ContractCreateInput {
        vm_input: VMInput {
            caller_addr: contract_address(9),
            gas_provided: 1_000_000,
            ..Default::default()
        },
        contract_code: ECHO_CONTRACT.as_bytes().to_vec(),
    };

    let output = host.run_contract_create(&input);
    assert_eq!(output.return_code, ReturnCode::Ok);
    let deployed = output
        .output_accounts
        .iter()
        .find(|a| a.code.is_some())
        .expect("deployed account present");
    assert_eq!(
        deployed.code.as_deref(),
        Some(ECHO_CONTRACT.as_bytes())
    );
}

#[test]
fn gas_schedule_swaps_between_executions() {
    let address = contract_address(1);
    let host = host_with(&[(address.clone(), ECHO_CONTRACT)]);

    let cheap = host.run_contract_call(&call(address.clone(), "echo", 10_000));
    host.gas_schedule_change(GasSchedule::versioned(
        wvm_shared::gas_schedule::GasScheduleVersion::V2,
    ))
    .unwrap();
    let pricey = host.run_contract_call(&call(address, "echo", 10_000));

    assert_eq!(cheap.return_code, ReturnCode::Ok);
    assert_eq!(pricey.return_code, ReturnCode::Ok);
    assert!(pricey.gas_remaining < cheap.gas_remaining);
}
