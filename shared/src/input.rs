// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::Address;

/// The per-frame slice of the incoming call, as seen by the runtime context.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VMInput {
    pub caller_addr: Address,
    pub arguments: Vec<Vec<u8>>,
    pub call_value: BigInt,
    pub gas_price: u64,
    pub gas_provided: u64,
    pub current_tx_hash: Vec<u8>,
    pub original_tx_hash: Vec<u8>,
}

/// Input for invoking a named function of an already-deployed contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCallInput {
    pub vm_input: VMInput,
    pub recipient_addr: Address,
    pub function: String,
}

/// Input for deploying a new contract; the host runs its `init` export.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCreateInput {
    pub vm_input: VMInput,
    pub contract_code: Vec<u8>,
}

/// A pending asynchronous call registered by the running contract. The frame
/// ends at the `AsyncCall` breakpoint and the call is surfaced to the node as
/// an outgoing transfer carrying the payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncCallInfo {
    pub destination: Address,
    pub data: Vec<u8>,
    pub gas_limit: u64,
    pub value_bytes: Vec<u8>,
}

/// Static host configuration, fixed for the lifetime of one host instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostParameters {
    pub vm_type: Vec<u8>,
    pub block_gas_limit: u64,
}

impl Default for HostParameters {
    fn default() -> Self {
        Self {
            vm_type: vec![5, 0],
            block_gas_limit: 10_000_000,
        }
    }
}
