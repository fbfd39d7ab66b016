// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::{Address, ReturnCode, VMError};

/// One storage cell modified during execution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUpdate {
    pub offset: Vec<u8>,
    pub data: Vec<u8>,
}

/// A log record emitted by the contract: indexed topics plus opaque data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<Vec<u8>>,
    pub data: Vec<u8>,
}

/// An outgoing value transfer, possibly carrying call data (async calls).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTransfer {
    pub value: BigInt,
    pub data: Vec<u8>,
    pub gas_limit: u64,
    pub sender_address: Address,
}

/// Net effect of the execution on one account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputAccount {
    pub address: Address,
    pub balance_delta: BigInt,
    pub storage_updates: Vec<StorageUpdate>,
    pub code: Option<Vec<u8>>,
    pub output_transfers: Vec<OutputTransfer>,
}

impl OutputAccount {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }
}

/// Everything the node needs to apply (or reject) one contract execution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VMOutput {
    pub return_data: Vec<Vec<u8>>,
    pub return_code: ReturnCode,
    pub return_message: String,
    pub vm_error: Option<VMError>,
    pub gas_remaining: u64,
    pub gas_refund: u64,
    pub output_accounts: Vec<OutputAccount>,
    pub deleted_accounts: Vec<Address>,
    pub logs: Vec<LogEntry>,
}

impl VMOutput {
    /// Output for a frame that failed before or during execution: the
    /// accumulated effects are dropped, only the verdict survives.
    pub fn from_error(return_code: ReturnCode, err: VMError) -> Self {
        VMOutput {
            return_code,
            return_message: err.to_string(),
            vm_error: Some(err),
            ..Default::default()
        }
    }
}
