// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The gas schedule: a static cost table mapping operation categories to
//! integer costs, grouped in named sections. Schedules are immutable while a
//! call is in progress; the host swaps them atomically between executions.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Costs for raw data movement and persistence, billed per byte.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseOperationCost {
    pub store_per_byte: u64,
    pub release_per_byte: u64,
    pub data_copy_per_byte: u64,
    pub persist_per_byte: u64,
    pub compile_per_byte: u64,
}

/// Fixed costs for the protocol-level hostcalls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseOpsAPICost {
    pub get_caller: u64,
    pub get_call_value: u64,
    #[serde(rename = "GetSCAddress")]
    pub get_sc_address: u64,
    pub get_argument: u64,
    pub get_function: u64,
    pub get_gas_left: u64,
    pub get_block_info: u64,
    pub get_original_tx_hash: u64,
    pub storage_store: u64,
    pub storage_load: u64,
    pub finish: u64,
    pub log: u64,
    pub signal_error: u64,
    pub transfer_value: u64,
    pub async_call_step: u64,
    pub async_callback_gas_lock: u64,
    pub create_contract: u64,
    pub execute_on_dest_context: u64,
}

/// Fixed costs for the big-integer hostcalls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BigIntAPICost {
    pub big_int_new: u64,
    pub big_int_byte_length: u64,
    pub big_int_get_bytes: u64,
    pub big_int_set_bytes: u64,
    pub big_int_get_int64: u64,
    pub big_int_set_int64: u64,
    pub big_int_add: u64,
    pub big_int_sub: u64,
    pub big_int_mul: u64,
    pub big_int_cmp: u64,
    pub big_int_finish: u64,
    pub elliptic_curve_new: u64,
}

/// Fixed costs for the cryptographic hostcalls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CryptoAPICost {
    #[serde(rename = "SHA256")]
    pub sha256: u64,
    pub keccak256: u64,
    pub ripemd160: u64,
    #[serde(rename = "VerifyBLS")]
    pub verify_bls: u64,
    pub verify_ed25519: u64,
    pub verify_secp256k1: u64,
}

/// The complete cost table. Serialized as nested sections of named integer
/// costs, loadable from a file at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GasSchedule {
    pub base_operation_cost: BaseOperationCost,
    #[serde(rename = "BaseOpsAPICost")]
    pub base_ops_api_cost: BaseOpsAPICost,
    #[serde(rename = "BigIntAPICost")]
    pub big_int_api_cost: BigIntAPICost,
    #[serde(rename = "CryptoAPICost")]
    pub crypto_api_cost: CryptoAPICost,
}

/// Selectable schedule revisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GasScheduleVersion {
    V1,
    V2,
}

lazy_static! {
    static ref GAS_SCHEDULE_V1: GasSchedule = GasSchedule {
        base_operation_cost: BaseOperationCost {
            store_per_byte: 50_000,
            release_per_byte: 25_000,
            data_copy_per_byte: 50,
            persist_per_byte: 10_000,
            compile_per_byte: 300,
        },
        base_ops_api_cost: BaseOpsAPICost {
            get_caller: 100,
            get_call_value: 100,
            get_sc_address: 100,
            get_argument: 100,
            get_function: 100,
            get_gas_left: 100,
            get_block_info: 100,
            get_original_tx_hash: 100,
            storage_store: 75_000,
            storage_load: 50_000,
            finish: 100,
            log: 10_000,
            signal_error: 100,
            transfer_value: 100_000,
            async_call_step: 100_000,
            async_callback_gas_lock: 4_000_000,
            create_contract: 300_000,
            execute_on_dest_context: 100_000,
        },
        big_int_api_cost: BigIntAPICost {
            big_int_new: 2_000,
            big_int_byte_length: 2_000,
            big_int_get_bytes: 2_000,
            big_int_set_bytes: 2_000,
            big_int_get_int64: 2_000,
            big_int_set_int64: 2_000,
            big_int_add: 2_000,
            big_int_sub: 2_000,
            big_int_mul: 6_000,
            big_int_cmp: 2_000,
            big_int_finish: 1_000,
            elliptic_curve_new: 10_000,
        },
        crypto_api_cost: CryptoAPICost {
            sha256: 1_000_000,
            keccak256: 1_000_000,
            ripemd160: 1_000_000,
            verify_bls: 5_000_000,
            verify_ed25519: 2_000_000,
            verify_secp256k1: 2_000_000,
        },
    };
    static ref GAS_SCHEDULE_V2: GasSchedule = GasSchedule {
        base_operation_cost: BaseOperationCost {
            store_per_byte: 10_000,
            release_per_byte: 5_000,
            data_copy_per_byte: 50,
            persist_per_byte: 1_000,
            compile_per_byte: 300,
        },
        base_ops_api_cost: BaseOpsAPICost {
            get_caller: 100,
            get_call_value: 100,
            get_sc_address: 100,
            get_argument: 100,
            get_function: 100,
            get_gas_left: 100,
            get_block_info: 100,
            get_original_tx_hash: 100,
            storage_store: 50_000,
            storage_load: 10_000,
            finish: 100,
            log: 10_000,
            signal_error: 100,
            transfer_value: 100_000,
            async_call_step: 100_000,
            async_callback_gas_lock: 4_000_000,
            create_contract: 300_000,
            execute_on_dest_context: 100_000,
        },
        big_int_api_cost: BigIntAPICost {
            big_int_new: 2_000,
            big_int_byte_length: 2_000,
            big_int_get_bytes: 2_000,
            big_int_set_bytes: 2_000,
            big_int_get_int64: 2_000,
            big_int_set_int64: 2_000,
            big_int_add: 2_000,
            big_int_sub: 2_000,
            big_int_mul: 6_000,
            big_int_cmp: 2_000,
            big_int_finish: 1_000,
            elliptic_curve_new: 10_000,
        },
        crypto_api_cost: CryptoAPICost {
            sha256: 100_000,
            keccak256: 100_000,
            ripemd160: 100_000,
            verify_bls: 5_000_000,
            verify_ed25519: 2_000_000,
            verify_secp256k1: 2_000_000,
        },
    };
}

impl GasSchedule {
    /// One of the embedded production schedules.
    pub fn versioned(version: GasScheduleVersion) -> GasSchedule {
        match version {
            GasScheduleVersion::V1 => GAS_SCHEDULE_V1.clone(),
            GasScheduleVersion::V2 => GAS_SCHEDULE_V2.clone(),
        }
    }

    /// A schedule where every cost is 1, for tests.
    pub fn dummy() -> GasSchedule {
        GasSchedule {
            base_operation_cost: BaseOperationCost {
                store_per_byte: 1,
                release_per_byte: 1,
                data_copy_per_byte: 1,
                persist_per_byte: 1,
                compile_per_byte: 1,
            },
            base_ops_api_cost: BaseOpsAPICost {
                get_caller: 1,
                get_call_value: 1,
                get_sc_address: 1,
                get_argument: 1,
                get_function: 1,
                get_gas_left: 1,
                get_block_info: 1,
                get_original_tx_hash: 1,
                storage_store: 1,
                storage_load: 1,
                finish: 1,
                log: 1,
                signal_error: 1,
                transfer_value: 1,
                async_call_step: 1,
                async_callback_gas_lock: 1,
                create_contract: 1,
                execute_on_dest_context: 1,
            },
            big_int_api_cost: BigIntAPICost {
                big_int_new: 1,
                big_int_byte_length: 1,
                big_int_get_bytes: 1,
                big_int_set_bytes: 1,
                big_int_get_int64: 1,
                big_int_set_int64: 1,
                big_int_add: 1,
                big_int_sub: 1,
                big_int_mul: 1,
                big_int_cmp: 1,
                big_int_finish: 1,
                elliptic_curve_new: 1,
            },
            crypto_api_cost: CryptoAPICost {
                sha256: 1,
                keccak256: 1,
                ripemd160: 1,
                verify_bls: 1,
                verify_ed25519: 1,
                verify_secp256k1: 1,
            },
        }
    }

    /// Loads a schedule from its nested key-value file form.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<GasSchedule> {
        let file = File::open(path.as_ref())?;
        let schedule = serde_json::from_reader(BufReader::new(file))?;
        Ok(schedule)
    }
}
