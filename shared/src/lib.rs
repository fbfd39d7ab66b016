// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Types shared between the wvm host, its IPC layer, and embedders.
//!
//! ## Logging
//!
//! This package emits logs using the log façade. Configure the logging backend
//! of your choice during the initialization of the consuming application.

pub mod crypto;
pub mod error;
pub mod gas_schedule;
pub mod input;
pub mod output;

mod breakpoint;
mod returncode;

pub use breakpoint::Breakpoint;
pub use error::VMError;
pub use returncode::ReturnCode;

/// Length, in bytes, of an account address.
pub const ADDRESS_LENGTH: usize = 32;

/// Length, in bytes, of the big-endian encoding of a call value.
pub const BALANCE_BYTE_LENGTH: usize = 32;

/// Length, in bytes, of a transaction hash.
pub const HASH_LENGTH: usize = 32;

/// A raw account address, as seen by contracts.
pub type Address = Vec<u8>;
