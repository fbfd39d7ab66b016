// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The host execution core of a WebAssembly smart-contract virtual machine:
//! per-execution contexts with a uniform snapshot protocol, the hostcall
//! bridge exposed to contracts, and the wasmtime integration that runs them.
//!
//! ## Logging
//!
//! This package emits logs using the log façade. Configure the logging backend
//! of your choice during the initialization of the consuming application.

pub use blockchain::{BlockchainHook, MockBlockchain};
pub use host::{DefaultHost, Host, HostRef};

pub mod blockchain;
pub mod contexts;
pub mod engine;
pub mod host;
pub mod hostcalls;
