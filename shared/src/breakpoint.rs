// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

/// A typed flag the engine polls at every hostcall boundary to terminate the
/// current frame early. There is a single writable slot per runtime context.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, Serialize, Deserialize, Default, Hash,
)]
#[repr(u64)]
pub enum Breakpoint {
    /// Nothing pending; execution continues.
    #[default]
    None = 0,
    /// A hostcall recorded a fault that must end the frame.
    ExecutionFailed = 1,
    /// The contract registered an asynchronous call and yields.
    AsyncCall = 2,
    /// The contract signalled a user-level error.
    SignalError = 3,
    /// A gas debit underflowed the remaining gas.
    OutOfGas = 4,
}
