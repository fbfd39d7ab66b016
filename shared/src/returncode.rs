// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use std::fmt;

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

/// Outcome of one contract invocation, as reported to the node.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, Serialize, Deserialize, Default, Hash,
)]
#[repr(u64)]
pub enum ReturnCode {
    #[default]
    Ok = 0,
    FunctionNotFound = 1,
    FunctionWrongSignature = 2,
    ContractNotFound = 3,
    UserError = 4,
    OutOfGas = 5,
    AccountCollision = 6,
    OutOfFunds = 7,
    CallStackOverflow = 8,
    ContractInvalid = 9,
    ExecutionFailed = 10,
}

impl ReturnCode {
    pub fn message(&self) -> &'static str {
        match self {
            ReturnCode::Ok => "ok",
            ReturnCode::FunctionNotFound => "function not found",
            ReturnCode::FunctionWrongSignature => "wrong signature for function",
            ReturnCode::ContractNotFound => "contract not found",
            ReturnCode::UserError => "user error",
            ReturnCode::OutOfGas => "out of gas",
            ReturnCode::AccountCollision => "account collision",
            ReturnCode::OutOfFunds => "out of funds",
            ReturnCode::CallStackOverflow => "call stack overflow",
            ReturnCode::ContractInvalid => "contract invalid",
            ReturnCode::ExecutionFailed => "execution failed",
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
