// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while servicing a contract execution.
///
/// Each variant has a stable identity; callers and tests discriminate on the
/// variant, never on the rendered message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VMError {
    #[error("not enough gas")]
    NotEnoughGas,

    #[error("mem load: bad bounds")]
    MemoryOutOfBounds,

    #[error("wasm memory declaration missing")]
    MemoryDeclarationMissing,

    #[error("invalid function name")]
    InvalidFunctionName,

    #[error("function not found")]
    FuncNotFound,

    #[error("wrong signature for function")]
    FuncWrongSignature,

    #[error("it is not allowed to call init in run")]
    InitFuncCalledInRun,

    #[error("execution failed")]
    ExecutionFailed,

    #[error("unhandled runtime breakpoint")]
    UnhandledBreakpoint,

    #[error("error signalled by smartcontract")]
    SignalError,

    #[error("invalid API call")]
    InvalidAPICall,

    #[error("invalid argument")]
    InvalidArgument,

    #[error("no big int under the given handle")]
    NoBigIntUnderThisHandle,

    #[error("no elliptic curve under the given handle")]
    NoEllipticCurveUnderThisHandle,

    #[error("invalid public key size")]
    InvalidPublicKeySize,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("point is not on curve")]
    PointNotOnCurve,

    #[error("buffer not big enough")]
    BufNotBigEnough,

    #[error("state stack underflow")]
    StateStackUnderflow,

    #[error("operation not permitted in read only mode")]
    InvalidCallOnReadOnlyMode,

    #[error("gas schedule change is not allowed while a call is in progress")]
    GasScheduleChangeDuringExecution,

    #[error("invalid contract code")]
    ContractInvalid,

    #[error("contract not found")]
    ContractNotFound,

    #[error("max gas limit exceeded")]
    MaxGasLimitExceeded,

    #[error("return code is not ok")]
    ReturnCodeNotOk,

    #[error("blockchain hook error: {0}")]
    BlockchainHookError(String),
}
