// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The wasmtime boundary: module compilation, export validation, and
//! invocation of contract entry points. Hostcalls never unwind by panicking;
//! a pending breakpoint is turned into a trap at the hostcall boundary, which
//! is where the engine polls.

use wasmtime::{Config, ExternType, Instance, Linker, Module, Store};
use wvm_shared::VMError;

use crate::host::HostRef;
use crate::hostcalls;

/// Names a contract is not allowed to export or call directly.
const RESERVED_FUNCTION_NAMES: &[&str] = &["callBack"];

const MAX_FUNCTION_NAME_LENGTH: usize = 255;

/// A shared module compiler; cheap to clone.
#[derive(Clone)]
pub struct Engine {
    inner: wasmtime::Engine,
}

impl Engine {
    pub fn new() -> Result<Self, VMError> {
        let config = Config::new();
        let inner = wasmtime::Engine::new(&config).map_err(|_| VMError::ExecutionFailed)?;
        Ok(Self { inner })
    }

    /// Compiles contract bytecode; malformed code is a contract-level fault,
    /// not a host fault.
    pub fn compile(&self, code: &[u8]) -> Result<Module, VMError> {
        Module::new(&self.inner, code).map_err(|_| VMError::ContractInvalid)
    }

    pub(crate) fn inner(&self) -> &wasmtime::Engine {
        &self.inner
    }
}

/// One live contract instance bound to a host.
pub struct WasmInstance {
    store: Store<HostRef>,
    instance: Instance,
}

/// Instantiates `module` against the hostcall import set, validating that the
/// contract declares a linear memory.
pub fn instantiate(engine: &Engine, host: HostRef, module: &Module) -> Result<WasmInstance, VMError> {
    let has_memory = module
        .exports()
        .any(|e| e.name() == "memory" && matches!(e.ty(), ExternType::Memory(_)));
    if !has_memory {
        return Err(VMError::MemoryDeclarationMissing);
    }

    let mut store = Store::new(engine.inner(), host);
    let mut linker: Linker<HostRef> = Linker::new(engine.inner());
    hostcalls::register(&mut linker).map_err(|_| VMError::ExecutionFailed)?;
    let instance = linker
        .instantiate(&mut store, module)
        .map_err(|_| VMError::ContractInvalid)?;

    Ok(WasmInstance { store, instance })
}

impl WasmInstance {
    pub fn has_export(&mut self, name: &str) -> bool {
        self.instance.get_func(&mut self.store, name).is_some()
    }

    /// Runs an exported no-arg function to completion or to a trap. A trap is
    /// reported as `ExecutionFailed`; the caller resolves the actual outcome
    /// from the runtime context's breakpoint.
    pub fn call_export(&mut self, name: &str) -> Result<(), VMError> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or(VMError::FuncNotFound)?;
        let func = func
            .typed::<(), ()>(&self.store)
            .map_err(|_| VMError::FuncWrongSignature)?;
        func.call(&mut self.store, ()).map_err(|err| {
            log::trace!("contract trapped: {:#}", err);
            VMError::ExecutionFailed
        })
    }
}

/// Validates a caller-supplied function name before looking it up in the
/// exports.
pub fn validate_function_name(name: &str) -> Result<(), VMError> {
    if name.is_empty()
        || name.len() > MAX_FUNCTION_NAME_LENGTH
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        || RESERVED_FUNCTION_NAMES.contains(&name)
    {
        return Err(VMError::InvalidFunctionName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_names_are_validated() {
        assert!(validate_function_name("transfer").is_ok());
        assert!(validate_function_name("do_work_2").is_ok());
        assert_eq!(
            validate_function_name(""),
            Err(VMError::InvalidFunctionName)
        );
        assert_eq!(
            validate_function_name("callBack"),
            Err(VMError::InvalidFunctionName)
        );
        assert_eq!(
            validate_function_name("bad name"),
            Err(VMError::InvalidFunctionName)
        );
        let long = "f".repeat(256);
        assert_eq!(
            validate_function_name(&long),
            Err(VMError::InvalidFunctionName)
        );
    }
}
