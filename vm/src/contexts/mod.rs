// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The per-execution state of the host, split into contexts that each own one
//! facet: the running frame, gas, managed types, output, and storage. Every
//! context carries its own snapshot stack; the host pushes and pops them as a
//! group so nested calls commit or roll back atomically.

mod managed_type;
mod metering;
mod output;
mod runtime;
mod storage;

pub use managed_type::{ManagedTypeContext, MAX_BIG_INT_BYTE_LEN_FOR_NORMAL_COST};
pub use metering::MeteringContext;
pub use output::OutputContext;
pub use runtime::RuntimeContext;
pub use storage::{StorageContext, StorageStatus};

/// The uniform snapshot lifecycle every context implements.
///
/// Popping an empty stack is a no-op, which tolerates redundant cleanup
/// paths. The host guarantees the five operations are issued on all contexts
/// together, in a fixed order, so the stacks always share the same depth.
pub trait StateStackable {
    /// Resets to a clean empty state at the start of a top-level execution.
    fn init_state(&mut self);

    /// Clones the mutable slice of the state and pushes it on the stack.
    fn push_state(&mut self);

    /// Pops the top snapshot and replaces the current state with it
    /// (rollback).
    fn pop_set_active_state(&mut self);

    /// Pops the top snapshot and drops it (commit).
    fn pop_discard(&mut self);

    /// Drops all snapshots.
    fn clear_state_stack(&mut self);
}
