// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use thiserror::Error;

/// Faults that terminate the request loop. There is no recovery from any of
/// these: the loop ends and the error propagates to whoever spawned the host.
#[derive(Error, Debug)]
pub enum CriticalError {
    #[error("cannot receive message")]
    CannotReceiveMessage(#[source] std::io::Error),

    #[error("cannot send message")]
    CannotSendMessage(#[source] std::io::Error),

    #[error("invalid message framing")]
    InvalidMessageFraming,

    #[error("invalid dialogue nonce")]
    InvalidDialogueNonce,

    #[error("bad message from node")]
    BadMessageFromNode,

    #[error("vm will stop, as requested")]
    StopRequested,
}

impl CriticalError {
    /// Whether the loop ended because the node asked it to, rather than
    /// because something went wrong.
    pub fn is_stop_request(&self) -> bool {
        matches!(self, CriticalError::StopRequested)
    }
}
