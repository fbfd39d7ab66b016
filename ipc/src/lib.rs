// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The out-of-process mode of the host: a request loop over a pair of
//! uni-directional byte streams. The node sends contract requests; the host
//! services them, issuing synchronous blockchain-hook requests back to the
//! node as sub-dialogues identified by a nonce, and answers with exactly one
//! response per request.

pub mod codec;
pub mod error;
pub mod gateway;
pub mod message;
pub mod messenger;
pub mod part;

pub use error::CriticalError;
pub use message::{Message, MessageKind};
pub use messenger::Messenger;
pub use part::VMPart;
