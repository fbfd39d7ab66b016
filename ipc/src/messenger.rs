// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use std::io::{Read, Write};

use crate::codec;
use crate::message::Message;
use crate::CriticalError;

/// Blocking message exchange over the node's pipe pair. Outbound hook
/// requests advance the dialogue nonce; the paired response must echo it.
pub struct Messenger<R: Read, W: Write> {
    reader: R,
    writer: W,
    nonce: u32,
}

impl<R: Read, W: Write> Messenger<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            nonce: 0,
        }
    }

    pub fn receive(&mut self) -> Result<Message, CriticalError> {
        let message = codec::read_message(&mut self.reader)?;
        log::trace!("received {}", message);
        Ok(message)
    }

    pub fn send(&mut self, message: Message) -> Result<(), CriticalError> {
        log::trace!("sending {}", message);
        codec::write_message(&mut self.writer, &message)
    }

    /// One synchronous hook sub-dialogue: sends the request under the next
    /// nonce and blocks for its response. A response under a different nonce,
    /// or of a kind other than the request's paired response, is critical.
    pub fn call_hook(&mut self, mut request: Message) -> Result<Message, CriticalError> {
        self.nonce += 1;
        request.dialogue_nonce = self.nonce;
        let request_kind = request.kind;
        self.send(request)?;

        let response = self.receive()?;
        if response.dialogue_nonce != self.nonce {
            return Err(CriticalError::InvalidDialogueNonce);
        }
        if response.kind as u32 != request_kind as u32 + 1 {
            return Err(CriticalError::BadMessageFromNode);
        }
        Ok(response)
    }

    /// The nonce resets after each served contract request.
    pub fn reset_nonce(&mut self) {
        self.nonce = 0;
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    /// The underlying writer (tests inspect the bytes sent to the node).
    pub fn writer(&self) -> &W {
        &self.writer
    }
}

/// Encodes a sequence of node-side messages, for tests that script the node's
/// half of the dialogue.
#[cfg(test)]
pub(crate) fn script_frames(messages: &[Message]) -> Vec<u8> {
    let mut buffer = Vec::new();
    for message in messages {
        codec::write_message(&mut buffer, message).expect("scripted frame");
    }
    buffer
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use crate::message::{BytesPayload, MessageKind};

    use super::*;

    #[test]
    fn hook_calls_pair_nonces() {
        let mut response = Message::with_payload(
            MessageKind::BlockchainGetCodeResponse,
            &BytesPayload { data: vec![7, 7] },
        )
        .unwrap();
        response.dialogue_nonce = 1;

        let reader = Cursor::new(script_frames(&[response]));
        let mut messenger = Messenger::new(reader, Vec::new());

        let answer = messenger
            .call_hook(Message::new(MessageKind::BlockchainGetCodeRequest))
            .unwrap();
        assert_eq!(answer.dialogue_nonce, 1);
        let payload: BytesPayload = answer.decode_payload().unwrap();
        assert_eq!(payload.data, vec![7, 7]);
    }

    #[test]
    fn mismatched_nonces_are_critical() {
        let mut response = Message::new(MessageKind::BlockchainGetCodeResponse);
        response.dialogue_nonce = 9;

        let reader = Cursor::new(script_frames(&[response]));
        let mut messenger = Messenger::new(reader, Vec::new());

        assert!(matches!(
            messenger.call_hook(Message::new(MessageKind::BlockchainGetCodeRequest)),
            Err(CriticalError::InvalidDialogueNonce)
        ));
    }

    #[test]
    fn unpaired_response_kinds_are_critical() {
        let mut response = Message::new(MessageKind::BlockchainGetBalanceResponse);
        response.dialogue_nonce = 1;

        let reader = Cursor::new(script_frames(&[response]));
        let mut messenger = Messenger::new(reader, Vec::new());

        assert!(matches!(
            messenger.call_hook(Message::new(MessageKind::BlockchainGetCodeRequest)),
            Err(CriticalError::BadMessageFromNode)
        ));
    }

    #[test]
    fn nonces_advance_and_reset() {
        let mut first = Message::new(MessageKind::BlockchainGetNonceResponse);
        first.dialogue_nonce = 1;
        let mut second = Message::new(MessageKind::BlockchainGetNonceResponse);
        second.dialogue_nonce = 2;

        let reader = Cursor::new(script_frames(&[first, second]));
        let mut messenger = Messenger::new(reader, Vec::new());

        messenger
            .call_hook(Message::new(MessageKind::BlockchainGetNonceRequest))
            .unwrap();
        messenger
            .call_hook(Message::new(MessageKind::BlockchainGetNonceRequest))
            .unwrap();
        assert_eq!(messenger.nonce(), 2);
        messenger.reset_nonce();
        assert_eq!(messenger.nonce(), 0);
    }
}
