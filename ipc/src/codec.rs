// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Length-prefixed framing. One frame is a little-endian `u32` body length
//! followed by the body: dialogue nonce, kind, length-prefixed UTF-8 error
//! message, payload bytes. Any framing violation is critical.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_traits::FromPrimitive;

use crate::message::{Message, MessageKind};
use crate::CriticalError;

/// Upper bound on one frame, to keep a corrupt length prefix from allocating
/// unbounded memory.
const MAX_FRAME_LENGTH: u32 = 64 << 20;

const HEADER_LENGTH: u32 = 4 + 4 + 4;

pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> Result<(), CriticalError> {
    let error_bytes = message.error_message.as_bytes();
    let body_length = HEADER_LENGTH as usize + error_bytes.len() + message.payload.len();
    if body_length as u64 > MAX_FRAME_LENGTH as u64 {
        return Err(CriticalError::InvalidMessageFraming);
    }

    let send = |writer: &mut W| -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(body_length as u32)?;
        writer.write_u32::<LittleEndian>(message.dialogue_nonce)?;
        writer.write_u32::<LittleEndian>(message.kind as u32)?;
        writer.write_u32::<LittleEndian>(error_bytes.len() as u32)?;
        writer.write_all(error_bytes)?;
        writer.write_all(&message.payload)?;
        writer.flush()
    };
    send(writer).map_err(CriticalError::CannotSendMessage)
}

pub fn read_message<R: Read>(reader: &mut R) -> Result<Message, CriticalError> {
    let body_length = reader
        .read_u32::<LittleEndian>()
        .map_err(CriticalError::CannotReceiveMessage)?;
    if body_length < HEADER_LENGTH || body_length > MAX_FRAME_LENGTH {
        return Err(CriticalError::InvalidMessageFraming);
    }

    let mut body = vec![0u8; body_length as usize];
    reader
        .read_exact(&mut body)
        .map_err(CriticalError::CannotReceiveMessage)?;
    let mut body = body.as_slice();

    let dialogue_nonce = body
        .read_u32::<LittleEndian>()
        .map_err(|_| CriticalError::InvalidMessageFraming)?;
    let raw_kind = body
        .read_u32::<LittleEndian>()
        .map_err(|_| CriticalError::InvalidMessageFraming)?;
    let kind = MessageKind::from_u32(raw_kind).ok_or(CriticalError::InvalidMessageFraming)?;
    let error_length = body
        .read_u32::<LittleEndian>()
        .map_err(|_| CriticalError::InvalidMessageFraming)? as usize;
    if error_length > body.len() {
        return Err(CriticalError::InvalidMessageFraming);
    }
    let error_message = String::from_utf8(body[..error_length].to_vec())
        .map_err(|_| CriticalError::InvalidMessageFraming)?;
    let payload = body[error_length..].to_vec();

    Ok(Message {
        dialogue_nonce,
        kind,
        error_message,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn frames_round_trip() {
        let mut message = Message::new(MessageKind::ContractCallRequest);
        message.dialogue_nonce = 3;
        message.error_message = "partial failure".to_string();
        message.payload = b"{\"x\":1}".to_vec();

        let mut buffer = Vec::new();
        write_message(&mut buffer, &message).unwrap();
        let decoded = read_message(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn unknown_kinds_are_critical() {
        let mut buffer = Vec::new();
        write_message(&mut buffer, &Message::new(MessageKind::Stop)).unwrap();
        // Corrupt the kind word (bytes 8..12 of the frame).
        buffer[8] = 0xee;
        buffer[9] = 0xee;
        assert!(matches!(
            read_message(&mut Cursor::new(buffer)),
            Err(CriticalError::InvalidMessageFraming)
        ));
    }

    #[test]
    fn truncated_frames_are_critical() {
        let mut buffer = Vec::new();
        write_message(&mut buffer, &Message::new(MessageKind::Stop)).unwrap();
        buffer.truncate(buffer.len() - 1);
        assert!(matches!(
            read_message(&mut Cursor::new(buffer)),
            Err(CriticalError::CannotReceiveMessage(_))
        ));
    }

    #[test]
    fn oversized_length_prefixes_are_critical() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            read_message(&mut Cursor::new(buffer)),
            Err(CriticalError::InvalidMessageFraming)
        ));
    }
}
