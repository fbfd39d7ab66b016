// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use std::fmt;

use num_derive::FromPrimitive;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::CriticalError;

/// The closed enumeration of message kinds on the node↔host transport.
/// Requests and their responses are adjacent; the hook-call range predicates
/// below rely on this ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, FromPrimitive, Hash)]
#[repr(u32)]
pub enum MessageKind {
    FirstKind = 0,
    Stop,
    ContractDeployRequest,
    ContractCallRequest,
    ContractResponse,
    BlockchainAccountExistsRequest,
    BlockchainAccountExistsResponse,
    BlockchainNewAddressRequest,
    BlockchainNewAddressResponse,
    BlockchainGetBalanceRequest,
    BlockchainGetBalanceResponse,
    BlockchainGetNonceRequest,
    BlockchainGetNonceResponse,
    BlockchainGetStorageDataRequest,
    BlockchainGetStorageDataResponse,
    BlockchainIsCodeEmptyRequest,
    BlockchainIsCodeEmptyResponse,
    BlockchainGetCodeRequest,
    BlockchainGetCodeResponse,
    BlockchainGetBlockhashRequest,
    BlockchainGetBlockhashResponse,
    BlockchainLastNonceRequest,
    BlockchainLastNonceResponse,
    BlockchainLastRoundRequest,
    BlockchainLastRoundResponse,
    BlockchainLastTimeStampRequest,
    BlockchainLastTimeStampResponse,
    BlockchainLastRandomSeedRequest,
    BlockchainLastRandomSeedResponse,
    BlockchainLastEpochRequest,
    BlockchainLastEpochResponse,
    BlockchainGetStateRootHashRequest,
    BlockchainGetStateRootHashResponse,
    BlockchainCurrentNonceRequest,
    BlockchainCurrentNonceResponse,
    BlockchainCurrentRoundRequest,
    BlockchainCurrentRoundResponse,
    BlockchainCurrentTimeStampRequest,
    BlockchainCurrentTimeStampResponse,
    BlockchainCurrentRandomSeedRequest,
    BlockchainCurrentRandomSeedResponse,
    BlockchainCurrentEpochRequest,
    BlockchainCurrentEpochResponse,
    DiagnoseWaitRequest,
    DiagnoseWaitResponse,
    LastKind,
}

impl MessageKind {
    pub fn is_hook_call(&self) -> bool {
        (MessageKind::BlockchainAccountExistsRequest..=MessageKind::BlockchainCurrentEpochResponse)
            .contains(self)
    }

    pub fn is_contract_request(&self) -> bool {
        matches!(
            self,
            MessageKind::ContractDeployRequest | MessageKind::ContractCallRequest
        )
    }

    pub fn is_contract_response(&self) -> bool {
        *self == MessageKind::ContractResponse
    }

    pub fn is_stop_request(&self) -> bool {
        *self == MessageKind::Stop
    }

    pub fn is_diagnose(&self) -> bool {
        (MessageKind::DiagnoseWaitRequest..=MessageKind::DiagnoseWaitResponse).contains(self)
    }
}

/// One framed message: the fixed header plus a kind-specific payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub dialogue_nonce: u32,
    pub kind: MessageKind,
    pub error_message: String,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(kind: MessageKind) -> Self {
        Self {
            dialogue_nonce: 0,
            kind,
            error_message: String::new(),
            payload: Vec::new(),
        }
    }

    pub fn with_payload<T: Serialize>(kind: MessageKind, payload: &T) -> Result<Self, CriticalError> {
        let payload = serde_json::to_vec(payload).map_err(|_| CriticalError::BadMessageFromNode)?;
        Ok(Self {
            dialogue_nonce: 0,
            kind,
            error_message: String::new(),
            payload,
        })
    }

    pub fn with_error(kind: MessageKind, error_message: String) -> Self {
        Self {
            dialogue_nonce: 0,
            kind,
            error_message,
            payload: Vec::new(),
        }
    }

    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, CriticalError> {
        serde_json::from_slice(&self.payload).map_err(|_| CriticalError::BadMessageFromNode)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[kind={:?} nonce={} err={}]",
            self.kind, self.dialogue_nonce, self.error_message
        )
    }
}

// Hook-call payloads. Each request kind pairs with the response payload the
// gateway decodes.

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddressPayload {
    pub address: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewAddressPayload {
    pub creator: Vec<u8>,
    pub nonce: u64,
    pub vm_type: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageDataPayload {
    pub address: Vec<u8>,
    pub index: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockhashPayload {
    pub nonce: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoolPayload {
    pub value: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BytesPayload {
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct U64Payload {
    pub value: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BigIntPayload {
    pub value: num_bigint::BigInt,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn hook_call_range_covers_exactly_the_blockchain_kinds() {
        assert!(!MessageKind::Stop.is_hook_call());
        assert!(!MessageKind::ContractResponse.is_hook_call());
        assert!(MessageKind::BlockchainAccountExistsRequest.is_hook_call());
        assert!(MessageKind::BlockchainGetStorageDataResponse.is_hook_call());
        assert!(MessageKind::BlockchainCurrentEpochResponse.is_hook_call());
        assert!(!MessageKind::DiagnoseWaitRequest.is_hook_call());
        assert!(MessageKind::DiagnoseWaitRequest.is_diagnose());
        assert!(!MessageKind::LastKind.is_diagnose());
    }

    #[test]
    fn payloads_round_trip() {
        let message = Message::with_payload(
            MessageKind::BlockchainGetStorageDataRequest,
            &StorageDataPayload {
                address: vec![1; 32],
                index: b"key".to_vec(),
            },
        )
        .unwrap();
        let decoded: StorageDataPayload = message.decode_payload().unwrap();
        assert_eq!(decoded.address, vec![1; 32]);
        assert_eq!(decoded.index, b"key".to_vec());
    }
}
