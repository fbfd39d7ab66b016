// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The host-side face of the node: implements the blockchain hook by
//! round-tripping each query through the messenger as a nonce-paired
//! sub-dialogue.

use std::cell::RefCell;
use std::io::{Read, Write};
use std::rc::Rc;

use num_bigint::BigInt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use wvm::BlockchainHook;
use wvm_shared::{Address, VMError};

use crate::message::{
    AddressPayload, BigIntPayload, BlockhashPayload, BoolPayload, BytesPayload, Message,
    MessageKind, NewAddressPayload, StorageDataPayload, U64Payload,
};
use crate::messenger::Messenger;

pub struct BlockchainHookGateway<R: Read, W: Write> {
    messenger: Rc<RefCell<Messenger<R, W>>>,
}

impl<R: Read, W: Write> BlockchainHookGateway<R, W> {
    pub fn new(messenger: Rc<RefCell<Messenger<R, W>>>) -> Self {
        Self { messenger }
    }

    fn round_trip<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        kind: MessageKind,
        request: &Req,
    ) -> Result<Resp, VMError> {
        let message = Message::with_payload(kind, request)
            .map_err(|err| VMError::BlockchainHookError(err.to_string()))?;
        let response = self
            .messenger
            .borrow_mut()
            .call_hook(message)
            .map_err(|err| VMError::BlockchainHookError(err.to_string()))?;
        if !response.error_message.is_empty() {
            return Err(VMError::BlockchainHookError(response.error_message));
        }
        response
            .decode_payload()
            .map_err(|err| VMError::BlockchainHookError(err.to_string()))
    }

    fn metadata_u64(&self, kind: MessageKind) -> u64 {
        match self.round_trip::<(), U64Payload>(kind, &()) {
            Ok(payload) => payload.value,
            Err(err) => {
                log::warn!("block metadata hook {:?} failed: {}", kind, err);
                0
            }
        }
    }

    fn metadata_bytes(&self, kind: MessageKind) -> Vec<u8> {
        match self.round_trip::<(), BytesPayload>(kind, &()) {
            Ok(payload) => payload.data,
            Err(err) => {
                log::warn!("block metadata hook {:?} failed: {}", kind, err);
                Vec::new()
            }
        }
    }
}

impl<R: Read, W: Write> BlockchainHook for BlockchainHookGateway<R, W> {
    fn account_exists(&self, address: &[u8]) -> Result<bool, VMError> {
        let response: BoolPayload = self.round_trip(
            MessageKind::BlockchainAccountExistsRequest,
            &AddressPayload {
                address: address.to_vec(),
            },
        )?;
        Ok(response.value)
    }

    fn new_address(&self, creator: &[u8], nonce: u64, vm_type: &[u8]) -> Result<Address, VMError> {
        let response: BytesPayload = self.round_trip(
            MessageKind::BlockchainNewAddressRequest,
            &NewAddressPayload {
                creator: creator.to_vec(),
                nonce,
                vm_type: vm_type.to_vec(),
            },
        )?;
        Ok(response.data)
    }

    fn get_balance(&self, address: &[u8]) -> Result<BigInt, VMError> {
        let response: BigIntPayload = self.round_trip(
            MessageKind::BlockchainGetBalanceRequest,
            &AddressPayload {
                address: address.to_vec(),
            },
        )?;
        Ok(response.value)
    }

    fn get_nonce(&self, address: &[u8]) -> Result<u64, VMError> {
        let response: U64Payload = self.round_trip(
            MessageKind::BlockchainGetNonceRequest,
            &AddressPayload {
                address: address.to_vec(),
            },
        )?;
        Ok(response.value)
    }

    fn get_storage_data(&self, address: &[u8], key: &[u8]) -> Result<Vec<u8>, VMError> {
        let response: BytesPayload = self.round_trip(
            MessageKind::BlockchainGetStorageDataRequest,
            &StorageDataPayload {
                address: address.to_vec(),
                index: key.to_vec(),
            },
        )?;
        Ok(response.data)
    }

    fn is_code_empty(&self, address: &[u8]) -> Result<bool, VMError> {
        let response: BoolPayload = self.round_trip(
            MessageKind::BlockchainIsCodeEmptyRequest,
            &AddressPayload {
                address: address.to_vec(),
            },
        )?;
        Ok(response.value)
    }

    fn get_code(&self, address: &[u8]) -> Result<Vec<u8>, VMError> {
        let response: BytesPayload = self.round_trip(
            MessageKind::BlockchainGetCodeRequest,
            &AddressPayload {
                address: address.to_vec(),
            },
        )?;
        Ok(response.data)
    }

    fn get_blockhash(&self, nonce: u64) -> Result<Vec<u8>, VMError> {
        let response: BytesPayload = self.round_trip(
            MessageKind::BlockchainGetBlockhashRequest,
            &BlockhashPayload { nonce },
        )?;
        Ok(response.data)
    }

    fn last_nonce(&self) -> u64 {
        self.metadata_u64(MessageKind::BlockchainLastNonceRequest)
    }

    fn last_round(&self) -> u64 {
        self.metadata_u64(MessageKind::BlockchainLastRoundRequest)
    }

    fn last_timestamp(&self) -> u64 {
        self.metadata_u64(MessageKind::BlockchainLastTimeStampRequest)
    }

    fn last_epoch(&self) -> u64 {
        self.metadata_u64(MessageKind::BlockchainLastEpochRequest)
    }

    fn last_random_seed(&self) -> Vec<u8> {
        self.metadata_bytes(MessageKind::BlockchainLastRandomSeedRequest)
    }

    fn current_nonce(&self) -> u64 {
        self.metadata_u64(MessageKind::BlockchainCurrentNonceRequest)
    }

    fn current_round(&self) -> u64 {
        self.metadata_u64(MessageKind::BlockchainCurrentRoundRequest)
    }

    fn current_timestamp(&self) -> u64 {
        self.metadata_u64(MessageKind::BlockchainCurrentTimeStampRequest)
    }

    fn current_epoch(&self) -> u64 {
        self.metadata_u64(MessageKind::BlockchainCurrentEpochRequest)
    }

    fn current_random_seed(&self) -> Vec<u8> {
        self.metadata_bytes(MessageKind::BlockchainCurrentRandomSeedRequest)
    }

    fn state_root_hash(&self) -> Vec<u8> {
        self.metadata_bytes(MessageKind::BlockchainGetStateRootHashRequest)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use crate::messenger::script_frames;

    use super::*;

    fn gateway_with(
        frames: Vec<u8>,
    ) -> BlockchainHookGateway<Cursor<Vec<u8>>, Vec<u8>> {
        let messenger = Rc::new(RefCell::new(Messenger::new(Cursor::new(frames), Vec::new())));
        BlockchainHookGateway::new(messenger)
    }

    #[test]
    fn storage_reads_round_trip_through_the_transport() {
        let mut response = Message::with_payload(
            MessageKind::BlockchainGetStorageDataResponse,
            &BytesPayload {
                data: b"stored".to_vec(),
            },
        )
        .unwrap();
        response.dialogue_nonce = 1;

        let gateway = gateway_with(script_frames(&[response]));
        let value = gateway.get_storage_data(&[3; 32], b"key").unwrap();
        assert_eq!(value, b"stored".to_vec());
    }

    #[test]
    fn hook_errors_surface_as_vm_errors() {
        let mut response = Message::with_error(
            MessageKind::BlockchainGetCodeResponse,
            "no such account".to_string(),
        );
        response.dialogue_nonce = 1;

        let gateway = gateway_with(script_frames(&[response]));
        let err = gateway.get_code(&[3; 32]).unwrap_err();
        assert_eq!(
            err,
            VMError::BlockchainHookError("no such account".to_string())
        );
    }
}
