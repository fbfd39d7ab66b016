// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! The host-process side of the transport: a two-state request loop. Await a
//! contract request, serve it (hook call-outs run as nested sub-dialogues),
//! answer with exactly one response, reset the dialogue nonce, repeat. Any
//! critical condition ends the loop for good.

use std::cell::RefCell;
use std::io::{Read, Write};
use std::rc::Rc;

use wvm::Host;
use wvm_shared::gas_schedule::GasSchedule;
use wvm_shared::input::{ContractCallInput, ContractCreateInput, HostParameters};
use wvm_shared::output::VMOutput;
use wvm_shared::VMError;

use crate::gateway::BlockchainHookGateway;
use crate::message::{Message, MessageKind};
use crate::messenger::Messenger;
use crate::CriticalError;

pub struct VMPart<R: Read, W: Write> {
    messenger: Rc<RefCell<Messenger<R, W>>>,
    host: Host,
}

impl<R: Read + 'static, W: Write + 'static> VMPart<R, W> {
    pub fn new(
        reader: R,
        writer: W,
        parameters: HostParameters,
        schedule: GasSchedule,
    ) -> Result<Self, VMError> {
        let messenger = Rc::new(RefCell::new(Messenger::new(reader, writer)));
        let gateway = BlockchainHookGateway::new(Rc::clone(&messenger));
        let host = Host::new(Box::new(gateway), parameters, schedule)?;
        Ok(Self { messenger, host })
    }

    /// Runs until a critical condition ends the dialogue; returns that
    /// condition. A best-effort final response carries it to the node.
    pub fn start_loop(&mut self) -> CriticalError {
        let ending = self.run_loop();
        log::info!("request loop ended: {}", ending);

        let farewell = Message::with_error(MessageKind::ContractResponse, ending.to_string());
        if let Err(err) = self.messenger.borrow_mut().send(farewell) {
            log::warn!("could not report the ending condition: {}", err);
        }
        ending
    }

    fn run_loop(&mut self) -> CriticalError {
        loop {
            let request = match self.messenger.borrow_mut().receive() {
                Ok(request) => request,
                Err(err) => return err,
            };

            let response = match request.kind {
                MessageKind::Stop => return CriticalError::StopRequested,
                MessageKind::ContractDeployRequest => match request.decode_payload() {
                    Ok(input) => self.serve_deploy(&input),
                    Err(err) => return err,
                },
                MessageKind::ContractCallRequest => match request.decode_payload() {
                    Ok(input) => self.serve_call(&input),
                    Err(err) => return err,
                },
                MessageKind::DiagnoseWaitRequest => {
                    let mut response = Message::new(MessageKind::DiagnoseWaitResponse);
                    response.payload = request.payload.clone();
                    Ok(response)
                }
                _ => return CriticalError::BadMessageFromNode,
            };

            let response = match response {
                Ok(response) => response,
                Err(err) => return err,
            };
            if let Err(err) = self.messenger.borrow_mut().send(response) {
                return err;
            }
            self.messenger.borrow_mut().reset_nonce();
        }
    }

    fn serve_deploy(&self, input: &ContractCreateInput) -> Result<Message, CriticalError> {
        log::debug!("serving deploy request");
        let output = self.host.run_contract_create(input);
        contract_response(&output)
    }

    fn serve_call(&self, input: &ContractCallInput) -> Result<Message, CriticalError> {
        log::debug!("serving call request: {:?}", input.function);
        let output = self.host.run_contract_call(input);
        contract_response(&output)
    }
}

fn contract_response(output: &VMOutput) -> Result<Message, CriticalError> {
    Message::with_payload(MessageKind::ContractResponse, output)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;
    use wvm_shared::input::VMInput;
    use wvm_shared::ReturnCode;

    use crate::codec;
    use crate::messenger::script_frames;

    use super::*;

    fn call_request(function: &str) -> Message {
        Message::with_payload(
            MessageKind::ContractCallRequest,
            &ContractCallInput {
                vm_input: VMInput {
                    caller_addr: vec![9; 32],
                    gas_provided: 10_000,
                    ..Default::default()
                },
                recipient_addr: vec![1; 32],
                function: function.to_string(),
            },
        )
        .unwrap()
    }

    fn read_all_messages(mut buffer: &[u8]) -> Vec<Message> {
        let mut messages = Vec::new();
        while !buffer.is_empty() {
            messages.push(codec::read_message(&mut buffer).unwrap());
        }
        messages
    }

    #[test]
    fn the_loop_serves_requests_until_stop() {
        // The scripted node sends one call (the code lookup will answer
        // "empty") and then a stop request. The host must answer the call,
        // then acknowledge the stop with its farewell response.
        let mut code_response = Message::with_payload(
            MessageKind::BlockchainGetCodeResponse,
            &crate::message::BytesPayload { data: Vec::new() },
        )
        .unwrap();
        code_response.dialogue_nonce = 1;

        let frames = script_frames(&[
            call_request("transfer"),
            code_response,
            Message::new(MessageKind::Stop),
        ]);

        let writer: Vec<u8> = Vec::new();
        let mut part = VMPart::new(
            Cursor::new(frames),
            writer,
            HostParameters::default(),
            GasSchedule::dummy(),
        )
        .unwrap();

        let ending = part.start_loop();
        assert!(ending.is_stop_request());
    }

    #[test]
    fn a_served_call_produces_one_contract_response() {
        let mut code_response = Message::with_payload(
            MessageKind::BlockchainGetCodeResponse,
            &crate::message::BytesPayload { data: Vec::new() },
        )
        .unwrap();
        code_response.dialogue_nonce = 1;

        let frames = script_frames(&[call_request("transfer"), code_response]);
        let mut part = VMPart::new(
            Cursor::new(frames),
            Vec::new(),
            HostParameters::default(),
            GasSchedule::dummy(),
        )
        .unwrap();

        // The loop ends when the scripted input runs dry.
        let ending = part.start_loop();
        assert!(matches!(ending, CriticalError::CannotReceiveMessage(_)));

        let written = part.messenger.borrow().writer().clone();
        let messages = read_all_messages(&written);
        // The hook request, the contract response, and the farewell.
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].kind, MessageKind::BlockchainGetCodeRequest);
        assert_eq!(messages[1].kind, MessageKind::ContractResponse);
        let output: VMOutput = messages[1].decode_payload().unwrap();
        assert_eq!(output.return_code, ReturnCode::ContractNotFound);
        assert_eq!(messages[2].kind, MessageKind::ContractResponse);
    }

    #[test]
    fn unexpected_kinds_end_the_loop() {
        let frames = script_frames(&[Message::new(MessageKind::ContractResponse)]);
        let mut part = VMPart::new(
            Cursor::new(frames),
            Vec::new(),
            HostParameters::default(),
            GasSchedule::dummy(),
        )
        .unwrap();
        assert!(matches!(
            part.start_loop(),
            CriticalError::BadMessageFromNode
        ));
    }
}
