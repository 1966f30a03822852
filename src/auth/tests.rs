// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::Arc;

use super::fault::{MockFaultInjector, TagCorruptor};
use super::*;
use crate::bootstrap::{BootstrapGenParams, BootstrapRegistry};
use crate::error::DppError;

struct Device {
    registry: BootstrapRegistry,
    options: SessionOptions,
}

impl Device {
    fn new(allowed_roles: AllowedRoles) -> Self {
        Self {
            registry: BootstrapRegistry::new(ProtocolVersion::LATEST),
            options: SessionOptions {
                allowed_roles,
                ..Default::default()
            },
        }
    }

    fn own_key(&mut self) -> Arc<BootstrapInfo> {
        let id = self
            .registry
            .bootstrap_gen(&BootstrapGenParams::default())
            .unwrap();
        self.registry.get(id).unwrap()
    }

    fn scan(&mut self, peer: &BootstrapInfo) -> Arc<BootstrapInfo> {
        self.registry.add_qr_code(&peer.uri).unwrap()
    }
}

/// Configurator initiates towards an Enrollee, optionally with its own key
fn start(mutual: bool) -> (Device, Device, AuthSession, OutgoingFrame) {
    let mut conf = Device::new(AllowedRoles::Configurator);
    let mut enrollee = Device::new(AllowedRoles::Enrollee);

    let enrollee_key = enrollee.own_key();
    let peer = conf.scan(&enrollee_key);
    let own = if mutual {
        let own = conf.own_key();
        enrollee.scan(&own);
        Some(own)
    } else {
        None
    };

    let (session, request) =
        AuthSession::auth_init(&conf.options, peer, own, &InitiatorParams::default()).unwrap();
    (conf, enrollee, session, request)
}

fn respond(device: &Device, frame: &OutgoingFrame) -> Result<(AuthSession, Action)> {
    auth_req_rx(&device.registry, &device.options, &frame.header(), &frame.attrs)
}

fn reply(action: Action) -> (OutgoingFrame, Option<Result<()>>) {
    match action {
        Action::ReplyWithFrame { frame, completion } => (frame, completion),
        other => panic!("expected a frame, got {:?}", other),
    }
}

fn deliver(session: &mut AuthSession, frame: &OutgoingFrame) -> Action {
    session.handle_incoming(&frame.header(), &frame.attrs)
}

#[test]
fn test_unilateral_authentication() {
    let (_conf, enrollee, mut initiator, request) = start(false);
    assert_eq!(initiator.state(), AuthState::ReqSent);
    assert!(initiator.is_configurator());

    let (mut responder, action) = respond(&enrollee, &request).unwrap();
    let (response, completion) = reply(action);
    assert!(completion.is_none());
    assert_eq!(responder.state(), AuthState::RespSent);
    assert!(!responder.is_configurator());

    let (confirm, completion) = reply(deliver(&mut initiator, &response));
    assert!(matches!(completion, Some(Ok(()))));
    assert_eq!(initiator.state(), AuthState::Success);

    assert!(matches!(
        deliver(&mut responder, &confirm),
        Action::SessionComplete(Ok(()))
    ));
    assert_eq!(responder.state(), AuthState::Success);
    assert!(!initiator.is_mutual());
    assert!(initiator.ke().is_some());
    assert_eq!(initiator.ke(), responder.ke());
    assert_eq!(initiator.peer_version(), ProtocolVersion::LATEST);
}

#[test]
fn test_mutual_authentication() {
    let (_conf, enrollee, mut initiator, request) = start(true);
    let (mut responder, action) = respond(&enrollee, &request).unwrap();
    let (response, _) = reply(action);
    let (confirm, completion) = reply(deliver(&mut initiator, &response));
    assert!(matches!(completion, Some(Ok(()))));
    assert!(matches!(
        deliver(&mut responder, &confirm),
        Action::SessionComplete(Ok(()))
    ));
    assert!(initiator.is_mutual());
    assert!(responder.is_mutual());
    assert_eq!(initiator.ke(), responder.ke());
}

#[test]
fn test_responder_without_peer_key_falls_back_to_unilateral() {
    let mut conf = Device::new(AllowedRoles::Configurator);
    let mut enrollee = Device::new(AllowedRoles::Enrollee);
    let enrollee_key = enrollee.own_key();
    let peer = conf.scan(&enrollee_key);
    let own = conf.own_key();

    let (mut initiator, request) =
        AuthSession::auth_init(&conf.options, peer, Some(own), &InitiatorParams::default())
            .unwrap();
    let (mut responder, action) = respond(&enrollee, &request).unwrap();
    let (response, _) = reply(action);
    let (confirm, completion) = reply(deliver(&mut initiator, &response));
    assert!(matches!(completion, Some(Ok(()))));
    assert!(!initiator.is_mutual());
    assert!(matches!(
        deliver(&mut responder, &confirm),
        Action::SessionComplete(Ok(()))
    ));
}

#[test]
fn test_response_pending_until_qr_code_scanned() {
    let mut conf = Device::new(AllowedRoles::Configurator);
    let mut enrollee = Device::new(AllowedRoles::Enrollee);
    enrollee.options.qr_mutual = true;
    let enrollee_key = enrollee.own_key();
    let peer = conf.scan(&enrollee_key);
    let own = conf.own_key();

    let (mut initiator, request) = AuthSession::auth_init(
        &conf.options,
        peer,
        Some(Arc::clone(&own)),
        &InitiatorParams::default(),
    )
    .unwrap();
    let (mut responder, action) = respond(&enrollee, &request).unwrap();
    let (pending, completion) = reply(action);
    assert!(completion.is_none());
    assert!(responder.is_response_pending());

    assert!(matches!(
        deliver(&mut initiator, &pending),
        Action::AwaitExternalEvent(AwaitReason::PeerResponse)
    ));
    assert!(initiator.is_response_pending());

    // An unrelated key does not resume the session
    let stranger = Device::new(AllowedRoles::Either).own_key();
    assert!(responder.notify_new_qr_code(&stranger).is_none());

    let scanned = enrollee.scan(&own);
    let (response, _) = reply(responder.notify_new_qr_code(&scanned).unwrap());
    assert_eq!(responder.state(), AuthState::RespSent);

    let (confirm, completion) = reply(deliver(&mut initiator, &response));
    assert!(matches!(completion, Some(Ok(()))));
    assert!(matches!(
        deliver(&mut responder, &confirm),
        Action::SessionComplete(Ok(()))
    ));
    assert!(initiator.is_mutual());
    assert_eq!(initiator.ke(), responder.ke());
}

#[test]
fn test_incompatible_roles_reported_to_initiator() {
    let mut a = Device::new(AllowedRoles::Configurator);
    let mut b = Device::new(AllowedRoles::Configurator);
    let b_key = b.own_key();
    let peer = a.scan(&b_key);

    let (mut initiator, request) =
        AuthSession::auth_init(&a.options, peer, None, &InitiatorParams::default()).unwrap();
    let (responder, action) = respond(&b, &request).unwrap();
    let (response, completion) = reply(action);
    assert!(matches!(completion, Some(Err(DppError::RoleIncompatible(_)))));
    assert_eq!(responder.state(), AuthState::Failed);

    match deliver(&mut initiator, &response) {
        Action::SessionComplete(Err(DppError::RoleIncompatible(_))) => {}
        other => panic!("unexpected action {:?}", other),
    }
    assert_eq!(initiator.state(), AuthState::Failed);
    assert!(initiator.ke().is_none());
}

#[test]
fn test_corrupted_r_auth_answered_with_auth_failure() {
    let (_conf, enrollee, mut initiator, request) = start(false);
    let (mut responder, _) = respond(&enrollee, &request).unwrap();

    // Rebuild the response with a corrupted tag
    responder.set_fault_injector(Box::new(TagCorruptor {
        r_auth: true,
        i_auth: false,
    }));
    let response = responder.build_auth_resp_ok().unwrap();

    let (confirm, completion) = reply(deliver(&mut initiator, &response));
    assert!(matches!(completion, Some(Err(DppError::AuthFailure(_)))));
    assert_eq!(
        initiator.failure_reason(),
        Some("Mismatching Responder Authenticating Tag")
    );
    assert!(initiator.ke().is_none());

    match deliver(&mut responder, &confirm) {
        Action::SessionComplete(Err(DppError::AuthFailure(_))) => {}
        other => panic!("unexpected action {:?}", other),
    }
    assert_eq!(responder.state(), AuthState::Failed);
}

#[test]
fn test_corrupted_i_auth_drops_responder() {
    let mut conf = Device::new(AllowedRoles::Configurator);
    let mut enrollee = Device::new(AllowedRoles::Enrollee);
    let enrollee_key = enrollee.own_key();
    let peer = conf.scan(&enrollee_key);

    let (mut initiator, request) =
        AuthSession::auth_init(&conf.options, peer, None, &InitiatorParams::default()).unwrap();

    let mut fault = MockFaultInjector::new();
    fault
        .expect_tamper_i_auth()
        .times(1)
        .returning(|tag: &mut [u8]| tag[0] ^= 0xff);
    fault
        .expect_tamper_outgoing()
        .withf(|frame_type, _| *frame_type == FrameType::AuthenticationConfirm)
        .times(1)
        .returning(|_, _| ());
    initiator.set_fault_injector(Box::new(fault));

    let (mut responder, action) = respond(&enrollee, &request).unwrap();
    let (response, _) = reply(action);
    let (confirm, completion) = reply(deliver(&mut initiator, &response));
    assert!(matches!(completion, Some(Ok(()))));

    match deliver(&mut responder, &confirm) {
        Action::FatalDrop(DppError::AuthFailure(reason)) => {
            assert_eq!(reason, "Mismatching Initiator Authenticating Tag");
        }
        other => panic!("unexpected action {:?}", other),
    }
    assert!(responder.ke().is_none());
}

#[test]
fn test_tampered_wrapped_data_fails_unwrap() {
    let (_conf, enrollee, mut initiator, request) = start(false);
    let (mut responder, _) = respond(&enrollee, &request).unwrap();

    let mut fault = MockFaultInjector::new();
    fault.expect_tamper_r_auth().returning(|_| ());
    fault
        .expect_tamper_outgoing()
        .returning(|_, attrs: &mut Vec<u8>| {
            if let Some(last) = attrs.last_mut() {
                *last ^= 0x80;
            }
        });
    responder.set_fault_injector(Box::new(fault));
    let response = responder.build_auth_resp_ok().unwrap();

    match deliver(&mut initiator, &response) {
        Action::FatalDrop(DppError::AeadAuthFailure) => {}
        other => panic!("unexpected action {:?}", other),
    }
    assert_eq!(initiator.failure_reason(), Some("AES-SIV decryption failed"));
}

#[test]
fn test_request_for_unknown_key_is_ignored() {
    let (_conf, _enrollee, _initiator, request) = start(false);
    let stranger = Device::new(AllowedRoles::Enrollee);
    assert!(matches!(
        respond(&stranger, &request),
        Err(DppError::InvalidState(_))
    ));
}

#[test]
fn test_malformed_header_and_unexpected_frames_ignored() {
    let (_conf, enrollee, mut initiator, request) = start(false);
    assert!(matches!(
        initiator.handle_incoming(&[0x50, 0x6f, 0x9a], &request.attrs),
        Action::AwaitExternalEvent(AwaitReason::PeerFrame)
    ));

    // A Request echoed back to the Initiator is out of place
    assert!(matches!(
        deliver(&mut initiator, &request),
        Action::AwaitExternalEvent(AwaitReason::PeerFrame)
    ));
    assert_eq!(initiator.state(), AuthState::ReqSent);

    let (mut responder, _) = respond(&enrollee, &request).unwrap();
    let mut truncated = request.clone();
    truncated.attrs.truncate(10);
    assert!(matches!(
        deliver(&mut responder, &truncated),
        Action::AwaitExternalEvent(AwaitReason::PeerFrame)
    ));
    assert_eq!(responder.state(), AuthState::RespSent);
}

#[test]
fn test_v1_initiator_omits_version_attribute() {
    let mut conf = Device::new(AllowedRoles::Configurator);
    conf.options.version = ProtocolVersion::V1;
    let mut enrollee = Device::new(AllowedRoles::Enrollee);
    let enrollee_key = enrollee.own_key();
    let peer = conf.scan(&enrollee_key);

    let (_initiator, request) =
        AuthSession::auth_init(&conf.options, peer, None, &InitiatorParams::default()).unwrap();
    let attrs = crate::protocol::Attributes::parse(&request.attrs).unwrap();
    assert!(!attrs.contains(crate::protocol::AttrId::PROTOCOL_VERSION));

    let (responder, _) = respond(&enrollee, &request).unwrap();
    assert_eq!(responder.peer_version(), ProtocolVersion::V1);
}

#[test]
fn test_tampered_confirm_aborts_responder() {
    let (_conf, enrollee, mut initiator, request) = start(true);
    let (mut responder, action) = respond(&enrollee, &request).unwrap();
    let (response, _) = reply(action);
    let (mut confirm, _) = reply(deliver(&mut initiator, &response));

    let last = confirm.attrs.len() - 1;
    confirm.attrs[last] ^= 0x01;
    match deliver(&mut responder, &confirm) {
        Action::FatalDrop(DppError::AeadAuthFailure) => {}
        other => panic!("unexpected action {:?}", other),
    }
    assert_eq!(responder.state(), AuthState::Failed);
    assert_eq!(responder.failure_reason(), Some("AES-SIV decryption failed"));
    assert!(responder.ke().is_none());
}
