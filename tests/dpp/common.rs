// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared setup: a Configurator device and an Enrollee device that have
//! completed DPP Authentication

#![allow(dead_code)]

use dpp_engine::{
    Action, AllowedRoles, AuthSession, BootstrapGenParams, ConfigRequestOutcome,
    ConfigRequestParams, ConfiguratorParams, DppConfig, DppConfiguration, DppEngine,
    InitiatorParams, OutgoingFrame,
};

pub const PASSPHRASE: &str = "correct horse battery";
pub const PSK_HEX: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

pub struct Authenticated {
    pub configurator_engine: DppEngine,
    pub enrollee_engine: DppEngine,
    pub configurator: AuthSession,
    pub enrollee: AuthSession,
}

pub fn engine(allowed_roles: AllowedRoles) -> DppEngine {
    DppEngine::new(DppConfig {
        allowed_roles,
        ..Default::default()
    })
    .unwrap()
}

pub fn frame(action: Action) -> OutgoingFrame {
    match action {
        Action::ReplyWithFrame { frame, .. } => frame,
        other => panic!("expected a frame, got {:?}", other),
    }
}

pub fn deliver(session: &mut AuthSession, frame: &OutgoingFrame) -> Action {
    session.handle_incoming(&frame.header(), &frame.attrs)
}

/// Configurator initiates (unilateral) towards an Enrollee after scanning
/// its QR code; `slots` become the Configurator's default parameters
pub fn authenticate(slots: &[DppConfiguration], send_conn_status: bool) -> Authenticated {
    let mut configurator_engine = engine(AllowedRoles::Configurator);
    let mut enrollee_engine = engine(AllowedRoles::Enrollee);

    let conf_id = configurator_engine.configurator_add(None, None, None).unwrap();
    configurator_engine
        .set_default_configurator_params(ConfiguratorParams {
            configurator_id: conf_id,
            configs: slots.to_vec(),
            send_conn_status,
            akm_use_selector: false,
        })
        .unwrap();

    let own = enrollee_engine
        .bootstrap_gen(&BootstrapGenParams::default())
        .unwrap();
    let uri = enrollee_engine.bootstrap().get_uri(own).unwrap();
    let peer = configurator_engine.add_qr_code(&uri).unwrap();

    let (mut configurator, request) = configurator_engine
        .auth_init(peer.id, None, &InitiatorParams::default())
        .unwrap();
    let (mut enrollee, action) = enrollee_engine
        .auth_req_rx(&request.header(), &request.attrs)
        .unwrap();
    let confirm = frame(deliver(&mut configurator, &frame(action)));
    match deliver(&mut enrollee, &confirm) {
        Action::SessionComplete(Ok(())) => {}
        other => panic!("authentication failed: {:?}", other),
    }

    Authenticated {
        configurator_engine,
        enrollee_engine,
        configurator,
        enrollee,
    }
}

/// Run one Configuration Request through the Configurator and return the
/// GAS response frame
pub fn request_config(pair: &mut Authenticated, params: &ConfigRequestParams) -> Vec<u8> {
    let request = pair.enrollee.build_config_request(params).unwrap();
    match pair.configurator.config_request_rx(&request).unwrap() {
        ConfigRequestOutcome::Response { frame, .. } => frame,
        other => panic!("expected a response, got {:?}", other),
    }
}
