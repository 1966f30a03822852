// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Authentication followed by the Configuration exchange for each AKM family

use dpp_engine::configuration::verify_connector;
use dpp_engine::{
    Akm, AuthState, ConfigRequestParams, ConfigResponseOutcome, DppConfiguration, DppError,
    NetRole,
};

use super::common::{authenticate, request_config, PASSPHRASE, PSK_HEX};

fn received(outcome: ConfigResponseOutcome) -> Vec<dpp_engine::ConfigObject> {
    match outcome {
        ConfigResponseOutcome::Received(objects) => objects,
        other => panic!("expected configuration objects, got {:?}", other),
    }
}

#[test]
fn test_legacy_passphrase_object() {
    let slot = DppConfiguration::new(NetRole::Sta, Akm::Psk, "home").with_passphrase(PASSPHRASE);
    let mut pair = authenticate(&[slot], false);

    let response = request_config(&mut pair, &ConfigRequestParams::default());
    let objects = received(pair.enrollee.config_response_rx(&response).unwrap());

    assert_eq!(objects.len(), 1);
    let obj = &objects[0];
    assert_eq!(obj.akm, Akm::Psk);
    assert_eq!(obj.ssid_str(), "home");
    assert_eq!(obj.passphrase.as_deref().map(String::as_str), Some(PASSPHRASE));
    assert!(obj.psk.is_none());
    // R2+ peers get a Connector alongside the legacy credential
    assert!(obj.connector.is_some());
    assert_eq!(pair.enrollee.config_objects().len(), 1);
}

#[test]
fn test_legacy_psk_hex_object() {
    let slot = DppConfiguration::new(NetRole::Sta, Akm::Psk, "office").with_psk_hex(PSK_HEX);
    let mut pair = authenticate(&[slot], false);

    let response = request_config(&mut pair, &ConfigRequestParams::default());
    let objects = received(pair.enrollee.config_response_rx(&response).unwrap());

    let obj = &objects[0];
    assert!(obj.passphrase.is_none());
    assert_eq!(obj.psk_hex().as_deref().map(String::as_str), Some(PSK_HEX));
}

#[test]
fn test_psk_sae_passphrase_round_trip() {
    let slot =
        DppConfiguration::new(NetRole::Sta, Akm::PskSae, "home").with_passphrase(PASSPHRASE);
    let mut pair = authenticate(&[slot], false);

    let response = request_config(&mut pair, &ConfigRequestParams::default());
    let objects = received(pair.enrollee.config_response_rx(&response).unwrap());
    let obj = &objects[0];
    assert_eq!(obj.akm, Akm::PskSae);
    assert_eq!(obj.akm.as_str(), "psk+sae");
    assert_eq!(obj.passphrase.as_deref().map(String::as_str), Some(PASSPHRASE));
}

#[test]
fn test_dpp_connector_object() {
    let slot = DppConfiguration::new(NetRole::Sta, Akm::Dpp, "mesh");
    let mut pair = authenticate(&[slot], false);

    let response = request_config(&mut pair, &ConfigRequestParams::default());
    let objects = received(pair.enrollee.config_response_rx(&response).unwrap());
    let obj = &objects[0];
    assert_eq!(obj.akm, Akm::Dpp);
    assert!(obj.passphrase.is_none());

    // Connector verifies under the Configurator's C-sign key and names the
    // Enrollee's protocol key
    let csign = obj.c_sign_key.clone().unwrap();
    let conf = pair.configurator_engine.configurator(1).unwrap();
    assert_eq!(csign, conf.csign_public());
    assert!(obj.pp_key.is_some());

    let verified = verify_connector(&csign, obj.connector.as_deref().unwrap()).unwrap();
    assert_eq!(verified.payload.groups[0].group_id, "*");
    assert_eq!(verified.payload.groups[0].net_role, "sta");

    let nak = obj.net_access_key.as_ref().unwrap().public_key();
    assert_eq!(Some(&nak), pair.configurator.peer_protocol_key());
}

#[test]
fn test_two_slots_for_requested_role() {
    let slots = [
        DppConfiguration::new(NetRole::Sta, Akm::Dpp, "primary"),
        DppConfiguration::new(NetRole::Sta, Akm::Sae, "fallback").with_passphrase(PASSPHRASE),
        DppConfiguration::new(NetRole::Ap, Akm::Dpp, "backhaul"),
    ];
    let mut pair = authenticate(&slots, false);

    let response = request_config(&mut pair, &ConfigRequestParams::default());
    let objects = received(pair.enrollee.config_response_rx(&response).unwrap());
    let ssids: Vec<String> = objects.iter().map(|o| o.ssid_str()).collect();
    assert_eq!(ssids, vec!["primary", "fallback"]);
    assert_eq!(objects[1].akm, Akm::Sae);
}

#[test]
fn test_ap_role_gets_its_own_slot() {
    let slots = [
        DppConfiguration::new(NetRole::Sta, Akm::Dpp, "client-net"),
        DppConfiguration::new(NetRole::Ap, Akm::Dpp, "backhaul"),
    ];
    let mut pair = authenticate(&slots, false);

    let params = ConfigRequestParams {
        netrole: NetRole::Ap,
        ..Default::default()
    };
    let response = request_config(&mut pair, &params);
    let objects = received(pair.enrollee.config_response_rx(&response).unwrap());
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].ssid_str(), "backhaul");

    let csign = objects[0].c_sign_key.clone().unwrap();
    let verified = verify_connector(&csign, objects[0].connector.as_deref().unwrap()).unwrap();
    assert_eq!(verified.payload.groups[0].net_role, "ap");
}

#[test]
fn test_missing_slot_is_configure_failure() {
    let slot = DppConfiguration::new(NetRole::Sta, Akm::Dpp, "client-net");
    let mut pair = authenticate(&[slot], false);

    let params = ConfigRequestParams {
        netrole: NetRole::Ap,
        ..Default::default()
    };
    let response = request_config(&mut pair, &params);
    let err = pair.enrollee.config_response_rx(&response).unwrap_err();
    assert_eq!(
        err,
        DppError::ConfigurationFailed("Configurator rejected configuration".to_string())
    );
    assert_eq!(pair.enrollee.state(), AuthState::Failed);
}

#[test]
fn test_response_needs_outstanding_request() {
    let slot = DppConfiguration::new(NetRole::Sta, Akm::Dpp, "client-net");
    let mut pair = authenticate(&[slot], false);

    let response = request_config(&mut pair, &ConfigRequestParams::default());
    // Configurator side cannot consume a response
    assert!(matches!(
        pair.configurator.config_response_rx(&response),
        Err(DppError::InvalidState(_))
    ));
}

#[test]
fn test_tampered_response_fails_unwrap() {
    let slot = DppConfiguration::new(NetRole::Sta, Akm::Dpp, "client-net");
    let mut pair = authenticate(&[slot], false);

    let mut response = request_config(&mut pair, &ConfigRequestParams::default());
    if let Some(last) = response.last_mut() {
        *last ^= 0x01;
    }
    assert_eq!(
        pair.enrollee.config_response_rx(&response).unwrap_err(),
        DppError::AeadAuthFailure
    );
    assert!(pair.enrollee.ke().is_none());
}
