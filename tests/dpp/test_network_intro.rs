// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Network introduction between a provisioned station and an AP

use dpp_engine::{
    peer_intro, Akm, ConfigObject, ConfigRequestParams, ConfigResponseOutcome, Configurator,
    DppConfiguration, DppError, NetRole,
};

use super::common::{authenticate, request_config, Authenticated};

fn provision_sta(group_id: &str) -> (Authenticated, ConfigObject) {
    let mut slot = DppConfiguration::new(NetRole::Sta, Akm::Dpp, "mesh");
    slot.group_id = Some(group_id.to_string());
    let mut pair = authenticate(&[slot], false);
    let response = request_config(&mut pair, &ConfigRequestParams::default());
    let obj = match pair.enrollee.config_response_rx(&response).unwrap() {
        ConfigResponseOutcome::Received(mut objects) => objects.remove(0),
        other => panic!("expected objects, got {:?}", other),
    };
    (pair, obj)
}

#[test]
fn test_station_and_ap_derive_same_pmk() {
    let (pair, sta) = provision_sta("mesh-1");
    let (ap_connector, ap_key) = pair
        .configurator_engine
        .own_config(1, None, NetRole::Ap, "mesh-1", None)
        .unwrap();

    let csign = sta.c_sign_key.clone().unwrap();
    let sta_connector = sta.connector.as_deref().unwrap();
    let sta_key = sta.net_access_key.as_ref().unwrap();

    let at_sta = peer_intro(sta_connector, sta_key, &csign, &ap_connector).unwrap();
    let at_ap = peer_intro(&ap_connector, &ap_key, &csign, sta_connector).unwrap();
    assert_eq!(*at_sta.pmk, *at_ap.pmk);
    assert_eq!(at_sta.pmkid, at_ap.pmkid);
    // Only the Connector issued during provisioning carries a version
    assert_eq!(at_ap.peer_version, Some(3));
    assert_eq!(at_sta.peer_version, None);
}

#[test]
fn test_group_mismatch_is_no_match() {
    let (pair, sta) = provision_sta("mesh-1");
    let (ap_connector, _) = pair
        .configurator_engine
        .own_config(1, None, NetRole::Ap, "other-group", None)
        .unwrap();

    let err = peer_intro(
        sta.connector.as_deref().unwrap(),
        sta.net_access_key.as_ref().unwrap(),
        sta.c_sign_key.as_ref().unwrap(),
        &ap_connector,
    )
    .unwrap_err();
    assert_eq!(err, DppError::NoMatch);
}

#[test]
fn test_connector_from_other_configurator_rejected() {
    let (_pair, sta) = provision_sta("mesh-1");
    let rogue = Configurator::new(None, None, None).unwrap();
    let (ap_connector, _) = rogue
        .own_config(None, NetRole::Ap, "mesh-1", None)
        .unwrap();

    let err = peer_intro(
        sta.connector.as_deref().unwrap(),
        sta.net_access_key.as_ref().unwrap(),
        sta.c_sign_key.as_ref().unwrap(),
        &ap_connector,
    )
    .unwrap_err();
    assert!(matches!(err, DppError::ConnectorInvalid(_)));
}
