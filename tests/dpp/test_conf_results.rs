// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration Result and Connection Status Result exchanges

use dpp_engine::{
    Action, Akm, AwaitReason, ConfigRequestParams, ConfigResponseOutcome, DppConfiguration,
    DppError, DppStatus, NetRole,
};

use super::common::{authenticate, deliver, request_config, Authenticated};

fn provisioned(send_conn_status: bool) -> Authenticated {
    let slot = DppConfiguration::new(NetRole::Sta, Akm::Dpp, "home");
    let mut pair = authenticate(&[slot], send_conn_status);
    let response = request_config(&mut pair, &ConfigRequestParams::default());
    assert!(matches!(
        pair.enrollee.config_response_rx(&response).unwrap(),
        ConfigResponseOutcome::Received(_)
    ));
    pair
}

#[test]
fn test_conf_result_ok_completes_configurator() {
    let mut pair = provisioned(false);
    assert!(!pair.enrollee.conn_status_requested());

    let result = pair.enrollee.build_conf_result(DppStatus::Ok).unwrap();
    assert!(matches!(
        deliver(&mut pair.configurator, &result),
        Action::SessionComplete(Ok(()))
    ));
    assert_eq!(pair.configurator.conf_result(), Some(DppStatus::Ok));

    // A second copy is not expected any more
    assert!(matches!(
        deliver(&mut pair.configurator, &result),
        Action::AwaitExternalEvent(AwaitReason::PeerFrame)
    ));
}

#[test]
fn test_conf_result_rejection_reported() {
    let mut pair = provisioned(false);
    let result = pair
        .enrollee
        .build_conf_result(DppStatus::ConfigRejected)
        .unwrap();
    match deliver(&mut pair.configurator, &result) {
        Action::SessionComplete(Err(DppError::PeerStatus(DppStatus::ConfigRejected))) => {}
        other => panic!("unexpected action {:?}", other),
    }
    assert_eq!(pair.configurator.conf_result(), Some(DppStatus::ConfigRejected));
}

#[test]
fn test_connection_status_after_conf_result() {
    let mut pair = provisioned(true);
    assert!(pair.enrollee.conn_status_requested());

    let result = pair.enrollee.build_conf_result(DppStatus::Ok).unwrap();
    assert!(matches!(
        deliver(&mut pair.configurator, &result),
        Action::AwaitExternalEvent(AwaitReason::PeerFrame)
    ));

    let status = pair
        .enrollee
        .build_conn_status_result(DppStatus::NoAp, Some(&b"home"[..]), Some("81/1,6"))
        .unwrap();
    assert!(matches!(
        deliver(&mut pair.configurator, &status),
        Action::SessionComplete(Ok(()))
    ));

    let reported = pair.configurator.conn_status_result().unwrap();
    assert_eq!(reported.result, DppStatus::NoAp.as_u8());
    assert_eq!(reported.ssid, b"home".to_vec());
    assert_eq!(reported.channel_list.as_deref(), Some("81/1,6"));
}

#[test]
fn test_unsolicited_conn_status_ignored() {
    let mut pair = provisioned(false);
    let status = pair
        .enrollee
        .build_conn_status_result(DppStatus::Ok, None, None)
        .unwrap();
    assert!(matches!(
        deliver(&mut pair.configurator, &status),
        Action::AwaitExternalEvent(AwaitReason::PeerFrame)
    ));
    assert!(pair.configurator.conn_status_result().is_none());
}

#[test]
fn test_results_need_configuration_exchange() {
    let slot = DppConfiguration::new(NetRole::Sta, Akm::Dpp, "home");
    let pair = authenticate(&[slot], false);
    assert!(matches!(
        pair.enrollee.build_conf_result(DppStatus::Ok),
        Err(DppError::InvalidState(_))
    ));
    assert!(matches!(
        pair.configurator.build_conf_result(DppStatus::Ok),
        Err(DppError::InvalidState(_))
    ));
}
