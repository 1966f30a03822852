// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Enterprise (dot1x) provisioning through the CSR round trip

use dpp_engine::{
    Akm, ConfigRequestOutcome, ConfigRequestParams, ConfigResponseOutcome, DppConfiguration,
    DppError, DppStatus, NetRole,
};

use super::common::{authenticate, request_config, Authenticated};

/// DER SEQUENCE { INTEGER 0 }
const CSR: [u8; 5] = [0x30, 0x03, 0x02, 0x01, 0x00];
const CSR_ATTRS_B64: &str = "MAA=";
const CERT_BAG_B64: &str = "MAMCAQA=";

fn dot1x_pair() -> Authenticated {
    let mut slot = DppConfiguration::new(NetRole::Sta, Akm::Dot1x, "corp");
    slot.csrattrs = Some(CSR_ATTRS_B64.to_string());
    slot.server_name = Some("radius.example.com".to_string());
    authenticate(&[slot], false)
}

#[test]
fn test_csr_round_trip() {
    let mut pair = dot1x_pair();

    // 1. No certificate yet: the Configurator asks for a CSR
    let response = request_config(&mut pair, &ConfigRequestParams::default());
    match pair.enrollee.config_response_rx(&response).unwrap() {
        ConfigResponseOutcome::CsrNeeded { csrattrs } => assert_eq!(csrattrs, vec![0x30, 0x00]),
        other => panic!("expected CSR request, got {:?}", other),
    }

    // 2. The CSR is handed out for signing
    let params = ConfigRequestParams {
        csr: Some(CSR.to_vec()),
        ..Default::default()
    };
    let request = pair.enrollee.build_config_request(&params).unwrap();
    match pair.configurator.config_request_rx(&request).unwrap() {
        ConfigRequestOutcome::AwaitCertificate { peer_id, csr } => {
            assert_eq!(csr, CSR.to_vec());
            assert_ne!(peer_id, 0);
        }
        other => panic!("expected certificate wait, got {:?}", other),
    }

    // 3. Certificate arrives and the object carries it
    let response = match pair.configurator.provide_certificate(CERT_BAG_B64).unwrap() {
        ConfigRequestOutcome::Response { frame, status } => {
            assert_eq!(status, DppStatus::Ok);
            frame
        }
        other => panic!("expected a response, got {:?}", other),
    };
    let objects = match pair.enrollee.config_response_rx(&response).unwrap() {
        ConfigResponseOutcome::Received(objects) => objects,
        other => panic!("expected objects, got {:?}", other),
    };
    let obj = &objects[0];
    assert_eq!(obj.akm, Akm::Dot1x);
    assert_eq!(obj.certbag.as_deref(), Some(&CSR[..]));
    assert_eq!(obj.server_name.as_deref(), Some("radius.example.com"));
    assert!(obj.connector.is_some());
}

#[test]
fn test_malformed_csr_is_csr_bad() {
    let mut pair = dot1x_pair();
    let params = ConfigRequestParams {
        csr: Some(vec![0x04, 0x01, 0xff]),
        ..Default::default()
    };
    let response = request_config(&mut pair, &params);
    assert_eq!(
        pair.enrollee.config_response_rx(&response).unwrap_err(),
        DppError::ConfigurationFailed("Configurator rejected configuration".to_string())
    );
}

#[test]
fn test_certificate_without_pending_csr() {
    let mut pair = dot1x_pair();
    assert!(matches!(
        pair.configurator.provide_certificate(CERT_BAG_B64),
        Err(DppError::InvalidState(_))
    ));
}
