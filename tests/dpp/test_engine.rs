// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Engine-level scenarios: chirps, per-peer parameters, Responder as
//! Configurator with mutual QR authentication, and driven sessions

use std::time::Duration;

use dpp_engine::bootstrap::build_presence_announcement;
use dpp_engine::{
    Action, Akm, AllowedRoles, BootstrapGenParams, ConfigRequestParams, ConfigResponseOutcome,
    ConfiguratorParams, DppConfig, DppConfiguration, DppEngine, DriverEvent, DriverOutcome,
    InitiatorParams, NetRole, SessionDriver,
};
use tokio::sync::mpsc;

use super::common::{deliver, engine, frame, request_config, Authenticated};

#[test]
fn test_presence_announcement_identifies_known_peer() {
    let mut configurator = engine(AllowedRoles::Configurator);
    let mut enrollee = engine(AllowedRoles::Enrollee);

    let own = enrollee
        .bootstrap_gen(&BootstrapGenParams::default())
        .unwrap();
    let bi = enrollee.bootstrap().get(own).unwrap();
    let chirp = build_presence_announcement(&bi);

    assert!(configurator
        .presence_announcement_rx(&chirp.attrs)
        .unwrap()
        .is_none());

    let peer = configurator.add_qr_code(&bi.uri).unwrap();
    let found = configurator
        .presence_announcement_rx(&chirp.attrs)
        .unwrap()
        .unwrap();
    assert_eq!(found.id, peer.id);
}

#[test]
fn test_peer_specific_configurator_params() {
    let mut configurator_engine = engine(AllowedRoles::Configurator);
    let mut enrollee_engine = engine(AllowedRoles::Enrollee);

    let default_id = configurator_engine.configurator_add(None, None, None).unwrap();
    let peer_conf_id = configurator_engine.configurator_add(None, None, None).unwrap();
    configurator_engine
        .set_default_configurator_params(
            ConfiguratorParams::new(default_id)
                .with_config(DppConfiguration::new(NetRole::Sta, Akm::Dpp, "default-net")),
        )
        .unwrap();

    let own = enrollee_engine
        .bootstrap_gen(&BootstrapGenParams::default())
        .unwrap();
    let uri = enrollee_engine.bootstrap().get_uri(own).unwrap();
    let peer = configurator_engine.add_qr_code(&uri).unwrap();
    let toml = format!(
        "configurator_id = {}\n[[configs]]\nnetrole = \"sta\"\nakm = \"dpp\"\nssid = \"per-peer\"\n",
        peer_conf_id
    );
    configurator_engine
        .bootstrap_mut()
        .set_configurator_params(peer.id, Some(&toml))
        .unwrap();

    let (mut configurator, request) = configurator_engine
        .auth_init(peer.id, None, &InitiatorParams::default())
        .unwrap();
    let (mut enrollee, action) = enrollee_engine
        .auth_req_rx(&request.header(), &request.attrs)
        .unwrap();
    let confirm = frame(deliver(&mut configurator, &frame(action)));
    assert!(matches!(
        deliver(&mut enrollee, &confirm),
        Action::SessionComplete(Ok(()))
    ));

    let mut pair = Authenticated {
        configurator_engine,
        enrollee_engine,
        configurator,
        enrollee,
    };
    let response = request_config(&mut pair, &ConfigRequestParams::default());
    let objects = match pair.enrollee.config_response_rx(&response).unwrap() {
        ConfigResponseOutcome::Received(objects) => objects,
        other => panic!("expected objects, got {:?}", other),
    };
    assert_eq!(objects[0].ssid_str(), "per-peer");
    let expected = pair
        .configurator_engine
        .configurator(peer_conf_id)
        .unwrap()
        .csign_public();
    assert_eq!(objects[0].c_sign_key.as_ref(), Some(&expected));
}

#[test]
fn test_responder_configurator_with_mutual_qr() {
    let mut configurator_engine = DppEngine::new(DppConfig {
        allowed_roles: AllowedRoles::Configurator,
        qr_mutual: true,
        ..Default::default()
    })
    .unwrap();
    let mut enrollee_engine = engine(AllowedRoles::Enrollee);

    let conf_id = configurator_engine.configurator_add(None, None, None).unwrap();
    configurator_engine
        .set_default_configurator_params(
            ConfiguratorParams::new(conf_id).with_config(
                DppConfiguration::new(NetRole::Sta, Akm::PskSae, "home")
                    .with_passphrase("correct horse battery"),
            ),
        )
        .unwrap();

    // The Enrollee scans the Configurator's code and initiates mutually
    let conf_bi = configurator_engine
        .bootstrap_gen(&BootstrapGenParams::default())
        .unwrap();
    let conf_uri = configurator_engine.bootstrap().get_uri(conf_bi).unwrap();
    let peer = enrollee_engine.add_qr_code(&conf_uri).unwrap();
    let own = enrollee_engine
        .bootstrap_gen(&BootstrapGenParams::default())
        .unwrap();
    let (mut enrollee, request) = enrollee_engine
        .auth_init(peer.id, Some(own), &InitiatorParams::default())
        .unwrap();
    assert!(!enrollee.is_configurator());

    // The Configurator has not scanned the Enrollee yet
    let (mut configurator, action) = configurator_engine
        .auth_req_rx(&request.header(), &request.attrs)
        .unwrap();
    assert!(configurator.is_response_pending());
    assert!(matches!(
        deliver(&mut enrollee, &frame(action)),
        Action::AwaitExternalEvent(_)
    ));

    let enrollee_uri = enrollee_engine.bootstrap().get_uri(own).unwrap();
    let scanned = configurator_engine.add_qr_code(&enrollee_uri).unwrap();
    let response = frame(configurator.notify_new_qr_code(&scanned).unwrap());
    let confirm = frame(deliver(&mut enrollee, &response));
    assert!(matches!(
        deliver(&mut configurator, &confirm),
        Action::SessionComplete(Ok(()))
    ));
    assert!(configurator.is_configurator());
    assert!(configurator.is_mutual());

    let mut pair = Authenticated {
        configurator_engine,
        enrollee_engine,
        configurator,
        enrollee,
    };
    let response = request_config(&mut pair, &ConfigRequestParams::default());
    let objects = match pair.enrollee.config_response_rx(&response).unwrap() {
        ConfigResponseOutcome::Received(objects) => objects,
        other => panic!("expected objects, got {:?}", other),
    };
    assert_eq!(objects[0].akm, Akm::PskSae);
    assert!(objects[0].passphrase.is_some());
}

/// Forward frames produced by one driver into the other's event channel
fn bridge(
    mut from: mpsc::Receiver<dpp_engine::OutgoingFrame>,
    to: mpsc::Sender<DriverEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = from.recv().await {
            if to
                .send(DriverEvent::Frame(frame.to_public_action()))
                .await
                .is_err()
            {
                break;
            }
        }
    })
}

#[tokio::test]
async fn test_two_driven_sessions_complete() {
    let mut configurator_engine = engine(AllowedRoles::Configurator);
    let mut enrollee_engine = engine(AllowedRoles::Enrollee);
    let own = enrollee_engine
        .bootstrap_gen(&BootstrapGenParams::default())
        .unwrap();
    let uri = enrollee_engine.bootstrap().get_uri(own).unwrap();
    let peer = configurator_engine.add_qr_code(&uri).unwrap();
    let timeout = Duration::from_secs(5);

    // 1. Initiator driver
    let (initiator, request) = configurator_engine
        .auth_init(peer.id, None, &InitiatorParams::default())
        .unwrap();
    let (i_events_tx, i_events_rx) = mpsc::channel(8);
    let (i_out_tx, mut i_out_rx) = mpsc::channel(8);
    let initiator_task = tokio::spawn(
        SessionDriver::new(initiator, i_events_rx, i_out_tx, timeout).run_from(
            Action::ReplyWithFrame {
                frame: request,
                completion: None,
            },
        ),
    );

    // 2. The first frame creates the Responder
    let request = i_out_rx.recv().await.unwrap();
    let (responder, action) = enrollee_engine
        .auth_req_rx(&request.header(), &request.attrs)
        .unwrap();
    let (r_events_tx, r_events_rx) = mpsc::channel(8);
    let (r_out_tx, r_out_rx) = mpsc::channel(8);
    let responder_task =
        tokio::spawn(SessionDriver::new(responder, r_events_rx, r_out_tx, timeout).run_from(action));

    // 3. Cross-wire the two
    let to_initiator = bridge(r_out_rx, i_events_tx);
    let to_responder = bridge(i_out_rx, r_events_tx);

    let ke_initiator = match initiator_task.await.unwrap() {
        DriverOutcome::Completed { session, result } => {
            assert!(result.is_ok());
            session.ke().map(<[u8]>::to_vec)
        }
        other => panic!("initiator ended with {:?}", other),
    };
    let ke_responder = match responder_task.await.unwrap() {
        DriverOutcome::Completed { session, result } => {
            assert!(result.is_ok());
            session.ke().map(<[u8]>::to_vec)
        }
        other => panic!("responder ended with {:?}", other),
    };
    assert!(ke_initiator.is_some());
    assert_eq!(ke_initiator, ke_responder);

    to_initiator.abort();
    to_responder.abort();
}
