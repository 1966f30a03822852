// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use tracing::info;

use crate::auth::{Action, AuthSession, InitiatorParams};
use crate::bootstrap::BootstrapGenParams;
use crate::config::DppConfig;
use crate::configuration::{
    Akm, ConfigRequestOutcome, ConfigRequestParams, ConfigResponseOutcome, ConfiguratorParams,
    DppConfiguration, NetRole,
};
use crate::engine::DppEngine;
use crate::protocol::{AllowedRoles, DppStatus, OutgoingFrame, ProtocolVersion};

/// Arguments for demo command
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Authenticate both bootstrapping keys
    #[arg(long)]
    pub mutual: bool,

    /// AKM to provision (psk, sae, psk+sae, dpp, dpp+sae, dpp+psk+sae)
    #[arg(long, default_value = "dpp")]
    pub akm: Akm,

    #[arg(long, default_value = "dpp-demo")]
    pub ssid: String,

    /// Passphrase for legacy AKMs
    #[arg(long, env = "DPP_DEMO_PASSPHRASE")]
    pub pass: Option<String>,

    /// Net role the Enrollee asks for
    #[arg(long, default_value = "sta")]
    pub netrole: NetRole,
}

/// Deliver `frame` to `session` and return what it does next
fn deliver(session: &mut AuthSession, frame: &OutgoingFrame) -> Action {
    session.handle_incoming(&frame.header(), &frame.attrs)
}

fn expect_frame(action: Action, step: &str) -> Result<OutgoingFrame> {
    match action {
        Action::ReplyWithFrame { frame, .. } => Ok(frame),
        other => Err(anyhow!("{}: expected a frame, got {:?}", step, other)),
    }
}

pub async fn run_demo(args: DemoArgs, config: DppConfig) -> Result<()> {
    // 1. Two devices with opposite role policies
    let mut configurator = DppEngine::new(DppConfig {
        allowed_roles: AllowedRoles::Configurator,
        ..config.clone()
    })?;
    let mut enrollee = DppEngine::new(DppConfig {
        allowed_roles: AllowedRoles::Enrollee,
        ..config
    })?;

    let conf_id = configurator.configurator_add(None, None, None)?;
    let mut slot = DppConfiguration::new(NetRole::Sta, args.akm, args.ssid.clone());
    if let Some(pass) = args.pass {
        slot = slot.with_passphrase(pass);
    }
    let mut ap_slot = slot.clone();
    ap_slot.netrole = NetRole::Ap;
    configurator.set_default_configurator_params(
        ConfiguratorParams::new(conf_id)
            .with_config(slot)
            .with_config(ap_slot),
    )?;

    // 2. Bootstrapping: the Configurator scans the Enrollee's QR code
    let enrollee_bi = enrollee.bootstrap_gen(&BootstrapGenParams::default())?;
    let enrollee_uri = enrollee
        .bootstrap()
        .get_uri(enrollee_bi)
        .ok_or_else(|| anyhow!("Enrollee URI missing"))?;
    println!("📷 Enrollee URI: {}", enrollee_uri);
    let peer = configurator.add_qr_code(&enrollee_uri)?;

    let own_id = if args.mutual {
        let own = configurator.bootstrap_gen(&BootstrapGenParams::default())?;
        let uri = configurator
            .bootstrap()
            .get_uri(own)
            .ok_or_else(|| anyhow!("Configurator URI missing"))?;
        println!("📷 Configurator URI: {}", uri);
        enrollee.add_qr_code(&uri)?;
        Some(own)
    } else {
        None
    };

    // 3. Authentication
    let (mut initiator, request) =
        configurator.auth_init(peer.id, own_id, &InitiatorParams::default())?;
    let (mut responder, action) =
        enrollee.auth_req_rx(&request.header(), &request.attrs)?;
    let response = expect_frame(action, "Authentication Response")?;
    let confirm = expect_frame(deliver(&mut initiator, &response), "Authentication Confirm")?;
    match deliver(&mut responder, &confirm) {
        Action::SessionComplete(Ok(())) => {}
        other => return Err(anyhow!("Authentication failed: {:?}", other)),
    }
    println!(
        "🤝 Authenticated (mutual={}, peer version {})",
        initiator.is_mutual(),
        initiator.peer_version()
    );

    // 4. Configuration
    let request = responder.build_config_request(&ConfigRequestParams {
        netrole: args.netrole,
        ..Default::default()
    })?;
    let response = match initiator.config_request_rx(&request)? {
        ConfigRequestOutcome::Response { frame, status } => {
            info!("DPP: Configurator answered with status {}", status);
            frame
        }
        ConfigRequestOutcome::AwaitCertificate { .. } => {
            return Err(anyhow!("Demo Enrollee does not send a CSR"))
        }
    };
    let objects = match responder.config_response_rx(&response)? {
        ConfigResponseOutcome::Received(objects) => objects,
        ConfigResponseOutcome::CsrNeeded { .. } => {
            return Err(anyhow!("Configurator asked for a CSR"))
        }
    };

    println!("\n📋 Received {} configuration object(s):", objects.len());
    for obj in &objects {
        println!("  AKM:        {}", obj.akm);
        println!("  SSID:       {}", obj.ssid_str());
        println!("  Passphrase: {}", if obj.passphrase.is_some() { "(set)" } else { "-" });
        if let Some(connector) = &obj.connector {
            println!("  Connector:  {}", connector);
        }
    }

    // 5. Configuration Result for R2+ peers
    if responder.peer_version() >= ProtocolVersion::V2 {
        let result = responder.build_conf_result(DppStatus::Ok)?;
        match deliver(&mut initiator, &result) {
            Action::SessionComplete(Ok(())) => println!("\n✅ Configuration Result accepted"),
            other => println!("\n⚠️  Configuration Result: {:?}", other),
        }
    }
    Ok(())
}
