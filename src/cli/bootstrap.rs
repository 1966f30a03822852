// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;

use crate::bootstrap::{BootstrapGenParams, BootstrapRegistry, BootstrapType};
use crate::config::DppConfig;

/// Arguments for bootstrap-gen command
#[derive(Args, Debug)]
pub struct BootstrapGenArgs {
    /// Bootstrapping type (qrcode, nfc-uri)
    #[arg(long = "type", default_value = "qrcode")]
    pub bootstrap_type: String,

    /// Curve name (prime256v1, secp384r1); defaults to the configured curve
    #[arg(long)]
    pub curve: Option<String>,

    /// Private key as hex (generated when absent)
    #[arg(long, env = "DPP_BOOTSTRAP_KEY")]
    pub key: Option<String>,

    /// Channel list, e.g. 81/1,6,11
    #[arg(long)]
    pub chan: Option<String>,

    /// MAC address
    #[arg(long)]
    pub mac: Option<String>,

    /// Free-form information field
    #[arg(long)]
    pub info: Option<String>,
}

/// Arguments for parse-uri command
#[derive(Args, Debug)]
pub struct ParseUriArgs {
    /// DPP URI (DPP:...;;)
    pub uri: String,
}

/// Generate a bootstrapping key and print its URI
pub fn bootstrap_gen(args: BootstrapGenArgs, config: &DppConfig) -> Result<()> {
    let bootstrap_type = BootstrapType::from_param(&args.bootstrap_type)
        .ok_or_else(|| anyhow!("Unsupported bootstrapping type '{}'", args.bootstrap_type))?;
    if bootstrap_type == BootstrapType::Pkex {
        return Err(anyhow!("PKEX bootstrapping is not supported"));
    }

    let params = BootstrapGenParams {
        bootstrap_type: Some(bootstrap_type),
        chan: args.chan,
        mac: args.mac,
        info: args.info,
        curve: args.curve.or_else(|| Some(config.default_curve.clone())),
        key: args.key,
    };

    let mut registry = BootstrapRegistry::new(config.protocol_version);
    let id = registry.bootstrap_gen(&params)?;
    let uri = registry
        .get_uri(id)
        .ok_or_else(|| anyhow!("Bootstrapping info {} disappeared", id))?;

    println!("🔑 Bootstrapping key generated");
    println!("{}", uri);
    Ok(())
}

/// Parse a DPP URI and print its summary
pub fn parse_uri(args: ParseUriArgs) -> Result<()> {
    let bi = crate::bootstrap::parse_uri(&args.uri)?;
    println!("📋 DPP URI:");
    print!("{}", bi.describe());
    if let Some(chan) = &bi.chan {
        println!("chan={}", chan);
    }
    println!("freqs={:?}", bi.freqs);
    Ok(())
}
