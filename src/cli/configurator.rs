// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;

use crate::config::DppConfig;
use crate::configuration::{
    format_expiry, Configurator, ConnectorPayload, NetRole,
};
use crate::crypto::{from_jwk, to_jwk, EcPrivateKey};

/// Arguments for configurator-add command
#[derive(Args, Debug)]
pub struct ConfiguratorAddArgs {
    /// Curve name; defaults to the configured curve
    #[arg(long)]
    pub curve: Option<String>,

    /// C-sign private key as hex (generated when absent)
    #[arg(long, env = "DPP_CSIGN_KEY")]
    pub key: Option<String>,

    /// Privacy protection private key as hex
    #[arg(long)]
    pub pp_key: Option<String>,

    /// Also print the C-sign private key
    #[arg(long)]
    pub show_key: bool,
}

/// Arguments for sign-connector command
#[derive(Args, Debug)]
pub struct SignConnectorArgs {
    /// C-sign private key as hex
    #[arg(long, env = "DPP_CSIGN_KEY")]
    pub key: String,

    /// Curve of the C-sign key
    #[arg(long, default_value = "prime256v1")]
    pub curve: String,

    /// netRole claim (sta, ap)
    #[arg(long, default_value = "sta")]
    pub netrole: NetRole,

    #[arg(long, default_value = "*")]
    pub group_id: String,

    /// netAccessKey as a public JWK; a fresh key is generated when absent
    #[arg(long)]
    pub net_access_key: Option<String>,

    /// Expiry as seconds since the epoch
    #[arg(long)]
    pub expiry: Option<i64>,
}

/// Arguments for verify-connector command
#[derive(Args, Debug)]
pub struct VerifyConnectorArgs {
    /// C-sign public key as JWK
    #[arg(long)]
    pub csign: String,

    /// signedConnector
    pub connector: String,
}

pub fn configurator_add(args: ConfiguratorAddArgs, config: &DppConfig) -> Result<()> {
    let curve = args.curve.as_deref().unwrap_or(&config.default_curve);
    let conf = Configurator::new(Some(curve), args.key.as_deref(), args.pp_key.as_deref())?;

    println!("✅ Configurator created");
    println!("  Curve: {}", conf.curve.name);
    println!("  kid:   {}", conf.kid);
    println!("  C-sign JWK:  {}", to_jwk(&conf.csign_public(), Some(conf.kid.as_str())));
    println!("  ppKey JWK:   {}", to_jwk(&conf.pp_key_public(), None));
    if args.show_key {
        println!("  C-sign key:  {}", conf.get_key().as_str());
    }
    Ok(())
}

pub fn sign_connector(args: SignConnectorArgs) -> Result<()> {
    let conf = Configurator::new(Some(&args.curve), Some(&args.key), None)?;

    let net_access_key = match &args.net_access_key {
        Some(jwk) => {
            let value: serde_json::Value = serde_json::from_str(jwk)?;
            from_jwk(&value)?.0
        }
        None => {
            let key = EcPrivateKey::generate(conf.curve)?;
            println!("🔑 Generated netAccessKey (private part discarded)");
            key.public_key()
        }
    };

    let mut payload = ConnectorPayload::new(&args.group_id, args.netrole.as_str(), &net_access_key);
    if let Some(expiry) = args.expiry {
        payload.expiry =
            Some(format_expiry(expiry).ok_or_else(|| anyhow!("Invalid expiry {}", expiry))?);
    }
    println!("{}", conf.sign(&payload)?);
    Ok(())
}

pub fn verify_connector(args: VerifyConnectorArgs) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(&args.csign)?;
    let (csign, _) = from_jwk(&value)?;
    let verified = crate::configuration::verify_connector(&csign, &args.connector)?;

    println!("✅ Connector signature valid");
    for group in &verified.payload.groups {
        println!("  group: groupId={} netRole={}", group.group_id, group.net_role);
    }
    if let Some(expiry) = &verified.payload.expiry {
        println!("  expiry: {}", expiry);
    }
    println!("  netAccessKey: {}", verified.payload.net_access_key);
    Ok(())
}
