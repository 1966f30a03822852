// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod bootstrap;
pub mod configurator;
pub mod demo;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::DppConfig;

/// DPP (Wi-Fi Easy Connect) command line tools
#[derive(Parser, Debug)]
#[command(name = "dpp-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Bootstrapping, Connector and provisioning tools for Wi-Fi Easy Connect", long_about = None)]
pub struct Cli {
    /// Engine configuration file (TOML); DPP_* variables override it
    #[arg(long, global = true, env = "DPP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a bootstrapping key and print its DPP URI
    BootstrapGen(bootstrap::BootstrapGenArgs),

    /// Parse a DPP URI and print what it carries
    ParseUri(bootstrap::ParseUriArgs),

    /// Create a Configurator (C-sign key) and print its public key
    ConfiguratorAdd(configurator::ConfiguratorAddArgs),

    /// Sign a Connector with a C-sign key
    SignConnector(configurator::SignConnectorArgs),

    /// Verify a Connector against a C-sign public key
    VerifyConnector(configurator::VerifyConnectorArgs),

    /// Run authentication and configuration between two in-process devices
    Demo(demo::DemoArgs),
}

/// Load the engine configuration for a command
pub fn load_config(path: Option<&PathBuf>) -> Result<DppConfig> {
    let config = match path {
        Some(path) => DppConfig::from_file(path)?,
        None => DppConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Commands::BootstrapGen(args) => bootstrap::bootstrap_gen(args, &config),
        Commands::ParseUri(args) => bootstrap::parse_uri(args),
        Commands::ConfiguratorAdd(args) => configurator::configurator_add(args, &config),
        Commands::SignConnector(args) => configurator::sign_connector(args),
        Commands::VerifyConnector(args) => configurator::verify_connector(args),
        Commands::Demo(args) => demo::run_demo(args, config).await,
    }
}
