// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod auth;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod configuration;
pub mod crypto;
pub mod driver;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod version;

// Re-export main types
pub use auth::{Action, AuthSession, AuthState, AwaitReason, InitiatorParams, Role, SessionOptions};
pub use bootstrap::{BootstrapGenParams, BootstrapInfo, BootstrapRegistry, BootstrapType};
pub use config::DppConfig;
pub use configuration::{
    peer_intro, Akm, ConfigObject, ConfigRequestOutcome, ConfigRequestParams,
    ConfigResponseOutcome, Configurator, ConfiguratorParams, ConfiguratorRegistry,
    DppConfiguration, Introduction, NetRole,
};
pub use driver::{DriverEvent, DriverOutcome, SessionDriver};
pub use engine::DppEngine;
pub use error::{DppError, Result};
pub use protocol::{AllowedRoles, DppStatus, FrameType, OutgoingFrame, ProtocolVersion};
