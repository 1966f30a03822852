// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Engine configuration
//!
//! Loaded from a TOML file with [`DppConfig::from_file`], or built from
//! defaults plus `DPP_*` environment variables with [`DppConfig::from_env`].

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::crypto::CurveParams;
use crate::error::{DppError, Result};
use crate::protocol::{AllowedRoles, ProtocolVersion};

/// Default time a Responder may stay in RESPONSE_PENDING
pub const DEFAULT_PENDING_TIMEOUT_SECS: u64 = 60;

/// Policy shared by every session the engine creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DppConfig {
    /// Roles this device may take in authentication
    pub allowed_roles: AllowedRoles,
    /// Responder waits for the Initiator's bootstrapping key
    pub qr_mutual: bool,
    /// Highest DPP version spoken
    pub protocol_version: ProtocolVersion,
    /// Curve for protocol keys and generated bootstrapping keys
    pub default_curve: String,
    /// Seconds a parked RESPONSE_PENDING session survives
    pub response_pending_timeout_secs: u64,
    /// Configurator asks Enrollees for a Connection Status Result
    pub send_conn_status: bool,
    /// Emit AKM suite selectors instead of names in configuration objects
    pub akm_use_selector: bool,
}

impl Default for DppConfig {
    fn default() -> Self {
        Self {
            allowed_roles: AllowedRoles::Either,
            qr_mutual: false,
            protocol_version: ProtocolVersion::LATEST,
            default_curve: CurveParams::default_curve().name.to_string(),
            response_pending_timeout_secs: DEFAULT_PENDING_TIMEOUT_SECS,
            send_conn_status: false,
            akm_use_selector: false,
        }
    }
}

impl DppConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Parse and validate a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| DppError::Config(format!("Invalid DPP config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DppError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Apply `DPP_*` environment variables on top of `self`
    ///
    /// Unparsable values are logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = env::var("DPP_ALLOWED_ROLES") {
            match val.parse() {
                Ok(roles) => self.allowed_roles = roles,
                Err(e) => warn!("DPP: Ignoring DPP_ALLOWED_ROLES: {}", e),
            }
        }
        if let Ok(val) = env::var("DPP_QR_MUTUAL") {
            self.qr_mutual = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(val) = env::var("DPP_PENDING_TIMEOUT_SECS") {
            match val.parse() {
                Ok(secs) => self.response_pending_timeout_secs = secs,
                Err(_) => warn!("DPP: Ignoring DPP_PENDING_TIMEOUT_SECS={}", val),
            }
        }
        if let Ok(val) = env::var("DPP_VERSION") {
            match val.parse::<u8>().ok().and_then(|v| ProtocolVersion::try_from(v).ok()) {
                Some(version) => self.protocol_version = version,
                None => warn!("DPP: Ignoring DPP_VERSION={}", val),
            }
        }
        if let Ok(val) = env::var("DPP_CURVE") {
            self.default_curve = val;
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let curve = self.curve()?;
        curve.ensure_supported()?;
        if self.response_pending_timeout_secs == 0 {
            return Err(DppError::Config(
                "response_pending_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Curve parameters for `default_curve`
    pub fn curve(&self) -> Result<&'static CurveParams> {
        CurveParams::by_name(&self.default_curve)
            .ok_or_else(|| DppError::UnsupportedCurve(self.default_curve.clone()))
    }

    pub fn response_pending_timeout(&self) -> Duration {
        Duration::from_secs(self.response_pending_timeout_secs)
    }
}
