// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configurator-side provisioning parameters
//!
//! A [`ConfiguratorParams`] names the Configurator that signs and holds up
//! to two [`DppConfiguration`] slots per Enrollee network role. Parameters
//! are plain serde structs so they can be kept in TOML next to the engine
//! configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::akm::Akm;
use crate::error::{DppError, Result};

pub const SSID_MAX_LEN: usize = 32;
pub const PMK_LEN: usize = 32;
const PASSPHRASE_MIN_LEN: usize = 8;
const PASSPHRASE_MAX_LEN: usize = 63;
/// Configuration slots per network role
pub const MAX_SLOTS_PER_ROLE: usize = 2;

/// Network role requested by an Enrollee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetRole {
    #[default]
    Sta,
    Ap,
    Configurator,
}

impl NetRole {
    pub fn as_str(self) -> &'static str {
        match self {
            NetRole::Sta => "sta",
            NetRole::Ap => "ap",
            NetRole::Configurator => "configurator",
        }
    }
}

impl fmt::Display for NetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetRole {
    type Err = DppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sta" => Ok(NetRole::Sta),
            "ap" => Ok(NetRole::Ap),
            "configurator" => Ok(NetRole::Configurator),
            other => Err(DppError::ConfigurationFailed(format!(
                "Unsupported netRole '{}'",
                other
            ))),
        }
    }
}

/// One network configuration the Configurator can hand out
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DppConfiguration {
    #[serde(default)]
    pub netrole: NetRole,
    pub akm: Akm,
    pub ssid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid_charset: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    /// 64 hex digits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psk_hex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Connector expiry as seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    /// base64 CSR attributes sent with CSR_NEEDED (dot1x)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrattrs: Option<String>,
    /// base64 PKCS#7 certificate bag (dot1x)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certbag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cacert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
}

impl fmt::Debug for DppConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DppConfiguration")
            .field("netrole", &self.netrole)
            .field("akm", &self.akm)
            .field("ssid", &self.ssid)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("psk_hex", &self.psk_hex.as_ref().map(|_| "<redacted>"))
            .field("group_id", &self.group_id)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl DppConfiguration {
    /// Minimal configuration for `akm` on `ssid`
    pub fn new(netrole: NetRole, akm: Akm, ssid: impl Into<String>) -> Self {
        Self {
            netrole,
            akm,
            ssid: ssid.into(),
            ssid_charset: None,
            passphrase: None,
            psk_hex: None,
            group_id: None,
            expiry: None,
            csrattrs: None,
            certbag: None,
            cacert: None,
            server_name: None,
        }
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    pub fn with_psk_hex(mut self, psk_hex: impl Into<String>) -> Self {
        self.psk_hex = Some(psk_hex.into());
        self
    }

    /// Decoded PSK, when one is configured
    pub fn psk(&self) -> Result<Option<Zeroizing<[u8; PMK_LEN]>>> {
        let Some(hex_psk) = &self.psk_hex else {
            return Ok(None);
        };
        let bytes = Zeroizing::new(
            hex::decode(hex_psk).map_err(|_| DppError::Config("Invalid psk_hex".to_string()))?,
        );
        if bytes.len() != PMK_LEN {
            return Err(DppError::Config(format!(
                "PSK must be {} octets, got {}",
                PMK_LEN,
                bytes.len()
            )));
        }
        let mut psk = Zeroizing::new([0u8; PMK_LEN]);
        psk.copy_from_slice(&bytes);
        Ok(Some(psk))
    }

    pub fn group_id(&self) -> &str {
        self.group_id.as_deref().unwrap_or("*")
    }

    /// Check credential lengths before anything is built or signed
    pub fn validate(&self) -> Result<()> {
        // 1. SSID
        if self.ssid.is_empty() || self.ssid.len() > SSID_MAX_LEN {
            return Err(DppError::Config(format!(
                "SSID must be 1..{} octets, got {}",
                SSID_MAX_LEN,
                self.ssid.len()
            )));
        }

        // 2. Passphrase and PSK shapes
        if let Some(pass) = &self.passphrase {
            if pass.len() < PASSPHRASE_MIN_LEN || pass.len() > PASSPHRASE_MAX_LEN {
                return Err(DppError::Config(format!(
                    "Passphrase must be {}..{} characters",
                    PASSPHRASE_MIN_LEN, PASSPHRASE_MAX_LEN
                )));
            }
        }
        self.psk()?;

        // 3. Credentials required by the AKM
        if self.akm.is_psk() && self.passphrase.is_none() && self.psk_hex.is_none() {
            return Err(DppError::Config(format!(
                "akm={} requires a passphrase or PSK",
                self.akm
            )));
        }
        if self.akm.is_sae() && self.passphrase.is_none() {
            return Err(DppError::Config(format!(
                "akm={} requires a passphrase",
                self.akm
            )));
        }
        if self.netrole == NetRole::Configurator {
            return Err(DppError::Config(
                "netrole=configurator cannot be provisioned as a network slot".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which Configurator signs and what it provisions
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfiguratorParams {
    pub configurator_id: u32,
    #[serde(default)]
    pub configs: Vec<DppConfiguration>,
    /// Ask R2+ station Enrollees for a Connection Status Result
    #[serde(default)]
    pub send_conn_status: bool,
    /// Emit `cred.akm` as a suite selector list for R2 AKMs
    #[serde(default)]
    pub akm_use_selector: bool,
}

impl ConfiguratorParams {
    pub fn new(configurator_id: u32) -> Self {
        Self {
            configurator_id,
            ..Default::default()
        }
    }

    pub fn with_config(mut self, config: DppConfiguration) -> Self {
        self.configs.push(config);
        self
    }

    /// Parse parameters from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let params: Self = toml::from_str(text)
            .map_err(|e| DppError::Config(format!("Failed to parse configurator params: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    /// Load parameters from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DppError::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        for config in &self.configs {
            config.validate()?;
        }
        for role in [NetRole::Sta, NetRole::Ap] {
            let count = self.configs.iter().filter(|c| c.netrole == role).count();
            if count > MAX_SLOTS_PER_ROLE {
                return Err(DppError::Config(format!(
                    "At most {} configurations per netrole ({} has {})",
                    MAX_SLOTS_PER_ROLE, role, count
                )));
            }
        }
        Ok(())
    }

    /// Configuration in slot `idx` (0 or 1) for `netrole`
    pub fn slot(&self, netrole: NetRole, idx: usize) -> Option<&DppConfiguration> {
        self.configs
            .iter()
            .filter(|c| c.netrole == netrole)
            .nth(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PSK: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_validate_lengths() {
        let ok = DppConfiguration::new(NetRole::Sta, Akm::Psk, "home").with_passphrase("secret12");
        assert!(ok.validate().is_ok());

        let short = DppConfiguration::new(NetRole::Sta, Akm::Psk, "home").with_passphrase("short");
        assert!(short.validate().is_err());

        let long_ssid = DppConfiguration::new(NetRole::Sta, Akm::Dpp, "x".repeat(33));
        assert!(long_ssid.validate().is_err());

        let bad_psk = DppConfiguration::new(NetRole::Sta, Akm::Psk, "home").with_psk_hex("abcd");
        assert!(bad_psk.validate().is_err());

        let good_psk = DppConfiguration::new(NetRole::Sta, Akm::Psk, "home").with_psk_hex(PSK);
        assert_eq!(good_psk.psk().unwrap().unwrap()[1], 0x23);
    }

    #[test]
    fn test_akm_credential_requirements() {
        let sae_psk_only = DppConfiguration::new(NetRole::Sta, Akm::Sae, "home").with_psk_hex(PSK);
        assert!(sae_psk_only.validate().is_err());

        let psk_nothing = DppConfiguration::new(NetRole::Ap, Akm::PskSae, "home");
        assert!(psk_nothing.validate().is_err());

        let dpp = DppConfiguration::new(NetRole::Ap, Akm::Dpp, "home");
        assert!(dpp.validate().is_ok());
    }

    #[test]
    fn test_slots_per_role() {
        let params = ConfiguratorParams::new(1)
            .with_config(DppConfiguration::new(NetRole::Sta, Akm::Dpp, "a"))
            .with_config(DppConfiguration::new(NetRole::Ap, Akm::Dpp, "b"))
            .with_config(DppConfiguration::new(NetRole::Sta, Akm::Dpp, "c"));
        assert!(params.validate().is_ok());
        assert_eq!(params.slot(NetRole::Sta, 1).unwrap().ssid, "c");
        assert_eq!(params.slot(NetRole::Ap, 0).unwrap().ssid, "b");
        assert!(params.slot(NetRole::Ap, 1).is_none());

        let crowded = params.with_config(DppConfiguration::new(NetRole::Sta, Akm::Dpp, "d"));
        assert!(crowded.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let text = r#"
            configurator_id = 2
            send_conn_status = true

            [[configs]]
            netrole = "sta"
            akm = "psk+sae"
            ssid = "office"
            passphrase = "correct horse"
        "#;
        let params = ConfiguratorParams::from_toml(text).unwrap();
        assert_eq!(params.configurator_id, 2);
        assert!(params.send_conn_status);
        assert_eq!(params.configs[0].akm, Akm::PskSae);

        assert!(ConfiguratorParams::from_toml("configurator_id = 1\n[[configs]]\nakm = \"wep\"\nssid = \"x\"").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = DppConfiguration::new(NetRole::Sta, Akm::Psk, "home").with_passphrase("topsecret");
        let text = format!("{:?}", config);
        assert!(!text.contains("topsecret"));
    }
}
