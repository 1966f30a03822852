// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration Request (Enrollee side) and the configAttrib object

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::params::NetRole;
use crate::auth::{AuthSession, AuthState};
use crate::crypto::{aead_seal, b64_encode};
use crate::error::{DppError, Result};
use crate::protocol::{gas, AttrId, AttrWriter};

const DEFAULT_ENROLLEE_NAME: &str = "Test";
const WIFI_TECH_INFRA: &str = "infra";

/// What the Enrollee asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRequestParams {
    pub name: String,
    pub netrole: NetRole,
    pub mud_url: Option<String>,
    /// Supported global operating classes
    pub band_support: Vec<u8>,
    /// DER PKCS#10 request, sent when the Configurator asked for a CSR
    pub csr: Option<Vec<u8>>,
    pub dialog_token: u8,
}

impl Default for ConfigRequestParams {
    fn default() -> Self {
        Self {
            name: DEFAULT_ENROLLEE_NAME.to_string(),
            netrole: NetRole::Sta,
            mud_url: None,
            band_support: Vec::new(),
            csr: None,
            dialog_token: 0,
        }
    }
}

/// configAttrib as parsed by the Configurator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAttributes {
    pub name: String,
    pub netrole: NetRole,
    pub mud_url: Option<String>,
    pub band_support: Vec<i64>,
    /// Decoded `pkcs10`
    pub csr: Option<Vec<u8>>,
}

impl ConfigRequestParams {
    /// configAttrib JSON text
    pub fn to_json(&self) -> String {
        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(self.name));
        obj.insert("wi-fi_tech".to_string(), json!(WIFI_TECH_INFRA));
        obj.insert("netRole".to_string(), json!(self.netrole.as_str()));
        if let Some(url) = &self.mud_url {
            obj.insert("mudurl".to_string(), json!(url));
        }
        if !self.band_support.is_empty() {
            obj.insert("bandSupport".to_string(), json!(self.band_support));
        }
        if let Some(csr) = &self.csr {
            obj.insert("pkcs10".to_string(), json!(b64_encode(csr)));
        }
        Value::Object(obj).to_string()
    }
}

fn string_member<'a>(root: &'a Value, name: &str) -> Result<&'a str> {
    root.get(name).and_then(Value::as_str).ok_or_else(|| {
        DppError::ConfigurationFailed(format!("No Config Attributes - {}", name))
    })
}

impl ConfigAttributes {
    /// Parse configAttrib JSON
    pub fn parse(text: &[u8]) -> Result<Self> {
        let root: Value = serde_json::from_slice(text).map_err(|_| {
            DppError::ConfigurationFailed("Could not parse Config Attributes".to_string())
        })?;

        let name = string_member(&root, "name")?.to_string();
        debug!("DPP: Enrollee name = '{}'", name);

        let wifi_tech = string_member(&root, "wi-fi_tech")?;
        if wifi_tech != WIFI_TECH_INFRA {
            debug!("DPP: Unsupported wi-fi_tech '{}'", wifi_tech);
            return Err(DppError::ConfigurationFailed(
                "Unsupported wi-fi_tech".to_string(),
            ));
        }

        let netrole: NetRole = string_member(&root, "netRole")?
            .parse()
            .map_err(|_| DppError::ConfigurationFailed("Unsupported netRole".to_string()))?;

        let mud_url = root
            .get("mudurl")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut band_support = Vec::new();
        if let Some(list) = root.get("bandSupport").and_then(Value::as_array) {
            for member in list {
                match member.as_i64() {
                    Some(op_class) if !band_support.contains(&op_class) => {
                        band_support.push(op_class)
                    }
                    Some(_) => {}
                    None => debug!("DPP: Invalid bandSupport array member type"),
                }
            }
        }

        // An undecodable pkcs10 is treated like an absent one
        let csr = root
            .get("pkcs10")
            .and_then(Value::as_str)
            .and_then(crate::crypto::b64_decode);

        Ok(Self {
            name,
            netrole,
            mud_url,
            band_support,
            csr,
        })
    }
}

impl AuthSession {
    /// Build the Configuration Request as a GAS Initial Request frame
    ///
    /// The query is `{E-nonce, configAttrib}ke` with no associated data.
    ///
    /// # Arguments
    ///
    /// * `params` - Enrollee name, requested net role and optional extras
    ///
    /// # Returns
    ///
    /// The GAS frame starting at the Public Action category octet
    ///
    /// # Example
    ///
    /// ```ignore
    /// let frame = session.build_config_request(&ConfigRequestParams::default())?;
    /// transport.send(frame).await?;
    /// ```
    pub fn build_config_request(&mut self, params: &ConfigRequestParams) -> Result<Vec<u8>> {
        // 1. Only an authenticated Enrollee sends a request
        if self.state != AuthState::Success || self.configurator {
            return Err(DppError::InvalidState(format!(
                "Configuration Request needs an authenticated Enrollee (state {})",
                self.state
            )));
        }

        // 2. Fresh E-nonce for this exchange
        self.conf.e_nonce = self.gen_nonce();
        self.conf.netrole = Some(params.netrole);
        self.conf.objects.clear();

        // 3. {E-nonce, configAttrib}ke
        let attrib = params.to_json();
        debug!("DPP: configAttrib JSON: {}", attrib);
        let mut clear = AttrWriter::new();
        clear
            .put(AttrId::ENROLLEE_NONCE, &self.conf.e_nonce)
            .put(AttrId::CONFIG_ATTR_OBJ, attrib.as_bytes());
        let wrapped = aead_seal(self.require_ke()?, clear.as_bytes(), &[])?;

        let mut query = AttrWriter::new();
        query.put(AttrId::WRAPPED_DATA, &wrapped);

        info!(
            "DPP: Sending Configuration Request netRole={}",
            params.netrole
        );
        Ok(gas::build_initial_request(
            params.dialog_token,
            query.as_bytes(),
        ))
    }
}
