// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Enrollee side of the Configuration exchange
//!
//! Opens the Configuration Response and parses each configuration object
//! into a [`ConfigObject`].

use std::fmt;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::akm::Akm;
use super::connector::verify_connector;
use super::params::{PMK_LEN, SSID_MAX_LEN};
use crate::auth::{AuthSession, AuthState};
use crate::crypto::{aead_open, b64_decode, b64url_decode, from_jwk, EcPrivateKey, EcPublicKey};
use crate::crypto::AES_BLOCK_SIZE;
use crate::error::{DppError, Result};
use crate::protocol::{gas, AttrId, Attributes, DppStatus, ProtocolVersion};

/// Configuration objects kept per exchange; extras are ignored
pub const MAX_CONF_OBJ: usize = 10;

/// A network configuration received from the Configurator
#[derive(Clone)]
pub struct ConfigObject {
    pub akm: Akm,
    pub ssid: Vec<u8>,
    pub ssid_charset: Option<i64>,
    pub passphrase: Option<Zeroizing<String>>,
    pub psk: Option<Zeroizing<[u8; PMK_LEN]>>,
    pub connector: Option<String>,
    pub c_sign_key: Option<EcPublicKey>,
    pub pp_key: Option<EcPublicKey>,
    /// Own protocol key, now the network access key
    pub net_access_key: Option<EcPrivateKey>,
    pub net_access_key_expiry: Option<String>,
    pub certbag: Option<Vec<u8>>,
    pub cacert: Option<Vec<u8>>,
    pub server_name: Option<String>,
}

impl fmt::Debug for ConfigObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigObject")
            .field("akm", &self.akm)
            .field("ssid", &String::from_utf8_lossy(&self.ssid))
            .field("has_passphrase", &self.passphrase.is_some())
            .field("has_psk", &self.psk.is_some())
            .field("has_connector", &self.connector.is_some())
            .finish_non_exhaustive()
    }
}

impl ConfigObject {
    fn new(akm: Akm, ssid: Vec<u8>) -> Self {
        Self {
            akm,
            ssid,
            ssid_charset: None,
            passphrase: None,
            psk: None,
            connector: None,
            c_sign_key: None,
            pp_key: None,
            net_access_key: None,
            net_access_key_expiry: None,
            certbag: None,
            cacert: None,
            server_name: None,
        }
    }

    /// PSK as lowercase hex
    pub fn psk_hex(&self) -> Option<Zeroizing<String>> {
        self.psk.as_ref().map(|psk| Zeroizing::new(hex::encode(&psk[..])))
    }

    pub fn ssid_str(&self) -> String {
        String::from_utf8_lossy(&self.ssid).into_owned()
    }
}

/// What the Enrollee got back
#[derive(Debug, Clone)]
pub enum ConfigResponseOutcome {
    Received(Vec<ConfigObject>),
    /// Configurator wants a CSR built from these (base64-decoded) attributes
    CsrNeeded { csrattrs: Vec<u8> },
}

fn invalid(reason: &str) -> DppError {
    DppError::InvalidConfigObject(reason.to_string())
}

fn has_ctrl_char(text: &str) -> bool {
    text.bytes().any(|b| b < 32 || b == 127)
}

fn parse_jwk(value: Option<&Value>, what: &str) -> Result<Option<EcPublicKey>> {
    match value {
        Some(jwk @ Value::Object(_)) => {
            let (key, _) = from_jwk(jwk)
                .map_err(|e| DppError::InvalidConfigObject(format!("Failed to parse {} JWK: {}", what, e)))?;
            Ok(Some(key))
        }
        _ => Ok(None),
    }
}

/// `pass` or `psk_hex` with length checks
fn parse_cred_legacy(obj: &mut ConfigObject, cred: &Map<String, Value>) -> Result<()> {
    debug!("DPP: Legacy akm={} credential", obj.akm);
    if let Some(pass) = cred.get("pass").and_then(Value::as_str) {
        if pass.len() < 8 || pass.len() > 63 {
            return Err(invalid("Invalid legacy passphrase length"));
        }
        obj.passphrase = Some(Zeroizing::new(pass.to_string()));
    } else if let Some(psk_hex) = cred.get("psk_hex").and_then(Value::as_str) {
        if obj.akm.is_sae() && !obj.akm.is_psk() {
            return Err(invalid("Unexpected psk_hex with akm=sae"));
        }
        let bytes = Zeroizing::new(hex::decode(psk_hex).map_err(|_| invalid("Invalid psk_hex encoding"))?);
        if bytes.len() != PMK_LEN {
            return Err(invalid("Invalid psk_hex encoding"));
        }
        let mut psk = Zeroizing::new([0u8; PMK_LEN]);
        psk.copy_from_slice(&bytes);
        obj.psk = Some(psk);
    } else {
        return Err(invalid("No pass or psk_hex strings found"));
    }

    if obj.akm.is_sae() && obj.passphrase.is_none() {
        return Err(invalid("No pass for sae found"));
    }
    Ok(())
}

fn parse_cred_dot1x(obj: &mut ConfigObject, cred: &Map<String, Value>) -> Result<()> {
    let ent = cred
        .get("entCreds")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("No entCreds in JSON"))?;

    let certbag = ent
        .get("certBag")
        .and_then(Value::as_str)
        .and_then(b64_decode)
        .ok_or_else(|| invalid("No certBag in JSON"))?;
    if certbag.first() != Some(&0x30) {
        return Err(invalid("No certificates in certBag"));
    }
    obj.certbag = Some(certbag);
    obj.cacert = ent.get("caCert").and_then(Value::as_str).and_then(b64_decode);

    match ent.get("trustedEapServerName") {
        None => {}
        Some(Value::String(name)) if !has_ctrl_char(name) => {
            debug!("DPP: Received trustedEapServerName: {}", name);
            obj.server_name = Some(name.clone());
        }
        Some(_) => return Err(invalid("Invalid trustedEapServerName type in JSON")),
    }
    Ok(())
}

impl AuthSession {
    /// Process the Configuration Response (GAS Initial Response frame)
    ///
    /// # Arguments
    ///
    /// * `frame` - The GAS Initial Response starting at the category octet
    ///
    /// # Returns
    ///
    /// The received configuration objects, or the Configurator's CSR request
    ///
    /// # Example
    ///
    /// ```ignore
    /// match session.config_response_rx(&gas_frame)? {
    ///     ConfigResponseOutcome::Received(objects) => apply(objects),
    ///     ConfigResponseOutcome::CsrNeeded { csrattrs } => send_csr(csrattrs),
    /// }
    /// ```
    pub fn config_response_rx(&mut self, frame: &[u8]) -> Result<ConfigResponseOutcome> {
        match self.conf_resp_rx(frame) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("DPP-CONF-FAILED");
                Err(self.fail(e))
            }
        }
    }

    fn conf_resp_rx(&mut self, frame: &[u8]) -> Result<ConfigResponseOutcome> {
        // 1. Authenticated Enrollee with a request outstanding
        if self.state != AuthState::Success || self.configurator || self.conf.e_nonce.is_empty() {
            return Err(DppError::InvalidState(
                "No Configuration Request outstanding".to_string(),
            ));
        }
        self.conf.conf_resp_status = None;

        let response = gas::parse_initial_response(frame)?;
        if response.status_code != gas::WLAN_STATUS_SUCCESS {
            return Err(DppError::ConfigurationFailed(format!(
                "GAS query failed with status code {}",
                response.status_code
            )));
        }

        // 2. Wrapped data with the cleartext attributes as AD
        let attrs = Attributes::parse(response.response).map_err(|_| {
            DppError::MalformedFrame("Invalid attribute in config response".to_string())
        })?;
        let wrapped = attrs.require_min(AttrId::WRAPPED_DATA, AES_BLOCK_SIZE)?;
        let unwrapped = Zeroizing::new(aead_open(
            self.require_ke()?,
            wrapped,
            &[attrs.before_wrapped()],
        )?);
        let inner = Attributes::parse(&unwrapped).map_err(|_| {
            DppError::MalformedFrame("Invalid attribute in unwrapped data".to_string())
        })?;

        let e_nonce = inner.require_len(AttrId::ENROLLEE_NONCE, self.curve.nonce_len)?;
        if e_nonce != self.conf.e_nonce.as_slice() {
            return Err(DppError::invalid(
                AttrId::ENROLLEE_NONCE,
                "Enrollee Nonce mismatch",
            ));
        }

        // 3. Status
        let status = attrs.status()?;
        self.conf.conf_resp_status = Some(status);
        debug!("DPP: Status {}", status);
        if status == DppStatus::CsrNeeded {
            debug!("DPP: Configurator requested CSR");
            let csrattrs = inner
                .get(AttrId::CSR_ATTR_REQ)
                .and_then(|raw| std::str::from_utf8(raw).ok())
                .and_then(b64_decode)
                .ok_or(DppError::MissingAttribute(AttrId::CSR_ATTR_REQ))?;
            self.conf.csrattrs = Some(csrattrs.clone());
            return Ok(ConfigResponseOutcome::CsrNeeded { csrattrs });
        }
        if status != DppStatus::Ok {
            return Err(DppError::ConfigurationFailed(
                "Configurator rejected configuration".to_string(),
            ));
        }

        // 4. Configuration objects
        let mut objects = Vec::new();
        let raw_objects: Vec<&[u8]> = inner.get_all(AttrId::CONFIG_OBJ).collect();
        if raw_objects.is_empty() {
            return Err(DppError::MissingAttribute(AttrId::CONFIG_OBJ));
        }
        for raw in raw_objects {
            let obj = self.parse_conf_obj(raw)?;
            if objects.len() == MAX_CONF_OBJ {
                debug!("DPP: No room for this many Config Objects - ignore this one");
                continue;
            }
            objects.push(obj);
        }

        if inner.contains(AttrId::SEND_CONN_STATUS) {
            debug!("DPP: Configurator requested connection status result");
            self.conf.conn_status_requested = true;
        }

        for obj in &objects {
            info!("DPP-CONF-RECEIVED akm={} ssid={}", obj.akm, obj.ssid_str());
        }
        self.conf.objects = objects.clone();
        Ok(ConfigResponseOutcome::Received(objects))
    }

    /// Parse one configurationObject
    pub(crate) fn parse_conf_obj(&self, raw: &[u8]) -> Result<ConfigObject> {
        let root: Value = serde_json::from_slice(raw).map_err(|_| invalid("Could not parse configuration object"))?;
        let root = root
            .as_object()
            .ok_or_else(|| invalid("JSON root is not an object"))?;

        // 1. wi-fi_tech and discovery
        let tech = root
            .get("wi-fi_tech")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("No wi-fi_tech string value found"))?;
        if tech != "infra" {
            debug!("DPP: Unsupported wi-fi_tech value: '{}'", tech);
            return Err(invalid("Unsupported wi-fi_tech value"));
        }

        let discovery = root
            .get("discovery")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("No discovery object in JSON"))?;
        let ssid = match discovery.get("ssid64").and_then(Value::as_str).and_then(b64url_decode) {
            Some(ssid) => {
                if ssid.len() > SSID_MAX_LEN {
                    return Err(invalid("Too long discovery::ssid64 value"));
                }
                ssid
            }
            None => {
                let ssid = discovery
                    .get("ssid")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("No discovery::ssid string value found"))?;
                if ssid.len() > SSID_MAX_LEN {
                    return Err(invalid("Too long discovery::ssid string value"));
                }
                ssid.as_bytes().to_vec()
            }
        };

        // 2. Credential
        let cred = root
            .get("cred")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("No cred object in JSON"))?;
        let akm_text = cred
            .get("akm")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("No cred::akm string value found"))?;
        let akm = Akm::parse(akm_text)?;

        let mut obj = ConfigObject::new(akm, ssid);
        obj.ssid_charset = discovery.get("ssid_charset").and_then(Value::as_i64);

        let peer_v2 = self.peer_version >= ProtocolVersion::V2;
        let mut legacy = akm.is_legacy();
        if legacy
            && peer_v2
            && cred.get("csign").map_or(false, Value::is_object)
            && cred.get("signedConnector").map_or(false, Value::is_string)
        {
            legacy = false;
        }

        if legacy {
            parse_cred_legacy(&mut obj, cred)?;
        } else if akm.is_dpp() || (peer_v2 && akm.is_legacy()) {
            self.parse_cred_dpp(&mut obj, cred)?;
        } else if akm == Akm::Dot1x {
            parse_cred_dot1x(&mut obj, cred)?;
            self.parse_cred_dpp(&mut obj, cred)?;
        } else {
            return Err(DppError::UnknownAkm(akm_text.to_string()));
        }

        debug!("DPP: JSON parsing completed successfully");
        Ok(obj)
    }

    /// Connector credential: verify the Connector under `csign` and check
    /// that it was issued for our protocol key
    fn parse_cred_dpp(&self, obj: &mut ConfigObject, cred: &Map<String, Value>) -> Result<()> {
        if obj.akm.is_psk() || obj.akm.is_sae() {
            debug!("DPP: Legacy credential included in Connector credential");
            parse_cred_legacy(obj, cred)?;
        }

        let csign = parse_jwk(cred.get("csign"), "csign")?
            .ok_or_else(|| invalid("No csign JWK in JSON"))?;
        let pp_key = parse_jwk(cred.get("ppKey"), "ppKey")?;
        if let Some(pp) = &pp_key {
            if pp.curve().id != csign.curve().id {
                return Err(invalid("C-sign-key and ppKey do not use the same curve"));
            }
        }

        let signed_connector = cred
            .get("signedConnector")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("No signedConnector string found"))?;
        let verified = verify_connector(&csign, signed_connector)?;

        let nak = verified.payload.net_access_key()?;
        let own = self.own_protocol()?;
        if nak != own.public_key() {
            return Err(DppError::ConnectorInvalid(
                "netAccessKey in connector does not match own protocol key".to_string(),
            ));
        }

        obj.connector = Some(signed_connector.to_string());
        obj.net_access_key_expiry = verified.payload.expiry.clone();
        obj.c_sign_key = Some(csign);
        obj.pp_key = pp_key;
        if obj.akm.is_dpp() || self.peer_version >= ProtocolVersion::V2 {
            obj.net_access_key = Some(own.clone());
        }
        Ok(())
    }

    /// Objects received by the last successful Configuration Response
    pub fn config_objects(&self) -> &[ConfigObject] {
        &self.conf.objects
    }

    /// The Configurator asked for a Connection Status Result
    pub fn conn_status_requested(&self) -> bool {
        self.conf.conn_status_requested
    }
}
