// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configurator side of the Configuration exchange
//!
//! Processes the Enrollee's Configuration Request and builds the
//! Configuration Response with up to two configuration objects.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::akm::Akm;
use super::configurator::Configurator;
use super::connector::{format_expiry, ConnectorPayload};
use super::params::{ConfiguratorParams, DppConfiguration, NetRole};
use super::request::ConfigAttributes;
use crate::auth::{AuthSession, AuthState};
use crate::crypto::{aead_open, aead_seal, b64_encode, b64url_encode, to_jwk, AES_BLOCK_SIZE};
use crate::error::{DppError, Result};
use crate::protocol::{gas, AttrId, AttrWriter, Attributes, DppStatus, ProtocolVersion};

/// EAP-TLS
const EAP_TYPE_TLS: u8 = 13;

/// What the Configurator does with a Configuration Request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigRequestOutcome {
    /// Send this GAS Initial Response
    Response { frame: Vec<u8>, status: DppStatus },
    /// The Enrollee sent a CSR; call
    /// [`AuthSession::provide_certificate`] once the CA has answered
    AwaitCertificate { peer_id: u32, csr: Vec<u8> },
}

/// Minimal structural check of a DER PKCS#10 request: one SEQUENCE
/// spanning the whole buffer
fn valid_csr(der: &[u8]) -> bool {
    if der.len() < 2 || der[0] != 0x30 {
        return false;
    }
    let (len, header) = match der[1] {
        n if n < 0x80 => (n as usize, 2),
        0x81 if der.len() >= 3 => (der[2] as usize, 3),
        0x82 if der.len() >= 4 => (u16::from_be_bytes([der[2], der[3]]) as usize, 4),
        _ => return false,
    };
    header + len == der.len()
}

impl AuthSession {
    /// Attach the Configurator and provisioning slots used to answer requests
    pub fn set_configurator(&mut self, configurator: Arc<Configurator>, params: ConfiguratorParams) {
        debug!(
            "DPP: Session uses configurator id={} with {} configuration slot(s)",
            configurator.id,
            params.configs.len()
        );
        self.conf.configurator = Some(configurator);
        self.conf.params = Some(params);
    }

    /// Process a Configuration Request (GAS Initial Request frame)
    ///
    /// # Arguments
    ///
    /// * `frame` - The GAS Initial Request starting at the category octet
    ///
    /// # Returns
    ///
    /// The response to send, or a request to fetch a certificate for the
    /// Enrollee's CSR first
    pub fn config_request_rx(&mut self, frame: &[u8]) -> Result<ConfigRequestOutcome> {
        self.conf_req_rx(frame).map_err(|e| self.fail(e))
    }

    fn conf_req_rx(&mut self, frame: &[u8]) -> Result<ConfigRequestOutcome> {
        // 1. Only an authenticated Configurator answers
        if self.state != AuthState::Success || !self.configurator {
            return Err(DppError::InvalidState(format!(
                "Configuration Request needs an authenticated Configurator (state {})",
                self.state
            )));
        }
        let request = gas::parse_initial_request(frame)?;
        self.conf.dialog_token = request.dialog_token;

        // 2. {E-nonce, configAttrib}ke, no AD
        let attrs = Attributes::parse(request.query)
            .map_err(|_| DppError::MalformedFrame("Invalid attribute in config request".to_string()))?;
        let wrapped = attrs.require_min(AttrId::WRAPPED_DATA, AES_BLOCK_SIZE)?;
        let unwrapped = Zeroizing::new(aead_open(self.require_ke()?, wrapped, &[])?);
        let inner = Attributes::parse(&unwrapped).map_err(|_| {
            DppError::MalformedFrame("Invalid attribute in unwrapped data".to_string())
        })?;

        let e_nonce = inner.require_len(AttrId::ENROLLEE_NONCE, self.curve.nonce_len)?;
        self.conf.e_nonce = e_nonce.to_vec();

        let config_attr = inner.require(AttrId::CONFIG_ATTR_OBJ)?;
        let attrib = ConfigAttributes::parse(config_attr)?;
        debug!("DPP: netRole = '{}'", attrib.netrole);
        self.conf.netrole = Some(attrib.netrole);

        if let Some(url) = &attrib.mud_url {
            info!("DPP-MUD-URL {}", url);
        }
        if !attrib.band_support.is_empty() {
            let list: Vec<String> = attrib.band_support.iter().map(i64::to_string).collect();
            info!("DPP-BAND-SUPPORT {}", list.join(","));
        }

        // 3. CSR: forward to the CA, or answer CSR_BAD
        let mut forced = None;
        if let Some(csr) = attrib.csr {
            if !valid_csr(&csr) {
                debug!("DPP: CSR is not valid");
                forced = Some(DppStatus::CsrBad);
            } else {
                let peer_id = self.peer_bi.as_ref().map(|bi| bi.id).unwrap_or(0);
                debug!("DPP: CSR is valid - forward to CA/RA");
                info!("DPP-CSR peer={} csr={}", peer_id, b64_encode(&csr));
                self.conf.waiting_csr = false;
                self.conf.waiting_cert = true;
                self.conf.pending_csr = Some(Zeroizing::new(csr.clone()));
                return Ok(ConfigRequestOutcome::AwaitCertificate { peer_id, csr });
            }
        }

        self.build_conf_resp(attrib.netrole, None, forced)
    }

    /// Finish a request parked on [`ConfigRequestOutcome::AwaitCertificate`]
    ///
    /// # Arguments
    ///
    /// * `certbag` - base64 PKCS#7 bag returned by the CA for the Enrollee's CSR
    pub fn provide_certificate(&mut self, certbag: &str) -> Result<ConfigRequestOutcome> {
        if !self.conf.waiting_cert {
            return Err(DppError::InvalidState(
                "No certificate request pending".to_string(),
            ));
        }
        self.conf.waiting_cert = false;
        self.conf.pending_csr = None;
        let netrole = self.conf.netrole.unwrap_or_default();
        self.build_conf_resp(netrole, Some(certbag), None)
            .map_err(|e| self.fail(e))
    }

    fn build_conf_resp(
        &mut self,
        netrole: NetRole,
        certbag: Option<&str>,
        forced: Option<DppStatus>,
    ) -> Result<ConfigRequestOutcome> {
        let peer_v2 = self.peer_version >= ProtocolVersion::V2;

        // 1. Configuration objects for the two slots of the requested role
        let (conf, conf2) = if forced.is_some() || netrole == NetRole::Configurator {
            (None, None)
        } else {
            let conf = self.try_build_conf_obj(netrole, 0, certbag);
            let conf2 = match &conf {
                Some(_) => self.try_build_conf_obj(netrole, 1, certbag),
                None => None,
            };
            (conf, conf2)
        };

        // 2. Status
        let sta_slot = self
            .conf
            .params
            .as_ref()
            .and_then(|p| p.slot(NetRole::Sta, 0))
            .cloned();
        let status = match forced {
            Some(status) => status,
            None if conf.is_some() => DppStatus::Ok,
            None if certbag.is_none()
                && netrole == NetRole::Sta
                && sta_slot.as_ref().map(|c| c.akm) == Some(Akm::Dot1x)
                && !self.conf.waiting_csr =>
            {
                DppStatus::CsrNeeded
            }
            None => DppStatus::ConfigureFailure,
        };
        self.conf.conf_resp_status = Some(status);

        // 3. {E-nonce, configurationObject.., [sendConnStatus], [CSR attrs]}ke
        let mut clear = AttrWriter::new();
        clear.put(AttrId::ENROLLEE_NONCE, &self.conf.e_nonce);
        if let Some(obj) = &conf {
            clear.put(AttrId::CONFIG_OBJ, obj.as_bytes());
        }
        match &conf2 {
            Some(obj) if peer_v2 => {
                clear.put(AttrId::CONFIG_OBJ, obj.as_bytes());
            }
            Some(_) => debug!(
                "DPP: Second Config Object available, but peer does not support more than one"
            ),
            None => {}
        }

        let send_conn_status = self
            .conf
            .params
            .as_ref()
            .map(|p| p.send_conn_status)
            .unwrap_or(false);
        if peer_v2 && send_conn_status && netrole == NetRole::Sta && status == DppStatus::Ok {
            debug!("DPP: sendConnStatus");
            clear.put(AttrId::SEND_CONN_STATUS, &[]);
            self.conf.send_conn_status = true;
        }

        if status == DppStatus::CsrNeeded {
            if let Some(csrattrs) = sta_slot.as_ref().and_then(|c| c.csrattrs.as_deref()) {
                self.conf.waiting_csr = true;
                debug!("DPP: CSR Attributes Request");
                clear.put(AttrId::CSR_ATTR_REQ, csrattrs.as_bytes());
            }
        }

        // 4. Status in the clear; it is also the AD of the wrapped data
        let mut msg = AttrWriter::new();
        msg.put_status(status);
        let wrapped = aead_seal(self.require_ke()?, clear.as_bytes(), &[msg.as_bytes()])?;
        msg.put(AttrId::WRAPPED_DATA, &wrapped);

        if status == DppStatus::Ok && peer_v2 {
            self.conf.waiting_conf_result = true;
        }
        info!(
            "DPP: Configuration Response status={} objects={}",
            status,
            usize::from(conf.is_some()) + usize::from(conf2.is_some() && peer_v2)
        );

        Ok(ConfigRequestOutcome::Response {
            frame: gas::build_initial_response(
                self.conf.dialog_token,
                gas::WLAN_STATUS_SUCCESS,
                0,
                msg.as_bytes(),
            ),
            status,
        })
    }

    fn try_build_conf_obj(&self, netrole: NetRole, idx: usize, certbag: Option<&str>) -> Option<String> {
        match self.build_conf_obj(netrole, idx, certbag) {
            Ok(obj) => obj.map(|v| v.to_string()),
            Err(e) => {
                warn!("DPP: Failed to build configuration object: {}", e);
                None
            }
        }
    }

    /// Configuration object for slot `idx` of `netrole`, if one is configured
    pub(crate) fn build_conf_obj(
        &self,
        netrole: NetRole,
        idx: usize,
        certbag: Option<&str>,
    ) -> Result<Option<Value>> {
        let Some(conf) = self
            .conf
            .params
            .as_ref()
            .and_then(|p| p.slot(netrole, idx))
        else {
            if idx == 0 {
                debug!("DPP: No configuration available for Enrollee({})", netrole);
            }
            return Ok(None);
        };
        conf.validate()?;

        let configurator = self.conf.configurator.as_ref();
        if conf.akm == Akm::Dot1x {
            if configurator.is_none() {
                warn!("DPP: No Configurator data available");
                return Ok(None);
            }
            if certbag.is_none() && conf.certbag.is_none() {
                debug!("DPP: No certificate data available for dot1x configuration");
                return Ok(None);
            }
        }

        let peer_v2 = self.peer_version >= ProtocolVersion::V2;
        let obj = if conf.akm.is_dpp()
            || ((peer_v2 || conf.akm == Akm::Dot1x) && configurator.is_some())
        {
            self.build_conf_obj_dpp(conf, netrole, certbag)?
        } else {
            self.build_conf_obj_legacy(conf)
        };
        debug!(
            "DPP: Built configuration object {} for ssid '{}' (slot {})",
            conf.akm, conf.ssid, idx
        );
        Ok(Some(obj))
    }

    /// `{wi-fi_tech, discovery}` shared by both object kinds
    fn conf_start(&self, conf: &DppConfiguration) -> Map<String, Value> {
        let mut discovery = Map::new();
        match conf.ssid_charset {
            Some(charset) if self.peer_version >= ProtocolVersion::V2 => {
                discovery.insert("ssid64".to_string(), json!(b64url_encode(conf.ssid.as_bytes())));
                discovery.insert("ssid_charset".to_string(), json!(charset));
            }
            _ => {
                discovery.insert("ssid".to_string(), json!(conf.ssid));
            }
        }

        let mut obj = Map::new();
        obj.insert("wi-fi_tech".to_string(), json!("infra"));
        obj.insert("discovery".to_string(), Value::Object(discovery));
        obj
    }

    fn build_conf_obj_legacy(&self, conf: &DppConfiguration) -> Value {
        let mut cred = Map::new();
        cred.insert("akm".to_string(), json!(conf.akm.as_str()));
        put_legacy_cred(&mut cred, conf);

        let mut obj = self.conf_start(conf);
        obj.insert("cred".to_string(), Value::Object(cred));
        Value::Object(obj)
    }

    fn build_conf_obj_dpp(
        &self,
        conf: &DppConfiguration,
        netrole: NetRole,
        certbag: Option<&str>,
    ) -> Result<Value> {
        let configurator = self.conf.configurator.as_ref().ok_or_else(|| {
            DppError::ConfigurationFailed("No configurator specified".to_string())
        })?;
        let params = self.conf.params.as_ref();
        let peer_v = self.peer_version.as_u8();
        let akm = conf.akm.for_peer_version(peer_v);
        if akm != conf.akm {
            debug!("DPP: Convert DPP+legacy credential to DPP-only for peer that does not support version 2");
        }

        // 1. Connector for the Enrollee's protocol key
        let mut payload =
            ConnectorPayload::new(conf.group_id(), netrole.as_str(), self.peer_protocol()?);
        payload.expiry = conf.expiry.and_then(format_expiry);
        if self.own_version >= ProtocolVersion::V3 {
            payload.version = Some(peer_v);
        }
        let signed_connector = configurator.sign(&payload)?;

        // 2. Credential
        let use_selector = params.map(|p| p.akm_use_selector).unwrap_or(false);
        let akm_text = if use_selector && akm.is_ver2() {
            akm.selector()
        } else {
            akm.as_str()
        };
        let mut cred = Map::new();
        cred.insert("akm".to_string(), json!(akm_text));
        if akm.is_psk() || akm.is_sae() {
            put_legacy_cred(&mut cred, conf);
        }
        if akm == Akm::Dot1x {
            let mut ent = Map::new();
            if let Some(bag) = certbag.or(conf.certbag.as_deref()) {
                ent.insert("certBag".to_string(), json!(bag));
            }
            if let Some(ca) = &conf.cacert {
                ent.insert("caCert".to_string(), json!(ca));
            }
            if let Some(name) = &conf.server_name {
                ent.insert("trustedEapServerName".to_string(), json!(name));
            }
            ent.insert("eapMethods".to_string(), json!([EAP_TYPE_TLS]));
            cred.insert("entCreds".to_string(), Value::Object(ent));
        }
        cred.insert("signedConnector".to_string(), json!(signed_connector));
        cred.insert(
            "csign".to_string(),
            to_jwk(&configurator.csign_public(), Some(configurator.kid.as_str())),
        );
        if self.peer_version >= ProtocolVersion::V2 {
            cred.insert("ppKey".to_string(), to_jwk(&configurator.pp_key_public(), None));
        }

        let mut obj = self.conf_start(conf);
        obj.insert("cred".to_string(), Value::Object(cred));
        Ok(Value::Object(obj))
    }
}

/// `pass` or `psk_hex`
fn put_legacy_cred(cred: &mut Map<String, Value>, conf: &DppConfiguration) {
    if let Some(pass) = &conf.passphrase {
        cred.insert("pass".to_string(), json!(pass));
    } else if let Some(psk) = &conf.psk_hex {
        cred.insert("psk_hex".to_string(), json!(psk.to_ascii_lowercase()));
    }
}
