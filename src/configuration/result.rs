// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration Result and Connection Status Result frames

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::params::SSID_MAX_LEN;
use crate::auth::{Action, AuthSession, AuthState, AwaitReason};
use crate::crypto::{b64url_decode, b64url_encode};
use crate::error::{DppError, Result};
use crate::protocol::{AttrId, AttrWriter, Attributes, DppStatus, FrameType, OutgoingFrame};

/// Connection Status Result reported by the Enrollee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnStatusResult {
    pub result: u8,
    pub ssid: Vec<u8>,
    pub channel_list: Option<String>,
}

impl ConnStatusResult {
    /// connStatus JSON object
    pub fn to_json(&self) -> String {
        let mut obj = Map::new();
        obj.insert("result".to_string(), json!(self.result));
        if !self.ssid.is_empty() {
            obj.insert("ssid64".to_string(), json!(b64url_encode(&self.ssid)));
        }
        if let Some(list) = &self.channel_list {
            obj.insert("channelList".to_string(), json!(list));
        }
        Value::Object(obj).to_string()
    }

    /// Parse the connStatus JSON object
    pub fn parse(text: &[u8]) -> Result<Self> {
        let invalid = |reason: &str| DppError::invalid(AttrId::CONN_STATUS, reason);
        let root: Value =
            serde_json::from_slice(text).map_err(|_| invalid("Failed to parse connStatus"))?;

        let result = root
            .get("result")
            .and_then(Value::as_u64)
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| invalid("No connStatus - result"))?;

        let ssid = match root.get("ssid64").and_then(Value::as_str) {
            Some(ssid64) => {
                let ssid = b64url_decode(ssid64).ok_or_else(|| invalid("Invalid connStatus - ssid64"))?;
                if ssid.len() > SSID_MAX_LEN {
                    return Err(invalid("Too long connStatus - ssid64"));
                }
                ssid
            }
            None => Vec::new(),
        };

        let channel_list = match root.get("channelList").and_then(Value::as_str) {
            Some(list)
                if list
                    .chars()
                    .all(|c| c.is_ascii_digit() || c == '/' || c == ',') =>
            {
                Some(list.to_string())
            }
            Some(_) => return Err(invalid("Invalid connStatus - channelList")),
            None => None,
        };

        Ok(Self {
            result,
            ssid,
            channel_list,
        })
    }
}

impl AuthSession {
    fn require_enrollee_nonce(&self) -> Result<()> {
        if self.state != AuthState::Success || self.configurator || self.conf.e_nonce.is_empty() {
            return Err(DppError::InvalidState(
                "No completed Configuration exchange".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the Configuration Result the Enrollee sends after applying (or
    /// rejecting) the received configuration
    ///
    /// # Arguments
    ///
    /// * `status` - `Ok` when the configuration was accepted
    pub fn build_conf_result(&self, status: DppStatus) -> Result<OutgoingFrame> {
        self.require_enrollee_nonce()?;

        let mut inner = AttrWriter::new();
        inner
            .put_status(status)
            .put(AttrId::ENROLLEE_NONCE, &self.conf.e_nonce);

        debug!("DPP: Building Configuration Result status={}", status);
        self.finish_frame(
            FrameType::ConfigurationResult,
            AttrWriter::new(),
            self.require_ke()?,
            inner.as_bytes(),
        )
    }

    /// Build the Connection Status Result after a connection attempt
    ///
    /// # Arguments
    ///
    /// * `result` - Outcome of the connection attempt (`Ok`, `NoAp`, ...)
    /// * `ssid` - Network the Enrollee tried
    /// * `channel_list` - Channels the network was found on (`81/1,6`)
    pub fn build_conn_status_result(
        &self,
        result: DppStatus,
        ssid: Option<&[u8]>,
        channel_list: Option<&str>,
    ) -> Result<OutgoingFrame> {
        self.require_enrollee_nonce()?;

        let status = ConnStatusResult {
            result: result.as_u8(),
            ssid: ssid.map(<[u8]>::to_vec).unwrap_or_default(),
            channel_list: channel_list.map(str::to_string),
        };
        let json = status.to_json();
        debug!("DPP: connStatus JSON: {}", json);

        let mut inner = AttrWriter::new();
        inner
            .put(AttrId::ENROLLEE_NONCE, &self.conf.e_nonce)
            .put(AttrId::CONN_STATUS, json.as_bytes());

        self.finish_frame(
            FrameType::ConnectionStatusResult,
            AttrWriter::new(),
            self.require_ke()?,
            inner.as_bytes(),
        )
    }

    fn open_result(&self, hdr: &[u8], attrs: &Attributes<'_>) -> Result<Zeroizing<Vec<u8>>> {
        let wrapped = attrs.require(AttrId::WRAPPED_DATA)?;
        let unwrapped = Self::open_wrapped(self.require_ke()?, hdr, attrs.before_wrapped(), wrapped)?;
        Ok(Zeroizing::new(unwrapped))
    }

    fn check_e_nonce(&self, inner: &Attributes<'_>) -> Result<()> {
        let e_nonce = inner.require_len(AttrId::ENROLLEE_NONCE, self.curve.nonce_len)?;
        if e_nonce != self.conf.e_nonce.as_slice() {
            return Err(DppError::invalid(
                AttrId::ENROLLEE_NONCE,
                "Enrollee Nonce mismatch",
            ));
        }
        Ok(())
    }

    /// Configurator: Configuration Result received
    pub(crate) fn conf_result_rx(&mut self, hdr: &[u8], attrs: &[u8]) -> Result<Action> {
        if !self.conf.waiting_conf_result {
            warn!("DPP: Not waiting for a Configuration Result - ignore");
            return Ok(Action::AwaitExternalEvent(AwaitReason::PeerFrame));
        }
        self.conf.waiting_conf_result = false;

        let attrs = Attributes::parse(attrs)?;
        let unwrapped = self.open_result(hdr, &attrs)?;
        let inner = Attributes::parse(&unwrapped)?;
        self.check_e_nonce(&inner)?;
        let status = inner.status()?;
        self.conf.conf_result = Some(status);

        info!("DPP-CONF-SENT status={}", status);
        if status != DppStatus::Ok {
            return Ok(Action::SessionComplete(Err(DppError::PeerStatus(status))));
        }
        if self.conf.send_conn_status {
            debug!("DPP: Wait for Connection Status Result");
            self.conf.waiting_conn_status_result = true;
            return Ok(Action::AwaitExternalEvent(AwaitReason::PeerFrame));
        }
        Ok(Action::SessionComplete(Ok(())))
    }

    /// Configurator: Connection Status Result received
    pub(crate) fn conn_status_result_rx(&mut self, hdr: &[u8], attrs: &[u8]) -> Result<Action> {
        if !self.conf.waiting_conn_status_result {
            warn!("DPP: Not waiting for a Connection Status Result - ignore");
            return Ok(Action::AwaitExternalEvent(AwaitReason::PeerFrame));
        }
        self.conf.waiting_conn_status_result = false;

        let attrs = Attributes::parse(attrs)?;
        let unwrapped = self.open_result(hdr, &attrs)?;
        let inner = Attributes::parse(&unwrapped)?;
        self.check_e_nonce(&inner)?;
        let status = ConnStatusResult::parse(inner.require(AttrId::CONN_STATUS)?)?;

        info!(
            "DPP-CONN-STATUS-RESULT result={} ssid={} channel_list={}",
            status.result,
            String::from_utf8_lossy(&status.ssid),
            status.channel_list.as_deref().unwrap_or("")
        );
        self.conf.conn_status = Some(status);
        Ok(Action::SessionComplete(Ok(())))
    }

    /// Status carried by the Configuration Result, once received
    pub fn conf_result(&self) -> Option<DppStatus> {
        self.conf.conf_result
    }

    pub fn conn_status_result(&self) -> Option<&ConnStatusResult> {
        self.conf.conn_status.as_ref()
    }
}
