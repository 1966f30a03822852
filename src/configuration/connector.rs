// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Signed Connectors
//!
//! A Connector is `base64url(header) "." base64url(payload) "." base64url(r|s)`.
//! The header names the signing key (`kid`) and algorithm; the payload binds
//! a network access key to group/role claims.
//!
//! Verification checks the signature before any payload field is read.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::crypto::{
    b64url_decode, b64url_encode, from_jwk, key_id, sign_raw, to_jwk, verify_raw, EcPrivateKey,
    EcPublicKey,
};
use crate::error::{DppError, Result};

pub const CONNECTOR_TYP: &str = "dppCon";

/// JWS protected header of a Connector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectorHeader {
    pub typ: String,
    pub kid: String,
    pub alg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectorGroup {
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "netRole")]
    pub net_role: String,
}

/// Connector claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectorPayload {
    #[serde(default)]
    pub groups: Vec<ConnectorGroup>,
    #[serde(rename = "netAccessKey")]
    pub net_access_key: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
}

impl ConnectorPayload {
    pub fn new(group_id: &str, net_role: &str, net_access_key: &EcPublicKey) -> Self {
        Self {
            groups: vec![ConnectorGroup {
                group_id: group_id.to_string(),
                net_role: net_role.to_string(),
            }],
            net_access_key: to_jwk(net_access_key, None),
            expiry: None,
            version: None,
        }
    }

    /// Decoded netAccessKey
    pub fn net_access_key(&self) -> Result<EcPublicKey> {
        let (key, _) = from_jwk(&self.net_access_key)
            .map_err(|e| DppError::ConnectorInvalid(format!("netAccessKey: {}", e)))?;
        Ok(key)
    }

    /// Whether any of `peer`'s groups pairs with one of ours
    ///
    /// Groups match on equal ids or a `*` wildcard on either side; roles
    /// must be complementary (sta with ap).
    pub fn matches_groups(&self, peer: &ConnectorPayload) -> bool {
        peer.groups.iter().any(|theirs| {
            debug!(
                "DPP: peer connector group: groupId='{}' netRole='{}'",
                theirs.group_id, theirs.net_role
            );
            self.groups.iter().any(|ours| {
                let same_group = ours.group_id == "*"
                    || theirs.group_id == "*"
                    || ours.group_id == theirs.group_id;
                same_group && compatible_netrole(&ours.net_role, &theirs.net_role)
            })
        })
    }
}

fn compatible_netrole(a: &str, b: &str) -> bool {
    matches!((a, b), ("sta", "ap") | ("ap", "sta"))
}

/// A Connector that passed signature verification
#[derive(Debug, Clone)]
pub struct VerifiedConnector {
    pub header: ConnectorHeader,
    pub payload: ConnectorPayload,
}

/// Sign `payload` with the C-sign key
///
/// # Arguments
///
/// * `csign` - Configurator signing key
/// * `payload` - Connector claims
///
/// # Returns
///
/// The compact `header.payload.signature` string
///
/// # Example
///
/// ```ignore
/// let payload = ConnectorPayload::new("*", "sta", &enrollee_protocol_key);
/// let connector = sign_connector(&configurator.csign, &payload)?;
/// ```
pub fn sign_connector(csign: &EcPrivateKey, payload: &ConnectorPayload) -> Result<String> {
    let public = csign.public_key();
    let header = ConnectorHeader {
        typ: CONNECTOR_TYP.to_string(),
        kid: key_id(&public),
        alg: public.curve().jws_alg.to_string(),
    };

    let header_json = serde_json::to_vec(&header)
        .map_err(|e| DppError::ConnectorInvalid(format!("header encoding: {}", e)))?;
    let payload_json = serde_json::to_vec(payload)
        .map_err(|e| DppError::ConnectorInvalid(format!("payload encoding: {}", e)))?;

    let signed_part = format!(
        "{}.{}",
        b64url_encode(&header_json),
        b64url_encode(&payload_json)
    );
    let signature = sign_raw(csign, signed_part.as_bytes())?;
    Ok(format!("{}.{}", signed_part, b64url_encode(&signature)))
}

/// Verify a Connector against a C-sign public key
///
/// # Arguments
///
/// * `csign` - The signer's public key as received in `cred.csign`
/// * `connector` - Compact Connector string
///
/// # Errors
///
/// `ConnectorInvalid` for any structural, header, signature, payload or
/// expiry failure.
pub fn verify_connector(csign: &EcPublicKey, connector: &str) -> Result<VerifiedConnector> {
    verify_connector_at(csign, connector, Utc::now())
}

pub(crate) fn verify_connector_at(
    csign: &EcPublicKey,
    connector: &str,
    now: DateTime<Utc>,
) -> Result<VerifiedConnector> {
    let invalid = |reason: &str| DppError::ConnectorInvalid(reason.to_string());

    // 1. Three base64url parts, no characters that could not come from JSON-safe encoding
    if connector.contains('"') || connector.contains('\n') {
        return Err(invalid("Unexpected character in signedConnector"));
    }
    let mut parts = connector.split('.');
    let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid("signedConnector is not of the form header.payload.signature"));
    };

    // 2. Protected header
    let header_json =
        b64url_decode(header_b64).ok_or_else(|| invalid("Failed to base64url decode JWS Protected Header"))?;
    let header: ConnectorHeader = serde_json::from_slice(&header_json)
        .map_err(|_| invalid("Failed to parse JWS Protected Header"))?;
    if header.typ != CONNECTOR_TYP {
        return Err(DppError::ConnectorInvalid(format!(
            "Unexpected JWS Protected Header typ={}",
            header.typ
        )));
    }
    if header.alg != csign.curve().jws_alg {
        return Err(DppError::ConnectorInvalid(format!(
            "Unexpected JWS Protected Header alg={} (expected {})",
            header.alg,
            csign.curve().jws_alg
        )));
    }
    if header.kid != key_id(csign) {
        return Err(invalid("JWS Protected Header kid does not match C-sign-key"));
    }

    // 3. Signature over the first two parts as transmitted
    let signature =
        b64url_decode(sig_b64).ok_or_else(|| invalid("Failed to base64url decode JWS Signature"))?;
    let signed_len = header_b64.len() + 1 + payload_b64.len();
    verify_raw(csign, connector[..signed_len].as_bytes(), &signature)
        .map_err(|e| DppError::ConnectorInvalid(format!("signedConnector signature check failed: {}", e)))?;

    // 4. Payload is only read once the signature holds
    let payload_json =
        b64url_decode(payload_b64).ok_or_else(|| invalid("Failed to base64url decode JWS Payload"))?;
    let payload: ConnectorPayload = serde_json::from_slice(&payload_json)
        .map_err(|_| invalid("JSON parsing of connector failed"))?;
    if payload.groups.is_empty() {
        return Err(invalid("Connector includes no groups"));
    }
    if let Some(expiry) = &payload.expiry {
        if key_expired_at(expiry, now) {
            return Err(invalid("Connector (netAccessKey) has expired"));
        }
    }

    Ok(VerifiedConnector { header, payload })
}

/// Read the payload of an own Connector without verifying it
pub fn parse_own_connector(connector: &str) -> Result<ConnectorPayload> {
    let payload_b64 = connector
        .split('.')
        .nth(1)
        .ok_or_else(|| DppError::ConnectorInvalid("Own connector is missing a dot".to_string()))?;
    let payload_json = b64url_decode(payload_b64).ok_or_else(|| {
        DppError::ConnectorInvalid("Failed to base64url decode own signedConnector".to_string())
    })?;
    serde_json::from_slice(&payload_json)
        .map_err(|_| DppError::ConnectorInvalid("Failed to parse local connector".to_string()))
}

/// Connector expiry text for a Unix timestamp (`YYYY-MM-DDTHH:MM:SSZ`)
pub fn format_expiry(epoch_secs: i64) -> Option<String> {
    Utc.timestamp_opt(epoch_secs, 0)
        .single()
        .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// Whether an ISO 8601 expiry has passed; unparsable values count as expired
pub fn key_expired(timestamp: &str) -> bool {
    key_expired_at(timestamp, Utc::now())
}

pub(crate) fn key_expired_at(timestamp: &str, now: DateTime<Utc>) -> bool {
    match parse_expiry(timestamp) {
        Some(expiry) => {
            if now > expiry {
                debug!("DPP: Key has expired ({} < {})", expiry, now);
                true
            } else {
                false
            }
        }
        None => {
            debug!("DPP: Invalid expiry '{}' - assume expired key", timestamp);
            true
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SS` followed by `Z`, nothing, or `+HH[:MM]` / `-HH[:MM]`
fn parse_expiry(timestamp: &str) -> Option<DateTime<Utc>> {
    let base = timestamp.get(..19)?;
    let naive = NaiveDateTime::parse_from_str(base, "%Y-%m-%dT%H:%M:%S").ok()?;
    let mut utc = Utc.from_utc_datetime(&naive).timestamp();

    let tz = &timestamp[19..];
    match tz.chars().next() {
        None | Some('Z') => {}
        Some(sign @ ('+' | '-')) => {
            let mut fields = tz[1..].splitn(2, ':');
            let hours: i64 = fields.next()?.get(..2)?.parse().ok()?;
            let minutes: i64 = match fields.next() {
                Some(m) => m.get(..2)?.parse().ok()?,
                None => 0,
            };
            let offset = hours * 3600 + minutes * 60;
            utc += if sign == '-' { offset } else { -offset };
        }
        Some(_) => return None,
    }
    Utc.timestamp_opt(utc, 0).single()
}
