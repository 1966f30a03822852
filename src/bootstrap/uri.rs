// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DPP bootstrapping URI
//!
//! `DPP:[C:<op>/<ch>[,<ch>]..;][M:<mac>;][I:<info>;][V:<ver>;]K:<base64 SPKI>;;`
//!
//! Each field runs up to the next ';'. The first occurrence of a field is
//! used, later duplicates and unknown fields are ignored.

use tracing::{debug, warn};

use super::channels::{chan_to_freq, DPP_BOOTSTRAP_MAX_FREQ};
use super::info::BootstrapInfo;
use crate::crypto::jwk::{b64_decode, b64_encode};
use crate::crypto::EcPublicKey;
use crate::error::{DppError, Result};
use crate::protocol::ProtocolVersion;

pub const DPP_URI_PREFIX: &str = "DPP:";

/// Frequencies decoded from a URI "C:" field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelList {
    pub freqs: Vec<u32>,
    /// Set once any channel entry was present, even if none was usable
    pub channels_listed: bool,
}

fn uri_err(reason: &str) -> DppError {
    DppError::InvalidUri(reason.to_string())
}

fn parse_number(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Parse a channel list such as `81/1,6,115/36`
///
/// An operating class carries over to later bare channel numbers. Entries
/// that do not map to a known frequency are skipped. A list that grows
/// past the frequency cap is dropped entirely.
pub fn parse_chan_list(list: &str) -> Result<ChannelList> {
    let mut out = ChannelList::default();
    if list.is_empty() {
        return Ok(out);
    }

    let mut op_class: Option<u32> = None;
    let entries: Vec<&str> = list.split(',').collect();
    let last = entries.len() - 1;
    for (idx, entry) in entries.iter().enumerate() {
        // A trailing comma leaves an empty final entry
        if entry.is_empty() && idx == last && idx > 0 {
            break;
        }
        let channel = match entry.split_once('/') {
            Some((op, ch)) => {
                op_class = Some(parse_number(op).ok_or_else(|| uri_err("Invalid channel list"))?);
                ch
            }
            None => entry,
        };
        let op = match op_class {
            Some(op) if op > 0 => op,
            _ => return Err(uri_err("Invalid channel list")),
        };
        let ch = match parse_number(channel) {
            Some(ch) if ch > 0 => ch,
            _ => return Err(uri_err("Invalid channel list")),
        };
        out.channels_listed = true;

        let freq = match (u8::try_from(op), u8::try_from(ch)) {
            (Ok(op), Ok(ch)) => chan_to_freq(op, ch),
            _ => None,
        };
        let Some(freq) = freq else {
            debug!("DPP: Ignore unknown URI channel: opclass={} channel={}", op, ch);
            continue;
        };

        debug!("DPP: URI channel: opclass={} channel={} freq={}", op, ch, freq);
        if out.freqs.len() == DPP_BOOTSTRAP_MAX_FREQ {
            debug!("DPP: Too many channels in URI channel-list - ignore list");
            out.freqs.clear();
            break;
        }
        out.freqs.push(freq);
    }

    Ok(out)
}

/// Parse a MAC address of twelve hex digits, optionally separated by ':', '-' or '.'
pub fn parse_mac(text: &str) -> Result<[u8; 6]> {
    let mut digits = text.bytes().filter(|b| !matches!(b, b':' | b'-' | b'.'));
    let mut mac = [0u8; 6];
    for octet in mac.iter_mut() {
        let hi = digits.next().and_then(|b| (b as char).to_digit(16));
        let lo = digits.next().and_then(|b| (b as char).to_digit(16));
        match (hi, lo) {
            (Some(hi), Some(lo)) => *octet = ((hi << 4) | lo) as u8,
            _ => return Err(uri_err("Invalid URI mac")),
        }
    }
    if digits.next().is_some() {
        return Err(uri_err("Invalid URI mac"));
    }
    Ok(mac)
}

/// Information text must be printable ASCII without ';'
pub fn valid_info(info: &str) -> bool {
    info.bytes().all(|b| (0x20..=0x7e).contains(&b) && b != b';')
}

fn parse_version(text: &str) -> Option<u8> {
    match text.as_bytes().first() {
        Some(b @ b'1'..=b'3') => Some(b - b'0'),
        _ => {
            warn!("DPP: Unsupported URI version '{}' - ignore", text);
            None
        }
    }
}

/// Parse a bootstrapping URI into an unregistered peer record
///
/// # Arguments
///
/// * `uri` - The full URI text starting with "DPP:"
///
/// # Returns
///
/// A `BootstrapInfo` with `own == false` and no private key
///
/// # Example
///
/// ```ignore
/// let bi = parse_uri("DPP:C:81/1;K:MDkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDIgAC...;;")?;
/// assert_eq!(bi.freqs, vec![2412]);
/// ```
pub fn parse_uri(uri: &str) -> Result<BootstrapInfo> {
    let body = uri
        .strip_prefix(DPP_URI_PREFIX)
        .ok_or_else(|| uri_err("QR Code URI does not start with DPP:"))?;

    let mut chan_list = None;
    let mut mac = None;
    let mut info = None;
    let mut pk = None;
    let mut version = None;

    // 1. Split into ';'-terminated fields; an unterminated tail is not a field
    let mut rest = body;
    while let Some((field, tail)) = rest.split_once(';') {
        rest = tail;
        if field.is_empty() {
            continue;
        }
        let slot = match field.get(..2) {
            Some("C:") => &mut chan_list,
            Some("M:") => &mut mac,
            Some("I:") => &mut info,
            Some("K:") => &mut pk,
            Some("V:") => &mut version,
            _ => {
                debug!("DPP: Ignore unrecognized URI parameter: {}", field);
                continue;
            }
        };
        if slot.is_none() {
            *slot = Some(&field[2..]);
        }
    }

    // 2. The public key is mandatory
    let pk = pk.ok_or_else(|| uri_err("URI missing public-key"))?;
    let der = b64_decode(pk).ok_or_else(|| uri_err("Invalid URI public-key encoding"))?;
    let public_key = EcPublicKey::from_spki_der(&der).map_err(|e| {
        debug!("DPP: URI public-key rejected: {}", e);
        uri_err("Invalid URI public-key")
    })?;

    let mut bi = BootstrapInfo::from_peer_key(public_key, uri.to_string());

    // 3. Optional metadata
    if let Some(chan) = chan_list {
        let list = parse_chan_list(chan)?;
        bi.chan = Some(chan.to_string());
        bi.freqs = list.freqs;
        bi.channels_listed = list.channels_listed;
    }
    if let Some(mac) = mac {
        bi.mac_addr = Some(parse_mac(mac)?);
    }
    if let Some(info) = info {
        if !valid_info(info) {
            return Err(uri_err("Invalid URI information payload"));
        }
        bi.info = Some(info.to_string());
    }
    if let Some(version) = version {
        bi.version = parse_version(version);
    }

    debug!(
        "DPP: Parsed URI curve={} freqs={:?} version={:?}",
        bi.curve.name, bi.freqs, bi.version
    );
    Ok(bi)
}

/// Build the URI for an own bootstrapping record
pub fn gen_uri(bi: &BootstrapInfo, version: ProtocolVersion) -> String {
    let mut uri = String::from(DPP_URI_PREFIX);
    if let Some(chan) = bi.chan.as_deref().filter(|c| !c.is_empty()) {
        uri.push_str(&format!("C:{};", chan));
    }
    if let Some(mac) = bi.mac_addr.filter(|m| m.iter().any(|b| *b != 0)) {
        uri.push_str(&format!("M:{};", hex::encode(mac)));
    }
    if let Some(info) = bi.info.as_deref().filter(|i| !i.is_empty()) {
        uri.push_str(&format!("I:{};", info));
    }
    if version.has_version_attr() {
        uri.push_str(&format!("V:{};", version.as_u8()));
    }
    uri.push_str(&format!("K:{};;", b64_encode(&bi.public_key.to_spki_der())));
    uri
}
