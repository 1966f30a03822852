// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bootstrapping information records

use std::fmt;

use serde::{Deserialize, Serialize};

use super::channels::freq_to_op_class_channel;
use super::uri::{gen_uri, parse_chan_list, parse_mac, valid_info, ChannelList};
use crate::crypto::{CurveParams, EcPrivateKey, EcPublicKey};
use crate::error::{DppError, Result};
use crate::protocol::ProtocolVersion;

/// How the bootstrapping key was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BootstrapType {
    #[serde(rename = "qrcode")]
    QrCode,
    Pkex,
    NfcUri,
}

impl BootstrapType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QrCode => "QRCODE",
            Self::Pkex => "PKEX",
            Self::NfcUri => "NFC-URI",
        }
    }

    /// Parse the lowercase form used by `bootstrap_gen` ("qrcode", "pkex", "nfc-uri")
    pub fn from_param(s: &str) -> Option<Self> {
        match s {
            "qrcode" => Some(Self::QrCode),
            "pkex" => Some(Self::Pkex),
            "nfc-uri" => Some(Self::NfcUri),
            _ => None,
        }
    }
}

impl fmt::Display for BootstrapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bootstrapping key together with the URI metadata around it
#[derive(Debug, Clone)]
pub struct BootstrapInfo {
    /// Registry id; zero until the record is registered
    pub id: u32,
    pub bootstrap_type: BootstrapType,
    /// Whether the private key is held locally
    pub own: bool,
    pub uri: String,
    /// Raw channel list text ("81/1,6")
    pub chan: Option<String>,
    pub freqs: Vec<u32>,
    pub channels_listed: bool,
    pub mac_addr: Option<[u8; 6]>,
    pub info: Option<String>,
    /// Version advertised in the URI "V:" field
    pub version: Option<u8>,
    pub curve: &'static CurveParams,
    pub public_key: EcPublicKey,
    private_key: Option<EcPrivateKey>,
    pub pubkey_hash: [u8; 32],
    pub pubkey_hash_chirp: [u8; 32],
    /// Configurator parameters applied when this peer is provisioned
    pub configurator_params: Option<String>,
}

/// Parameters for generating an own bootstrapping key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapGenParams {
    #[serde(default)]
    pub bootstrap_type: Option<BootstrapType>,
    /// Channel list in URI form ("81/1,6")
    #[serde(default)]
    pub chan: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
    /// Curve name; P-256 when absent
    #[serde(default)]
    pub curve: Option<String>,
    /// Private scalar in hex; generated when absent
    #[serde(default)]
    pub key: Option<String>,
}

impl BootstrapInfo {
    /// Record for a peer key read from a URI
    pub(crate) fn from_peer_key(public_key: EcPublicKey, uri: String) -> Self {
        let curve = public_key.curve();
        Self {
            id: 0,
            bootstrap_type: BootstrapType::QrCode,
            own: false,
            uri,
            chan: None,
            freqs: Vec::new(),
            channels_listed: false,
            mac_addr: None,
            info: None,
            version: None,
            curve,
            pubkey_hash: public_key.bootstrap_hash(),
            pubkey_hash_chirp: public_key.chirp_hash(),
            public_key,
            private_key: None,
            configurator_params: None,
        }
    }

    /// Generate (or load) an own bootstrapping key and its URI
    ///
    /// # Arguments
    ///
    /// * `params` - Type, curve, optional key and URI metadata
    /// * `version` - Protocol version advertised in the URI
    ///
    /// # Returns
    ///
    /// An unregistered record (id 0) with `uri` populated
    pub fn generate(params: &BootstrapGenParams, version: ProtocolVersion) -> Result<Self> {
        // 1. Resolve the curve and key
        let curve = match params.curve.as_deref() {
            Some(name) => CurveParams::by_name(name)
                .ok_or_else(|| DppError::UnsupportedCurve(name.to_string()))?,
            None => CurveParams::default_curve(),
        };
        let private_key = match params.key.as_deref() {
            Some(hex_key) => EcPrivateKey::from_hex(curve, hex_key)?,
            None => EcPrivateKey::generate(curve)?,
        };
        let public_key = private_key.public_key();

        // 2. Validate URI metadata
        let ChannelList {
            freqs,
            channels_listed,
        } = match params.chan.as_deref() {
            Some(chan) => parse_chan_list(chan)?,
            None => ChannelList::default(),
        };
        let mac_addr = params.mac.as_deref().map(parse_mac).transpose()?;
        if let Some(info) = params.info.as_deref() {
            if !valid_info(info) {
                return Err(DppError::InvalidUri(
                    "Invalid URI information payload".to_string(),
                ));
            }
        }

        // 3. Build the record and its URI
        let mut bi = Self::from_peer_key(public_key, String::new());
        bi.bootstrap_type = params.bootstrap_type.unwrap_or(BootstrapType::QrCode);
        bi.own = true;
        bi.private_key = Some(private_key);
        bi.chan = params.chan.clone();
        bi.freqs = freqs;
        bi.channels_listed = channels_listed;
        bi.mac_addr = mac_addr;
        bi.info = params.info.clone();
        bi.version = Some(version.as_u8());
        bi.uri = gen_uri(&bi, version);
        Ok(bi)
    }

    pub fn private_key(&self) -> Result<&EcPrivateKey> {
        self.private_key.as_ref().ok_or_else(|| {
            DppError::InvalidState(format!(
                "No private key for bootstrapping info {}",
                self.id
            ))
        })
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// The single frequency to use when exactly one is listed
    pub fn use_freq(&self) -> Option<u32> {
        match self.freqs.as_slice() {
            [freq] => Some(*freq),
            _ => None,
        }
    }

    /// Text summary of the record
    pub fn describe(&self) -> String {
        let mac = self.mac_addr.unwrap_or([0u8; 6]);
        format!(
            "type={}\nmac_addr={}\ninfo={}\nnum_freq={}\nuse_freq={}\ncurve={}\npkhash={}\nversion={}\n",
            self.bootstrap_type,
            format_mac(&mac),
            self.info.as_deref().unwrap_or(""),
            self.freqs.len(),
            self.use_freq().unwrap_or(0),
            self.curve.name,
            hex::encode(self.pubkey_hash),
            self.version.unwrap_or(0),
        )
    }

    /// Replace the private key with a fresh one on `curve` and regenerate the URI
    pub(crate) fn rekey(&mut self, curve: &'static CurveParams, version: ProtocolVersion) -> Result<()> {
        let private_key = EcPrivateKey::generate(curve)?;
        let public_key = private_key.public_key();
        self.curve = curve;
        self.pubkey_hash = public_key.bootstrap_hash();
        self.pubkey_hash_chirp = public_key.chirp_hash();
        self.public_key = public_key;
        self.private_key = Some(private_key);
        self.uri = gen_uri(self, version);
        Ok(())
    }

    /// Pin the record to a single negotiation frequency
    pub(crate) fn pin_freq(&mut self, freq: u32) {
        self.freqs = vec![freq];
        self.chan = freq_to_op_class_channel(freq).map(|(op, ch)| format!("{}/{}", op, ch));
    }
}

pub fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}
