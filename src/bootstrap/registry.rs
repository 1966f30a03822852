// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory registry of own and peer bootstrapping keys

use std::sync::Arc;

use tracing::{debug, info};

use super::channels::freq_to_op_class_channel;
use super::info::{BootstrapGenParams, BootstrapInfo, BootstrapType};
use super::uri::parse_uri;
use crate::error::{DppError, Result};
use crate::protocol::{AttrId, AttrWriter, Attributes, FrameType, OutgoingFrame, ProtocolVersion};

const SHA256_LEN: usize = 32;

/// Collection of bootstrapping records keyed by id
///
/// Entries are shared with sessions as `Arc`s and never mutated in place;
/// updates swap in a new record.
#[derive(Debug, Default)]
pub struct BootstrapRegistry {
    entries: Vec<Arc<BootstrapInfo>>,
    version: ProtocolVersion,
}

impl BootstrapRegistry {
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            entries: Vec::new(),
            version,
        }
    }

    /// Id for the next record: one above the current maximum
    fn next_id(&self) -> u32 {
        self.entries.iter().map(|bi| bi.id).max().unwrap_or(0) + 1
    }

    /// Register a record and return the shared handle
    pub fn add(&mut self, mut bi: BootstrapInfo) -> Arc<BootstrapInfo> {
        bi.id = self.next_id();
        let bi = Arc::new(bi);
        debug!(
            "DPP: Registered bootstrapping info id={} type={} own={}",
            bi.id, bi.bootstrap_type, bi.own
        );
        self.entries.push(Arc::clone(&bi));
        bi
    }

    /// Parse and register a peer URI read from a QR code
    pub fn add_qr_code(&mut self, uri: &str) -> Result<Arc<BootstrapInfo>> {
        let bi = parse_uri(uri)?;
        Ok(self.add(bi))
    }

    /// Parse and register a peer URI received over NFC
    pub fn add_nfc_uri(&mut self, uri: &str) -> Result<Arc<BootstrapInfo>> {
        let mut bi = parse_uri(uri)?;
        bi.bootstrap_type = BootstrapType::NfcUri;
        Ok(self.add(bi))
    }

    /// Generate an own bootstrapping key and register it
    ///
    /// # Returns
    ///
    /// The id of the new record
    pub fn bootstrap_gen(&mut self, params: &BootstrapGenParams) -> Result<u32> {
        let bi = BootstrapInfo::generate(params, self.version)?;
        let bi = self.add(bi);
        info!("DPP: Generated bootstrapping key id={} curve={}", bi.id, bi.curve.name);
        Ok(bi.id)
    }

    pub fn get(&self, id: u32) -> Option<Arc<BootstrapInfo>> {
        self.entries.iter().find(|bi| bi.id == id).cloned()
    }

    pub fn require(&self, id: u32) -> Result<Arc<BootstrapInfo>> {
        self.get(id).ok_or(DppError::NotFound {
            kind: "bootstrapping info",
            id,
        })
    }

    /// Remove one record by id, or all of them with "*"
    pub fn remove(&mut self, id: &str) -> Result<()> {
        if id == "*" {
            self.entries.clear();
            return Ok(());
        }
        let id: u32 = id
            .parse()
            .map_err(|_| DppError::Config(format!("Invalid bootstrapping id '{}'", id)))?;
        let before = self.entries.len();
        self.entries.retain(|bi| bi.id != id);
        if self.entries.len() == before {
            return Err(DppError::NotFound {
                kind: "bootstrapping info",
                id,
            });
        }
        Ok(())
    }

    pub fn get_uri(&self, id: u32) -> Option<String> {
        self.get(id).map(|bi| bi.uri.clone())
    }

    /// Text summary of a record
    pub fn bootstrap_info(&self, id: u32) -> Result<String> {
        Ok(self.require(id)?.describe())
    }

    /// Attach (or clear) Configurator parameters used when provisioning this peer
    pub fn set_configurator_params(&mut self, id: u32, params: Option<&str>) -> Result<()> {
        let pos = self
            .entries
            .iter()
            .position(|bi| bi.id == id)
            .ok_or(DppError::NotFound {
                kind: "bootstrapping info",
                id,
            })?;
        let mut updated = (*self.entries[pos]).clone();
        updated.configurator_params = params.filter(|p| !p.is_empty()).map(str::to_string);
        self.entries[pos] = Arc::new(updated);
        Ok(())
    }

    /// Match an Authentication Request's key hashes against the registry
    ///
    /// The own record is matched by `r_hash` and the peer record by
    /// `i_hash`; either side may be missing.
    pub fn find_pair(
        &self,
        i_hash: Option<&[u8]>,
        r_hash: &[u8],
    ) -> (Option<Arc<BootstrapInfo>>, Option<Arc<BootstrapInfo>>) {
        let mut own = None;
        let mut peer = None;
        for bi in &self.entries {
            if own.is_none() && bi.own && bi.pubkey_hash.as_slice() == r_hash {
                debug!("DPP: Found matching own bootstrapping information");
                own = Some(Arc::clone(bi));
            }
            if peer.is_none() && !bi.own && i_hash == Some(bi.pubkey_hash.as_slice()) {
                debug!("DPP: Found matching peer bootstrapping information");
                peer = Some(Arc::clone(bi));
            }
            if own.is_some() && peer.is_some() {
                break;
            }
        }
        (own, peer)
    }

    /// Peer record whose chirp hash equals `hash`
    pub fn find_chirp(&self, hash: &[u8]) -> Option<Arc<BootstrapInfo>> {
        self.entries
            .iter()
            .find(|bi| !bi.own && bi.pubkey_hash_chirp.as_slice() == hash)
            .cloned()
    }

    /// Look up the sender of a Presence Announcement
    ///
    /// # Returns
    ///
    /// The matching peer record, or `None` when the chirp is from an unknown device
    pub fn presence_announcement_rx(&self, attrs: &[u8]) -> Result<Option<Arc<BootstrapInfo>>> {
        let attrs = Attributes::parse(attrs)?;
        let hash = attrs.require_len(AttrId::R_BOOTSTRAP_KEY_HASH, SHA256_LEN)?;
        let peer = self.find_chirp(hash);
        match &peer {
            Some(bi) => info!("DPP-CHIRP-RX id={} hash={}", bi.id, hex::encode(hash)),
            None => debug!(
                "DPP: No matching bootstrapping information for chirp {}",
                hex::encode(hash)
            ),
        }
        Ok(peer)
    }

    /// Align an own NFC record with a peer's after negotiated handover
    ///
    /// Picks the first peer channel the own record allows and pins both
    /// records to it, then rekeys the own record onto the peer's curve if
    /// they differ.
    pub fn nfc_update_bi(&mut self, own_id: u32, peer_id: u32) -> Result<()> {
        let mut own = (*self.require(own_id)?).clone();
        let mut peer = (*self.require(peer_id)?).clone();
        if !own.own || peer.own {
            return Err(DppError::InvalidState(
                "NFC handover needs one own and one peer record".to_string(),
            ));
        }

        // 1. Negotiation channel
        let mut regenerate = false;
        if !peer.freqs.is_empty() || peer.channels_listed {
            let own_unconstrained = own.freqs.is_empty() && !own.channels_listed;
            let freq = peer
                .freqs
                .iter()
                .copied()
                .find(|f| own_unconstrained || own.freqs.contains(f))
                .ok_or_else(|| DppError::Config("No common channel found".to_string()))?;
            match freq_to_op_class_channel(freq) {
                Some((op_class, channel)) => debug!(
                    "DPP: Selected {} MHz (op_class {} channel {}) as the negotiation channel",
                    freq, op_class, channel
                ),
                None => debug!(
                    "DPP: Could not determine operating class or channel number for {} MHz",
                    freq
                ),
            }
            own.pin_freq(freq);
            peer.pin_freq(freq);
            regenerate = true;
        }

        // 2. Curve
        if own.curve.id != peer.curve.id {
            debug!("DPP: Update own bootstrapping key to match peer curve from NFC handover");
            if let Err(e) = own.rekey(peer.curve, self.version) {
                self.entries.retain(|bi| bi.id != own_id);
                return Err(e);
            }
        } else if regenerate {
            own.uri = super::uri::gen_uri(&own, self.version);
        }

        self.replace(own);
        self.replace(peer);
        Ok(())
    }

    fn replace(&mut self, bi: BootstrapInfo) {
        if let Some(slot) = self.entries.iter_mut().find(|e| e.id == bi.id) {
            *slot = Arc::new(bi);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<BootstrapInfo>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Presence Announcement advertising an own key's chirp hash
pub fn build_presence_announcement(bi: &BootstrapInfo) -> OutgoingFrame {
    debug!("DPP: Build Presence Announcement frame");
    let mut attrs = AttrWriter::new();
    attrs.put(AttrId::R_BOOTSTRAP_KEY_HASH, &bi.pubkey_hash_chirp);
    OutgoingFrame::new(FrameType::PresenceAnnouncement, attrs.into_bytes())
}
