// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Responder side of DPP Authentication

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{secret, Action, AuthSession, AuthState, Role, SessionOptions};
use crate::bootstrap::{chan_to_freq, BootstrapInfo, BootstrapRegistry, BootstrapType};
use crate::crypto::{
    aead_open, aead_seal, derive_bk_ke, derive_k1, derive_k2, ecdh, responder_lx, tags_match,
    EcPrivateKey, EcPublicKey, AES_BLOCK_SIZE,
};
use crate::error::{DppError, Result};
use crate::protocol::{
    select_responder_role, AttrId, AttrWriter, Attributes, DppStatus, FrameType, OutgoingFrame,
    ProtocolVersion, RoleSelection, CAPAB_CONFIGURATOR, CAPAB_ENROLLEE,
};

const SHA256_LEN: usize = 32;

/// Process an Authentication Request addressed to one of our bootstrapping keys
///
/// # Arguments
///
/// * `registry` - Own and peer bootstrapping keys
/// * `options` - Role policy, mutual QR requirement and protocol version
/// * `hdr` - The six header octets of the request
/// * `buf` - The request's attribute octets
///
/// # Returns
///
/// A new Responder session and the action to take. Requests that cannot be
/// tied to an own key, or that fail before a shared key exists, are
/// returned as errors and no session is kept.
pub fn auth_req_rx(
    registry: &BootstrapRegistry,
    options: &SessionOptions,
    hdr: &[u8],
    buf: &[u8],
) -> Result<(AuthSession, Action)> {
    // 1. Structure and bootstrapping key lookup
    let attrs = Attributes::parse(buf)?;
    let r_hash = attrs.require_len(AttrId::R_BOOTSTRAP_KEY_HASH, SHA256_LEN)?;
    let i_hash = attrs.optional_len(AttrId::I_BOOTSTRAP_KEY_HASH, SHA256_LEN)?;

    let (own_bi, peer_bi) = registry.find_pair(i_hash, r_hash);
    let own_bi = own_bi.ok_or_else(|| {
        DppError::InvalidState(
            "No matching own bootstrapping key found - ignore message".to_string(),
        )
    })?;
    own_bi.curve.ensure_supported()?;

    let mut session = AuthSession::new(Role::Responder, options, own_bi.curve);
    session.own_bi = Some(own_bi);
    session.peer_bi = peer_bi;
    session.state = AuthState::ReqReceived;

    match session.process_auth_req(hdr, &attrs, i_hash) {
        Ok(action) => Ok((session, action)),
        Err(e) => Err(session.fail(e)),
    }
}

impl AuthSession {
    fn process_auth_req(
        &mut self,
        hdr: &[u8],
        attrs: &Attributes<'_>,
        i_hash: Option<&[u8]>,
    ) -> Result<Action> {
        let wrapped = attrs
            .wrapped()
            .filter(|w| w.len() >= AES_BLOCK_SIZE)
            .ok_or(DppError::MissingAttribute(AttrId::WRAPPED_DATA))?;

        // 2. Version and channel
        self.peer_version = ProtocolVersion::V1;
        if self.own_version.has_version_attr() {
            if let Some(version) = attrs.get(AttrId::PROTOCOL_VERSION) {
                self.peer_version = version
                    .first()
                    .copied()
                    .and_then(ProtocolVersion::from_wire)
                    .ok_or_else(|| {
                        DppError::invalid(
                            AttrId::PROTOCOL_VERSION,
                            "Invalid Protocol Version attribute",
                        )
                    })?;
            }
        }

        if let Some(channel) = attrs.get(AttrId::CHANNEL) {
            if channel.len() != 2 {
                return Err(DppError::invalid(AttrId::CHANNEL, "Invalid channel attribute"));
            }
            let freq = chan_to_freq(channel[0], channel[1]).ok_or_else(|| {
                DppError::invalid(AttrId::CHANNEL, "Unsupported Channel attribute value")
            })?;
            debug!(
                "DPP: Initiator requested channel op_class {} channel {} ({} MHz)",
                channel[0], channel[1], freq
            );
            self.curr_freq = Some(freq);
        }

        // 3. M, k1 and the wrapped data
        let i_proto = attrs.require_len(AttrId::I_PROTOCOL_KEY, 2 * self.curve.prime_len)?;
        let peer_protocol = EcPublicKey::from_xy(self.curve, i_proto).map_err(|_| {
            DppError::invalid(AttrId::I_PROTOCOL_KEY, "Invalid Initiator Protocol Key")
        })?;
        let own_bi = self.require_own_bi()?;
        let mx = ecdh(own_bi.private_key()?, &peer_protocol)?;
        self.peer_protocol_key = Some(peer_protocol);
        self.secrets.k1 = Some(derive_k1(self.curve, &mx)?);
        self.secrets.mx = Some(mx);

        let k1 = secret(&self.secrets.k1, "k1")?;
        let unwrapped = Self::open_wrapped(k1, hdr, attrs.before_wrapped(), wrapped)?;
        let inner = Attributes::parse(&unwrapped).map_err(|_| {
            DppError::MalformedFrame("Invalid attribute in unwrapped data".to_string())
        })?;
        let i_nonce = inner.require_len(AttrId::I_NONCE, self.curve.nonce_len)?;
        self.i_nonce = i_nonce.to_vec();
        self.i_capab = inner.require_min(AttrId::I_CAPABILITIES, 1)?[0];

        // 4. Role selection
        match select_responder_role(self.allowed_roles, self.i_capab) {
            RoleSelection::Selected { configurator } => {
                self.configurator = configurator;
                debug!(
                    "DPP: Acting as {}",
                    if configurator { "Configurator" } else { "Enrollee" }
                );
            }
            RoleSelection::NotCompatible => {
                info!("DPP-NOT-COMPATIBLE i-capab=0x{:02x}", self.i_capab);
                self.r_capab = self.allowed_roles.capab_bits();
                let frame = self.build_auth_resp_status(DppStatus::NotCompatible)?;
                let err = self.fail(DppError::RoleIncompatible(format!(
                    "No compatible role for i-capab=0x{:02x}",
                    self.i_capab
                )));
                return Ok(Action::ReplyWithFrame {
                    frame,
                    completion: Some(Err(err)),
                });
            }
            RoleSelection::Invalid => {
                return Err(DppError::RoleIncompatible(format!(
                    "Invalid role in I-capabilities 0x{:02x}",
                    self.i_capab
                )));
            }
        }
        self.r_capab = if self.configurator {
            CAPAB_CONFIGURATOR
        } else {
            CAPAB_ENROLLEE
        };

        // 5. Mutual QR authentication without the peer's key: ask for more time
        if let Some(i_hash) = i_hash {
            if self.qr_mutual
                && self.peer_bi.is_none()
                && self.require_own_bi()?.bootstrap_type == BootstrapType::QrCode
            {
                debug!(
                    "DPP: Mutual authentication required with QR Codes, but peer info is not yet available - request more time"
                );
                let frame = self.build_auth_resp_status(DppStatus::ResponsePending)?;
                let mut hash = [0u8; SHA256_LEN];
                hash.copy_from_slice(i_hash);
                self.waiting_pubkey_hash = Some(hash);
                self.state = AuthState::ResponsePending;
                info!("DPP-SCAN-PEER-QR-CODE {}", hex::encode(hash));
                return Ok(Action::ReplyWithFrame {
                    frame,
                    completion: None,
                });
            }
        }

        let frame = self.build_auth_resp_ok()?;
        Ok(Action::ReplyWithFrame {
            frame,
            completion: None,
        })
    }

    fn require_own_bi(&self) -> Result<Arc<BootstrapInfo>> {
        self.own_bi
            .clone()
            .ok_or_else(|| DppError::InvalidState("No own bootstrapping key".to_string()))
    }

    /// Resume a parked Responder once the Initiator's QR code is known
    ///
    /// # Returns
    ///
    /// `None` when the key is not the one this session waits for, otherwise
    /// the action carrying the full Authentication Response
    pub fn notify_new_qr_code(&mut self, peer_bi: &Arc<BootstrapInfo>) -> Option<Action> {
        if self.role != Role::Responder || self.state != AuthState::ResponsePending {
            return None;
        }
        if self.waiting_pubkey_hash != Some(peer_bi.pubkey_hash) {
            return None;
        }
        info!(
            "DPP: New scanned QR Code has matching public key that was needed to continue DPP Authentication exchange (id={})",
            peer_bi.id
        );
        self.peer_bi = Some(Arc::clone(peer_bi));
        self.waiting_pubkey_hash = None;
        match self.build_auth_resp_ok() {
            Ok(frame) => Some(Action::ReplyWithFrame {
                frame,
                completion: None,
            }),
            Err(e) => Some(Action::FatalDrop(self.fail(e))),
        }
    }

    /// Full Authentication Response: N, k2, optional L, bk/ke and R-auth
    pub(super) fn build_auth_resp_ok(&mut self) -> Result<OutgoingFrame> {
        self.r_nonce = self.gen_nonce();
        let protocol_key = EcPrivateKey::generate(self.curve)?;
        let nx = ecdh(&protocol_key, self.peer_protocol()?)?;
        self.secrets.k2 = Some(derive_k2(self.curve, &nx)?);
        self.secrets.nx = Some(nx);

        if let Some(peer_bi) = &self.peer_bi {
            let own_bi = self.require_own_bi()?;
            let lx = responder_lx(own_bi.private_key()?, &protocol_key, &peer_bi.public_key)?;
            self.secrets.lx = Some(lx);
        }
        self.own_protocol_key = Some(protocol_key);

        let (bk, ke) = derive_bk_ke(
            self.curve,
            &self.i_nonce,
            &self.r_nonce,
            secret(&self.secrets.mx, "Mx")?,
            secret(&self.secrets.nx, "Nx")?,
            self.secrets.lx.as_deref().map(Vec::as_slice),
        )?;
        self.secrets.bk = Some(bk);
        self.ke = Some(ke);

        let mut auth = AttrWriter::new();
        auth.put(AttrId::R_AUTH_TAG, &self.r_auth()?);
        let wrapped_r_auth = aead_seal(secret(&self.ke, "ke")?, auth.as_bytes(), &[])?;

        let mut inner = AttrWriter::new();
        inner.put(AttrId::R_NONCE, &self.r_nonce);
        inner.put(AttrId::I_NONCE, &self.i_nonce);
        inner.put_u8(AttrId::R_CAPABILITIES, self.r_capab);
        inner.put(AttrId::WRAPPED_DATA, &wrapped_r_auth);

        let clear = self.resp_cleartext(DppStatus::Ok)?;
        let k2 = secret(&self.secrets.k2, "k2")?;
        let frame =
            self.finish_frame(FrameType::AuthenticationResponse, clear, k2, inner.as_bytes())?;
        self.state = AuthState::RespSent;
        Ok(frame)
    }

    /// Response carrying only a status, authenticated under k1
    fn build_auth_resp_status(&self, status: DppStatus) -> Result<OutgoingFrame> {
        debug!("DPP: Build Authentication Response with status {}", status);
        let mut inner = AttrWriter::new();
        inner.put(AttrId::I_NONCE, &self.i_nonce);
        inner.put_u8(AttrId::R_CAPABILITIES, self.r_capab);

        let clear = self.resp_cleartext(status)?;
        let k1 = secret(&self.secrets.k1, "k1")?;
        self.finish_frame(FrameType::AuthenticationResponse, clear, k1, inner.as_bytes())
    }

    fn resp_cleartext(&self, status: DppStatus) -> Result<AttrWriter> {
        let own_bi = self.require_own_bi()?;
        let mut clear = AttrWriter::new();
        clear.put_status(status);
        clear.put(AttrId::R_BOOTSTRAP_KEY_HASH, &own_bi.pubkey_hash);
        if let Some(peer_bi) = &self.peer_bi {
            clear.put(AttrId::I_BOOTSTRAP_KEY_HASH, &peer_bi.pubkey_hash);
        }
        if status == DppStatus::Ok {
            clear.put(AttrId::R_PROTOCOL_KEY, &self.own_protocol()?.public_key().to_xy());
        }
        if self.own_version.has_version_attr() && self.peer_version.has_version_attr() {
            clear.put_u8(AttrId::PROTOCOL_VERSION, self.own_version.as_u8());
        }
        Ok(clear)
    }

    /// Process the Authentication Confirm
    pub(crate) fn auth_conf_rx(&mut self, hdr: &[u8], buf: &[u8]) -> Result<Action> {
        let attrs = Attributes::parse(buf)?;
        let wrapped = attrs
            .wrapped()
            .filter(|w| w.len() >= AES_BLOCK_SIZE)
            .ok_or(DppError::MissingAttribute(AttrId::WRAPPED_DATA))?;
        let clear = attrs.before_wrapped();

        // 1. Hashes
        let own_bi = self.require_own_bi()?;
        let r_hash = attrs.require_len(AttrId::R_BOOTSTRAP_KEY_HASH, SHA256_LEN)?;
        if r_hash != own_bi.pubkey_hash.as_slice() {
            return Err(DppError::invalid(
                AttrId::R_BOOTSTRAP_KEY_HASH,
                "Responder Bootstrapping Key Hash mismatch",
            ));
        }
        match attrs.optional_len(AttrId::I_BOOTSTRAP_KEY_HASH, SHA256_LEN)? {
            Some(i_hash) => {
                let matches = self
                    .peer_bi
                    .as_ref()
                    .map(|bi| bi.pubkey_hash.as_slice() == i_hash)
                    .unwrap_or(false);
                if !matches {
                    return Err(DppError::invalid(
                        AttrId::I_BOOTSTRAP_KEY_HASH,
                        "Initiator Bootstrapping Key Hash mismatch",
                    ));
                }
            }
            None if self.peer_bi.is_some() => {
                return Err(DppError::MissingAttribute(AttrId::I_BOOTSTRAP_KEY_HASH));
            }
            None => {}
        }

        // 2. Status
        let status = attrs.status()?;
        match status {
            DppStatus::Ok => {}
            DppStatus::NotCompatible | DppStatus::AuthFailure => {
                return self.auth_conf_rx_failure(status, hdr, clear, wrapped);
            }
            other => {
                warn!("DPP: Authentication Confirm with status {}", other);
                return Err(DppError::AuthFailure("Authentication failed".to_string()));
            }
        }

        // 3. I-auth under ke
        let ke = self.require_ke()?;
        let unwrapped = Self::open_wrapped(ke, hdr, clear, wrapped)?;
        let inner = Attributes::parse(&unwrapped).map_err(|_| {
            DppError::MalformedFrame("Invalid attribute in unwrapped data".to_string())
        })?;
        let i_auth = inner.require_len(AttrId::I_AUTH_TAG, self.curve.hash_len)?;
        let expected = self.expected_tag(true)?;
        if !tags_match(&expected, i_auth) {
            return Err(DppError::AuthFailure(
                "Mismatching Initiator Authenticating Tag".to_string(),
            ));
        }

        self.state = AuthState::ConfirmReceived;
        self.auth_success();
        Ok(Action::SessionComplete(Ok(())))
    }

    /// Confirm reporting a failure: R-nonce echoed under k2
    fn auth_conf_rx_failure(
        &mut self,
        status: DppStatus,
        hdr: &[u8],
        clear: &[u8],
        wrapped: &[u8],
    ) -> Result<Action> {
        let k2 = secret(&self.secrets.k2, "k2")?;
        let unwrapped = aead_open(k2, wrapped, &[hdr, clear])?;
        let inner = Attributes::parse(&unwrapped).map_err(|_| {
            DppError::MalformedFrame("Invalid attribute in unwrapped data".to_string())
        })?;
        let r_nonce = inner.require_len(AttrId::R_NONCE, self.curve.nonce_len)?;
        if r_nonce != self.r_nonce.as_slice() {
            return Err(DppError::invalid(
                AttrId::R_NONCE,
                "Received R-nonce does not match",
            ));
        }

        let err = if status == DppStatus::NotCompatible {
            DppError::RoleIncompatible("Peer reported incompatible R-capab role".to_string())
        } else {
            DppError::AuthFailure("Peer reported authentication failure".to_string())
        };
        Ok(Action::SessionComplete(Err(self.fail(err))))
    }
}
