// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Initiator side of DPP Authentication

use std::sync::Arc;

use tracing::{debug, info};

use super::{secret, Action, AuthSession, AuthState, AwaitReason, Role, SessionOptions};
use crate::bootstrap::{freq_to_op_class_channel, prepare_channel_list, BootstrapInfo, ChannelInfo};
use crate::crypto::{
    aead_open, derive_bk_ke, derive_k1, derive_k2, ecdh, initiator_lx, tags_match, EcPrivateKey,
    EcPublicKey, AES_BLOCK_SIZE,
};
use crate::error::{DppError, Result};
use crate::protocol::{
    select_initiator_role, AttrId, AttrWriter, Attributes, DppStatus, FrameType, OutgoingFrame,
    ProtocolVersion, RoleSelection, CAPAB_CONFIGURATOR, CAPAB_ENROLLEE, CAPAB_ROLE_MASK,
};

const SHA256_LEN: usize = 32;

/// Where and how the Initiator starts the exchange
#[derive(Debug, Clone, Default)]
pub struct InitiatorParams<'a> {
    /// Channel requested for the rest of the exchange
    pub neg_freq: Option<u32>,
    /// Channels the local radio reports; `None` when unknown
    pub own_channels: Option<&'a [ChannelInfo]>,
}

impl AuthSession {
    /// Start an exchange as Initiator
    ///
    /// # Arguments
    ///
    /// * `options` - Role policy and protocol version
    /// * `peer_bi` - Responder bootstrapping key (from its QR code or NFC URI)
    /// * `own_bi` - Own bootstrapping key for mutual authentication
    /// * `params` - Negotiation channel and local channel list
    ///
    /// # Returns
    ///
    /// The session in `ReqSent` and the Authentication Request to transmit
    ///
    /// # Example
    ///
    /// ```ignore
    /// let (mut session, request) =
    ///     AuthSession::auth_init(&options, peer, None, &InitiatorParams::default())?;
    /// transport.send(session.freqs()[0], request.to_public_action()).await?;
    /// ```
    pub fn auth_init(
        options: &SessionOptions,
        peer_bi: Arc<BootstrapInfo>,
        own_bi: Option<Arc<BootstrapInfo>>,
        params: &InitiatorParams<'_>,
    ) -> Result<(AuthSession, OutgoingFrame)> {
        // 1. Curve and channel selection
        let curve = peer_bi.curve;
        curve.ensure_supported()?;
        if let Some(own) = &own_bi {
            if own.curve.id != curve.id {
                return Err(DppError::Config(
                    "Mismatching own and peer core bootstrapping key curves".to_string(),
                ));
            }
        }
        let freqs = prepare_channel_list(params.neg_freq, params.own_channels, &peer_bi.freqs)?;

        let mut session = AuthSession::new(Role::Initiator, options, curve);
        session.configurator = options.allowed_roles.allows_configurator();
        session.i_capab = options.allowed_roles.capab_bits();
        session.curr_freq = freqs.first().copied();
        session.freqs = freqs;
        session.peer_version = peer_bi
            .version
            .and_then(ProtocolVersion::from_wire)
            .unwrap_or(ProtocolVersion::V1);
        session.own_bi = own_bi;
        session.peer_bi = Some(peer_bi);

        // 2. Ephemeral key, M and k1
        session.i_nonce = session.gen_nonce();
        let protocol_key = EcPrivateKey::generate(curve)?;
        let br = session.peer_bi_key()?;
        let mx = ecdh(&protocol_key, &br)?;
        session.secrets.k1 = Some(derive_k1(curve, &mx)?);
        session.secrets.mx = Some(mx);
        session.own_protocol_key = Some(protocol_key);

        let frame = session.build_auth_req(params.neg_freq)?;
        session.state = AuthState::ReqSent;
        info!(
            "DPP: Authentication Request built curve={} mutual={} freqs={:?}",
            curve.name,
            session.own_bi.is_some(),
            session.freqs
        );
        Ok((session, frame))
    }

    fn peer_bi_key(&self) -> Result<EcPublicKey> {
        self.peer_bi
            .as_ref()
            .map(|bi| bi.public_key.clone())
            .ok_or_else(|| DppError::InvalidState("No peer bootstrapping key".to_string()))
    }

    fn build_auth_req(&self, neg_freq: Option<u32>) -> Result<OutgoingFrame> {
        let peer_bi = self
            .peer_bi
            .as_ref()
            .ok_or_else(|| DppError::InvalidState("No peer bootstrapping key".to_string()))?;

        let mut clear = AttrWriter::new();
        clear.put(AttrId::R_BOOTSTRAP_KEY_HASH, &peer_bi.pubkey_hash);
        if let Some(own) = &self.own_bi {
            clear.put(AttrId::I_BOOTSTRAP_KEY_HASH, &own.pubkey_hash);
        }
        clear.put(AttrId::I_PROTOCOL_KEY, &self.own_protocol()?.public_key().to_xy());

        // Ask the Responder to move when the wanted channel is not the start channel
        if let Some(freq) = neg_freq.filter(|f| self.curr_freq != Some(*f)) {
            let (op_class, channel) = freq_to_op_class_channel(freq).ok_or_else(|| {
                DppError::Config(format!("Unsupported negotiation frequency {} MHz", freq))
            })?;
            clear.put(AttrId::CHANNEL, &[op_class, channel]);
        }
        if self.own_version.has_version_attr() {
            clear.put_u8(AttrId::PROTOCOL_VERSION, self.own_version.as_u8());
        }

        let mut inner = AttrWriter::new();
        inner.put(AttrId::I_NONCE, &self.i_nonce);
        inner.put_u8(AttrId::I_CAPABILITIES, self.i_capab);

        let k1 = secret(&self.secrets.k1, "k1")?;
        self.finish_frame(FrameType::AuthenticationRequest, clear, k1, inner.as_bytes())
    }

    /// Process an Authentication Response
    pub(crate) fn auth_resp_rx(&mut self, hdr: &[u8], buf: &[u8]) -> Result<Action> {
        let attrs = Attributes::parse(buf)?;

        // 1. Cleartext checks
        let wrapped = attrs
            .wrapped()
            .filter(|w| w.len() >= AES_BLOCK_SIZE)
            .ok_or(DppError::MissingAttribute(AttrId::WRAPPED_DATA))?;
        let clear = attrs.before_wrapped();

        let r_hash = attrs.require_len(AttrId::R_BOOTSTRAP_KEY_HASH, SHA256_LEN)?;
        let peer_hash = self.peer_bi.as_ref().map(|bi| bi.pubkey_hash);
        if peer_hash.as_ref().map(|h| h.as_slice()) != Some(r_hash) {
            return Err(DppError::invalid(
                AttrId::R_BOOTSTRAP_KEY_HASH,
                "Unexpected Responder Bootstrapping Key Hash value",
            ));
        }

        let i_hash = attrs.optional_len(AttrId::I_BOOTSTRAP_KEY_HASH, SHA256_LEN)?;
        if let Some(i_hash) = i_hash {
            let matches = self
                .own_bi
                .as_ref()
                .map(|bi| bi.pubkey_hash.as_slice() == i_hash)
                .unwrap_or(false);
            if !matches {
                return Err(DppError::invalid(
                    AttrId::I_BOOTSTRAP_KEY_HASH,
                    "Initiator Bootstrapping Key Hash attribute did not match",
                ));
            }
        }

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

        let status = attrs.status()?;
        if status != DppStatus::Ok {
            return self.auth_resp_rx_status(status, hdr, clear, wrapped);
        }

        if i_hash.is_none() && self.own_bi.is_some() {
            debug!("DPP: Responder decided not to use mutual authentication");
            self.own_bi = None;
        }
        info!("DPP: Authentication direction mutual={}", self.own_bi.is_some());

        // 2. N and k2
        let r_proto = attrs.require_len(AttrId::R_PROTOCOL_KEY, 2 * self.curve.prime_len)?;
        let peer_protocol = EcPublicKey::from_xy(self.curve, r_proto).map_err(|_| {
            DppError::invalid(AttrId::R_PROTOCOL_KEY, "Invalid Responder Protocol Key")
        })?;
        let nx = ecdh(self.own_protocol()?, &peer_protocol)?;
        self.peer_protocol_key = Some(peer_protocol);
        self.secrets.k2 = Some(derive_k2(self.curve, &nx)?);
        self.secrets.nx = Some(nx);

        // 3. Outer wrapped data
        let k2 = secret(&self.secrets.k2, "k2")?;
        let unwrapped = Self::open_wrapped(k2, hdr, clear, wrapped)?;
        let inner = Attributes::parse(&unwrapped).map_err(|_| {
            DppError::MalformedFrame("Invalid attribute in unwrapped data".to_string())
        })?;
        let r_nonce = inner.require_len(AttrId::R_NONCE, self.curve.nonce_len)?;
        let i_nonce = inner.require_len(AttrId::I_NONCE, self.curve.nonce_len)?;
        if i_nonce != self.i_nonce.as_slice() {
            return Err(DppError::invalid(AttrId::I_NONCE, "I-nonce mismatch"));
        }
        self.r_nonce = r_nonce.to_vec();

        // 4. L for mutual authentication
        if let Some(own) = &self.own_bi {
            let br = self.peer_bi_key()?;
            let lx = initiator_lx(own.private_key()?, &br, self.peer_protocol()?)?;
            self.secrets.lx = Some(lx);
        }

        // 5. Role resolution
        let r_capab = inner.require_min(AttrId::R_CAPABILITIES, 1)?[0];
        self.r_capab = r_capab;
        match select_initiator_role(self.allowed_roles, self.configurator, r_capab) {
            RoleSelection::Selected { configurator } => self.configurator = configurator,
            RoleSelection::NotCompatible | RoleSelection::Invalid => {
                let role = r_capab & CAPAB_ROLE_MASK;
                let reason = format!("Unexpected role in R-capabilities 0x{:02x}", role);
                if role != CAPAB_ENROLLEE && role != CAPAB_CONFIGURATOR {
                    return Err(DppError::RoleIncompatible(reason));
                }
                debug!("DPP: Incompatible role selection");
                let frame = self.build_auth_conf(DppStatus::NotCompatible)?;
                let err = self.fail(DppError::RoleIncompatible(reason));
                return Ok(Action::ReplyWithFrame {
                    frame,
                    completion: Some(Err(err)),
                });
            }
        }

        // 6. bk, ke and the secondary wrapped data
        let wrapped2 = inner
            .wrapped()
            .filter(|w| w.len() >= AES_BLOCK_SIZE)
            .ok_or_else(|| {
                DppError::invalid(
                    AttrId::WRAPPED_DATA,
                    "Missing or invalid Secondary Wrapped Data",
                )
            })?;
        let (bk, ke) = derive_bk_ke(
            self.curve,
            &self.i_nonce,
            &self.r_nonce,
            secret(&self.secrets.mx, "Mx")?,
            secret(&self.secrets.nx, "Nx")?,
            self.secrets.lx.as_deref().map(Vec::as_slice),
        )?;
        self.secrets.bk = Some(bk);
        let unwrapped2 = aead_open(&ke, wrapped2, &[])?;
        self.ke = Some(ke);
        let inner2 = Attributes::parse(&unwrapped2).map_err(|_| {
            DppError::MalformedFrame("Invalid attribute in secondary unwrapped data".to_string())
        })?;
        let r_auth = inner2.require_len(AttrId::R_AUTH_TAG, self.curve.hash_len)?;

        // 7. Key confirmation
        let expected = self.expected_tag(false)?;
        if !tags_match(&expected, r_auth) {
            debug!("DPP: Responder Authenticating Tag mismatch");
            let frame = self.build_auth_conf(DppStatus::AuthFailure)?;
            let err = self.fail(DppError::AuthFailure(
                "Mismatching Responder Authenticating Tag".to_string(),
            ));
            return Ok(Action::ReplyWithFrame {
                frame,
                completion: Some(Err(err)),
            });
        }

        self.state = AuthState::RespReceived;
        let frame = self.build_auth_conf(DppStatus::Ok)?;
        self.state = AuthState::ConfirmSent;
        self.auth_success();
        Ok(Action::ReplyWithFrame {
            frame,
            completion: Some(Ok(())),
        })
    }

    /// Response carrying a non-OK status, authenticated under k1
    fn auth_resp_rx_status(
        &mut self,
        status: DppStatus,
        hdr: &[u8],
        clear: &[u8],
        wrapped: &[u8],
    ) -> Result<Action> {
        debug!("DPP: Responder reported failure (status {})", status);

        let k1 = secret(&self.secrets.k1, "k1")?;
        let unwrapped = Self::open_wrapped(k1, hdr, clear, wrapped)?;
        let inner = Attributes::parse(&unwrapped).map_err(|_| {
            DppError::MalformedFrame("Invalid attribute in unwrapped data".to_string())
        })?;
        let i_nonce = inner.require_len(AttrId::I_NONCE, self.curve.nonce_len)?;
        if i_nonce != self.i_nonce.as_slice() {
            return Err(DppError::invalid(AttrId::I_NONCE, "I-nonce mismatch"));
        }
        let r_capab = inner.require_min(AttrId::R_CAPABILITIES, 1)?[0];
        self.r_capab = r_capab;

        match status {
            DppStatus::NotCompatible => {
                info!(
                    "DPP-NOT-COMPATIBLE i-capab=0x{:02x} r-capab=0x{:02x}",
                    self.i_capab, r_capab
                );
                let err = self.fail(DppError::RoleIncompatible(format!(
                    "Peer reported incompatible role: r-capab=0x{:02x}",
                    r_capab
                )));
                Ok(Action::SessionComplete(Err(err)))
            }
            DppStatus::ResponsePending => {
                let role = r_capab & CAPAB_ROLE_MASK;
                if (self.configurator && role != CAPAB_ENROLLEE)
                    || (!self.configurator && role != CAPAB_CONFIGURATOR)
                {
                    debug!("DPP: Incompatible role selection");
                    return Err(DppError::RoleIncompatible(format!(
                        "Unexpected role in R-capabilities 0x{:02x}",
                        role
                    )));
                }
                debug!("DPP: Continue waiting for full DPP Authentication Response");
                info!("DPP-RESPONSE-PENDING");
                self.state = AuthState::ResponsePending;
                Ok(Action::AwaitExternalEvent(AwaitReason::PeerResponse))
            }
            other => Err(DppError::PeerStatus(other)),
        }
    }

    /// Authentication Confirm with `status`
    ///
    /// OK wraps I-auth under ke; failure statuses echo R-nonce under k2.
    fn build_auth_conf(&self, status: DppStatus) -> Result<OutgoingFrame> {
        let peer_bi = self
            .peer_bi
            .as_ref()
            .ok_or_else(|| DppError::InvalidState("No peer bootstrapping key".to_string()))?;

        let mut clear = AttrWriter::new();
        clear.put_status(status);
        clear.put(AttrId::R_BOOTSTRAP_KEY_HASH, &peer_bi.pubkey_hash);
        if let Some(own) = &self.own_bi {
            clear.put(AttrId::I_BOOTSTRAP_KEY_HASH, &own.pubkey_hash);
        }

        let mut inner = AttrWriter::new();
        if status == DppStatus::Ok {
            inner.put(AttrId::I_AUTH_TAG, &self.i_auth()?);
            let ke = secret(&self.ke, "ke")?;
            self.finish_frame(FrameType::AuthenticationConfirm, clear, ke, inner.as_bytes())
        } else {
            inner.put(AttrId::R_NONCE, &self.r_nonce);
            let k2 = secret(&self.secrets.k2, "k2")?;
            self.finish_frame(FrameType::AuthenticationConfirm, clear, k2, inner.as_bytes())
        }
    }
}
