// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DPP Authentication state machine
//!
//! - **Initiator**: Authentication Request, Response processing, Confirm
//! - **Responder**: Request processing, Response (including status and
//!   pending variants), Confirm processing
//! - **Session**: Shared state, failure reporting and frame dispatch
//!
//! Each exchange owns one [`AuthSession`]. Sessions never touch each other;
//! the only shared inputs are the bootstrapping records they hold as `Arc`s.

pub mod initiator;
pub mod responder;

#[cfg(any(test, feature = "fault-injection"))]
pub mod fault;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::bootstrap::BootstrapInfo;
use crate::config::DppConfig;
use crate::configuration::ConfigExchange;
use crate::crypto::{
    aead_open, aead_seal, compute_i_auth, compute_r_auth, AuthTagInput, CurveParams,
    EcPrivateKey, EcPublicKey,
};
use crate::error::{DppError, Result};
use crate::protocol::{
    AllowedRoles, AttrWriter, FrameHeader, FrameType, OutgoingFrame, ProtocolVersion,
};

#[cfg(any(test, feature = "fault-injection"))]
pub use fault::FaultInjector;

/// Side of the exchange that sent the first frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

/// Authentication progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    ReqSent,
    ReqReceived,
    /// Parked until the peer's bootstrapping key (Responder) or full
    /// Response (Initiator) arrives
    ResponsePending,
    RespSent,
    RespReceived,
    ConfirmSent,
    ConfirmReceived,
    Success,
    Failed,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a parked session is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitReason {
    /// Responder needs the Initiator's bootstrapping key (scan its QR code)
    PeerBootstrapKey,
    /// Initiator received RESPONSE_PENDING and waits for the full Response
    PeerResponse,
    /// Frame ignored in the current state; keep waiting
    PeerFrame,
}

/// Result of feeding a frame (or event) to a session
#[derive(Debug)]
pub enum Action {
    /// Send `frame`; `completion` is set when the exchange ends with it
    ReplyWithFrame {
        frame: OutgoingFrame,
        completion: Option<Result<()>>,
    },
    AwaitExternalEvent(AwaitReason),
    SessionComplete(Result<()>),
    /// Frame rejected and the session torn down
    FatalDrop(DppError),
}

/// Per-session policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub allowed_roles: AllowedRoles,
    /// Require the Initiator's QR code before responding
    pub qr_mutual: bool,
    pub version: ProtocolVersion,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            allowed_roles: AllowedRoles::default(),
            qr_mutual: false,
            version: ProtocolVersion::LATEST,
        }
    }
}

impl From<&DppConfig> for SessionOptions {
    fn from(config: &DppConfig) -> Self {
        Self {
            allowed_roles: config.allowed_roles,
            qr_mutual: config.qr_mutual,
            version: config.protocol_version,
        }
    }
}

/// Intermediate secrets, each consumed by a single derivation
#[derive(Default)]
pub(crate) struct Secrets {
    pub mx: Option<Zeroizing<Vec<u8>>>,
    pub nx: Option<Zeroizing<Vec<u8>>>,
    pub lx: Option<Zeroizing<Vec<u8>>>,
    pub k1: Option<Zeroizing<Vec<u8>>>,
    pub k2: Option<Zeroizing<Vec<u8>>>,
    pub bk: Option<Zeroizing<Vec<u8>>>,
}

impl Secrets {
    fn clear(&mut self) {
        // Dropping the Zeroizing buffers wipes them
        *self = Self::default();
    }
}

pub(crate) fn secret<'a>(slot: &'a Option<Zeroizing<Vec<u8>>>, name: &str) -> Result<&'a [u8]> {
    slot.as_deref()
        .map(Vec::as_slice)
        .ok_or_else(|| DppError::InvalidState(format!("{} not available", name)))
}

/// State of one DPP exchange
pub struct AuthSession {
    pub(crate) role: Role,
    pub(crate) state: AuthState,
    /// Local side acts as Configurator
    pub(crate) configurator: bool,
    pub(crate) allowed_roles: AllowedRoles,
    pub(crate) qr_mutual: bool,
    pub(crate) curve: &'static CurveParams,
    pub(crate) own_version: ProtocolVersion,
    pub(crate) peer_version: ProtocolVersion,
    pub(crate) own_bi: Option<Arc<BootstrapInfo>>,
    pub(crate) peer_bi: Option<Arc<BootstrapInfo>>,
    pub(crate) own_protocol_key: Option<EcPrivateKey>,
    pub(crate) peer_protocol_key: Option<EcPublicKey>,
    pub(crate) i_nonce: Vec<u8>,
    pub(crate) r_nonce: Vec<u8>,
    pub(crate) i_capab: u8,
    pub(crate) r_capab: u8,
    pub(crate) secrets: Secrets,
    pub(crate) ke: Option<Zeroizing<Vec<u8>>>,
    /// I-Bootstrap-Key-Hash the parked Responder waits for
    pub(crate) waiting_pubkey_hash: Option<[u8; 32]>,
    pub(crate) freqs: Vec<u32>,
    pub(crate) curr_freq: Option<u32>,
    pub(crate) failure_reason: Option<String>,
    pub(crate) conf: ConfigExchange,
    #[cfg(any(test, feature = "fault-injection"))]
    pub(crate) fault: Option<Box<dyn FaultInjector>>,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("configurator", &self.configurator)
            .field("curve", &self.curve.name)
            .field("peer_version", &self.peer_version)
            .field("mutual", &self.is_mutual())
            .field("failure_reason", &self.failure_reason)
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    pub(crate) fn new(role: Role, options: &SessionOptions, curve: &'static CurveParams) -> Self {
        Self {
            role,
            state: AuthState::Idle,
            configurator: false,
            allowed_roles: options.allowed_roles,
            qr_mutual: options.qr_mutual,
            curve,
            own_version: options.version,
            peer_version: ProtocolVersion::V1,
            own_bi: None,
            peer_bi: None,
            own_protocol_key: None,
            peer_protocol_key: None,
            i_nonce: Vec::new(),
            r_nonce: Vec::new(),
            i_capab: 0,
            r_capab: 0,
            secrets: Secrets::default(),
            ke: None,
            waiting_pubkey_hash: None,
            freqs: Vec::new(),
            curr_freq: None,
            failure_reason: None,
            conf: ConfigExchange::default(),
            #[cfg(any(test, feature = "fault-injection"))]
            fault: None,
        }
    }

    #[cfg(any(test, feature = "fault-injection"))]
    pub fn set_fault_injector(&mut self, injector: Box<dyn FaultInjector>) {
        self.fault = Some(injector);
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Whether the local side ended up as Configurator
    pub fn is_configurator(&self) -> bool {
        self.configurator
    }

    pub fn curve(&self) -> &'static CurveParams {
        self.curve
    }

    /// Both bootstrapping keys take part in the exchange
    pub fn is_mutual(&self) -> bool {
        self.own_bi.is_some() && self.peer_bi.is_some()
    }

    pub fn peer_version(&self) -> ProtocolVersion {
        self.peer_version
    }

    pub fn own_version(&self) -> ProtocolVersion {
        self.own_version
    }

    pub fn freqs(&self) -> &[u32] {
        &self.freqs
    }

    pub fn current_freq(&self) -> Option<u32> {
        self.curr_freq
    }

    pub fn peer_bootstrap(&self) -> Option<&Arc<BootstrapInfo>> {
        self.peer_bi.as_ref()
    }

    pub fn own_bootstrap(&self) -> Option<&Arc<BootstrapInfo>> {
        self.own_bi.as_ref()
    }

    /// Reason recorded by the last failure
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Session key established by a successful exchange
    pub fn ke(&self) -> Option<&[u8]> {
        self.ke.as_deref().map(Vec::as_slice)
    }

    pub fn is_response_pending(&self) -> bool {
        self.state == AuthState::ResponsePending
    }

    /// Peer's ephemeral protocol key (the Enrollee's netAccessKey)
    pub fn peer_protocol_key(&self) -> Option<&EcPublicKey> {
        self.peer_protocol_key.as_ref()
    }

    pub(crate) fn own_protocol(&self) -> Result<&EcPrivateKey> {
        self.own_protocol_key
            .as_ref()
            .ok_or_else(|| DppError::InvalidState("No own protocol key".to_string()))
    }

    pub(crate) fn peer_protocol(&self) -> Result<&EcPublicKey> {
        self.peer_protocol_key
            .as_ref()
            .ok_or_else(|| DppError::InvalidState("No peer protocol key".to_string()))
    }

    pub(crate) fn require_ke(&self) -> Result<&[u8]> {
        secret(&self.ke, "ke")
    }

    /// Generate a fresh nonce of the curve's nonce length
    pub(crate) fn gen_nonce(&self) -> Vec<u8> {
        use rand::RngCore;
        let mut nonce = vec![0u8; self.curve.nonce_len];
        rand::rngs::OsRng.fill_bytes(&mut nonce);
        nonce
    }

    /// Record a fatal failure: log it once, drop secrets and move to `Failed`
    pub(crate) fn fail(&mut self, err: DppError) -> DppError {
        let reason = err.to_string();
        report_failure(&reason);
        self.failure_reason = Some(reason);
        self.state = AuthState::Failed;
        self.secrets.clear();
        self.ke = None;
        self.own_protocol_key = None;
        err
    }

    /// Authentication completed: keep ke, wipe everything used to reach it
    pub(crate) fn auth_success(&mut self) {
        self.secrets.clear();
        self.state = AuthState::Success;
        info!(
            "DPP-AUTH-SUCCESS init={} mutual={}",
            u8::from(self.role == Role::Initiator),
            u8::from(self.is_mutual())
        );
    }

    /// Authenticating tag inputs with Initiator/Responder keys laid out per role
    fn auth_tag(&self, initiator_tag: bool) -> Result<Vec<u8>> {
        let own_pub = self.own_protocol()?.public_key();
        let peer_pub = self.peer_protocol()?;
        let (pi, pr) = match self.role {
            Role::Initiator => (&own_pub, peer_pub),
            Role::Responder => (peer_pub, &own_pub),
        };
        let (i_bi, r_bi) = match self.role {
            Role::Initiator => (self.own_bi.as_ref(), self.peer_bi.as_ref()),
            Role::Responder => (self.peer_bi.as_ref(), self.own_bi.as_ref()),
        };
        let r_bi = r_bi.ok_or_else(|| {
            DppError::InvalidState("No Responder bootstrapping key".to_string())
        })?;

        let pi_x = pi.x();
        let pr_x = pr.x();
        let br_x = r_bi.public_key.x();
        let bi_x = match (self.is_mutual(), i_bi) {
            (true, Some(bi)) => Some(bi.public_key.x()),
            _ => None,
        };
        let input = AuthTagInput {
            hash_len: self.curve.hash_len,
            i_nonce: &self.i_nonce,
            r_nonce: &self.r_nonce,
            pi_x: &pi_x,
            pr_x: &pr_x,
            bi_x: bi_x.as_deref(),
            br_x: &br_x,
        };
        let tag = if initiator_tag {
            compute_i_auth(&input)?
        } else {
            compute_r_auth(&input)?
        };
        Ok(tag)
    }

    pub(crate) fn r_auth(&self) -> Result<Vec<u8>> {
        #[allow(unused_mut)]
        let mut tag = self.auth_tag(false)?;
        #[cfg(any(test, feature = "fault-injection"))]
        if let Some(fault) = &self.fault {
            fault.tamper_r_auth(&mut tag);
        }
        Ok(tag)
    }

    pub(crate) fn i_auth(&self) -> Result<Vec<u8>> {
        #[allow(unused_mut)]
        let mut tag = self.auth_tag(true)?;
        #[cfg(any(test, feature = "fault-injection"))]
        if let Some(fault) = &self.fault {
            fault.tamper_i_auth(&mut tag);
        }
        Ok(tag)
    }

    /// Expected tag recomputed locally, free of injected faults
    pub(crate) fn expected_tag(&self, initiator_tag: bool) -> Result<Vec<u8>> {
        self.auth_tag(initiator_tag)
    }

    /// Seal `inner` as Wrapped Data after `clear`, with [header, clear] as AD
    pub(crate) fn finish_frame(
        &self,
        frame_type: FrameType,
        mut clear: AttrWriter,
        key: &[u8],
        inner: &[u8],
    ) -> Result<OutgoingFrame> {
        let header = FrameHeader::new(frame_type).to_bytes();
        let wrapped = aead_seal(key, inner, &[&header, clear.as_bytes()])?;
        clear.put(crate::protocol::AttrId::WRAPPED_DATA, &wrapped);
        #[allow(unused_mut)]
        let mut attrs = clear.into_bytes();
        #[cfg(any(test, feature = "fault-injection"))]
        if let Some(fault) = &self.fault {
            fault.tamper_outgoing(frame_type, &mut attrs);
        }
        Ok(OutgoingFrame::new(frame_type, attrs))
    }

    /// Feed a received DPP frame to the session
    ///
    /// # Arguments
    ///
    /// * `hdr` - The six header octets (OUI, type, suite, frame type)
    /// * `attrs` - Attribute octets following the header
    ///
    /// # Returns
    ///
    /// The next step for the transport
    pub fn handle_incoming(&mut self, hdr: &[u8], attrs: &[u8]) -> Action {
        let header = match FrameHeader::parse(hdr) {
            Ok(header) => header,
            Err(e) => {
                warn!("DPP: Dropping frame with invalid header: {}", e);
                return Action::AwaitExternalEvent(AwaitReason::PeerFrame);
            }
        };

        let result = match (self.role, header.frame_type, self.state) {
            (
                Role::Initiator,
                FrameType::AuthenticationResponse,
                AuthState::ReqSent | AuthState::ResponsePending,
            ) => self.auth_resp_rx(hdr, attrs),
            (Role::Responder, FrameType::AuthenticationConfirm, AuthState::RespSent) => {
                self.auth_conf_rx(hdr, attrs)
            }
            (_, FrameType::ConfigurationResult, AuthState::Success) if self.configurator => {
                self.conf_result_rx(hdr, attrs)
            }
            (_, FrameType::ConnectionStatusResult, AuthState::Success) if self.configurator => {
                self.conn_status_result_rx(hdr, attrs)
            }
            (role, frame_type, state) => {
                warn!(
                    "DPP: Unexpected {:?} frame for {:?} in state {} - ignore",
                    frame_type, role, state
                );
                return Action::AwaitExternalEvent(AwaitReason::PeerFrame);
            }
        };

        match result {
            Ok(action) => action,
            Err(e) => Action::FatalDrop(self.fail(e)),
        }
    }

    /// Open Wrapped Data with [header, cleartext before it] as AD
    pub(crate) fn open_wrapped(
        key: &[u8],
        hdr: &[u8],
        clear: &[u8],
        wrapped: &[u8],
    ) -> Result<Vec<u8>> {
        debug!("DPP: Unwrapping {} octets of wrapped data", wrapped.len());
        Ok(aead_open(key, wrapped, &[hdr, clear])?)
    }
}

/// Single reporting point for failed exchanges
fn report_failure(reason: &str) {
    warn!("DPP-FAIL {}", reason);
}

pub use initiator::InitiatorParams;
pub use responder::auth_req_rx;
