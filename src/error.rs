// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the DPP engine
//!
//! One taxonomy covers the whole protocol surface:
//! - Frame errors (malformed attribute streams, missing attributes)
//! - Crypto errors (AES-SIV failures, bad keys, unsupported curves)
//! - Negotiation errors (incompatible roles, authentication failures)
//! - Provisioning errors (connectors, AKMs, configuration objects)
//!
//! The `Display` text of each error is the failure reason reported for
//! the exchange.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::protocol::{AttrId, DppStatus};

/// Errors raised while processing DPP frames and objects
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DppError {
    /// Attribute stream or frame envelope failed validation
    #[error("{0}")]
    MalformedFrame(String),

    /// Required attribute absent or of the wrong length
    #[error("Missing or invalid required {} attribute", .0.name())]
    MissingAttribute(AttrId),

    /// Attribute present but its value is unacceptable
    #[error("{reason}")]
    InvalidAttributeValue { attribute: AttrId, reason: String },

    /// AES-SIV open failed
    #[error("AES-SIV decryption failed")]
    AeadAuthFailure,

    /// Role negotiation failed
    #[error("{0}")]
    RoleIncompatible(String),

    /// Authenticating tag mismatch or peer-reported authentication failure
    #[error("{0}")]
    AuthFailure(String),

    /// Signed connector failed structural or signature checks
    #[error("Invalid connector: {0}")]
    ConnectorInvalid(String),

    /// Connector groups or roles do not match
    #[error("Connector group or netRole mismatch")]
    NoMatch,

    #[error("Unsupported akm: {0}")]
    UnknownAkm(String),

    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),

    #[error("Invalid DPP URI: {0}")]
    InvalidUri(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u32 },

    /// Operation not valid in the current session state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration exchange failed
    #[error("{0}")]
    ConfigurationFailed(String),

    /// Configuration object rejected
    #[error("{0}")]
    InvalidConfigObject(String),

    /// Peer reported a non-OK status without further detail
    #[error("Peer reported status {0}")]
    PeerStatus(DppStatus),

    /// Local configuration rejected
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Crypto(CryptoError),
}

impl From<CryptoError> for DppError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed { .. } => DppError::AeadAuthFailure,
            CryptoError::UnsupportedCurve(name) => DppError::UnsupportedCurve(name),
            other => DppError::Crypto(other),
        }
    }
}

impl DppError {
    pub fn invalid(attribute: AttrId, reason: impl Into<String>) -> Self {
        DppError::InvalidAttributeValue {
            attribute,
            reason: reason.into(),
        }
    }

    /// Status code a peer would see for this failure, where one applies
    pub fn status(&self) -> Option<DppStatus> {
        match self {
            DppError::ConnectorInvalid(_) => Some(DppStatus::InvalidConnector),
            DppError::NoMatch => Some(DppStatus::NoMatch),
            DppError::RoleIncompatible(_) => Some(DppStatus::NotCompatible),
            DppError::AuthFailure(_) => Some(DppStatus::AuthFailure),
            DppError::AeadAuthFailure => Some(DppStatus::UnwrapFailure),
            DppError::PeerStatus(status) => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DppError>;
