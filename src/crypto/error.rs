// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error type shared by every cryptographic primitive used in DPP.
//!
//! ## Error Variants
//!
//! - **DecryptionFailed**: AES-SIV open failed (wrong key, tampered ciphertext or AD)
//! - **EncryptionFailed**: AES-SIV seal could not run (bad key length)
//! - **InvalidSignature**: ES256/ES384 signature malformed or not verifying
//! - **InvalidKey**: Key bytes do not describe a valid scalar or curve point
//! - **KeyDerivationFailed**: ECDH, Lx or HKDF failed
//! - **UnsupportedCurve**: Curve is in the DPP table but has no key arithmetic here
//! - **UnsupportedHashLength**: Hash length does not map to SHA-256/384/512
//!
//! ## Context Preservation
//!
//! Variants carry the operation that failed (e.g. "k1", "ke", "connector")
//! and a short reason so protocol layers can surface a readable message.

use std::fmt;

/// Error type for all cryptographic operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// AEAD decryption failed
    DecryptionFailed {
        /// Which operation was being performed
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// AEAD encryption could not be performed
    EncryptionFailed { operation: String, reason: String },

    /// ECDSA signature malformed or verification failed
    InvalidSignature { operation: String, reason: String },

    /// Invalid cryptographic key
    ///
    /// This error occurs when:
    /// - Key has wrong length
    /// - Key represents an invalid curve point or zero scalar
    /// - SubjectPublicKeyInfo or JWK could not be decoded
    InvalidKey {
        /// Type of key that failed (e.g., "protocol_key", "bootstrap_key")
        key_type: String,
        reason: String,
    },

    /// ECDH, Lx or HKDF derivation failed
    KeyDerivationFailed { operation: String, reason: String },

    /// Curve recognised but not supported for key operations
    UnsupportedCurve(String),

    /// Hash length that does not select SHA-256, SHA-384 or SHA-512
    UnsupportedHashLength(usize),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::DecryptionFailed { operation, reason } => {
                write!(f, "Decryption failed during {}: {}", operation, reason)
            }
            CryptoError::EncryptionFailed { operation, reason } => {
                write!(f, "Encryption failed during {}: {}", operation, reason)
            }
            CryptoError::InvalidSignature { operation, reason } => {
                write!(f, "Invalid signature during {}: {}", operation, reason)
            }
            CryptoError::InvalidKey { key_type, reason } => {
                write!(f, "Invalid key ({}): {}", key_type, reason)
            }
            CryptoError::KeyDerivationFailed { operation, reason } => {
                write!(f, "Key derivation failed during {}: {}", operation, reason)
            }
            CryptoError::UnsupportedCurve(name) => {
                write!(f, "Unsupported curve: {}", name)
            }
            CryptoError::UnsupportedHashLength(len) => {
                write!(f, "Unsupported hash length: {}", len)
            }
        }
    }
}

impl std::error::Error for CryptoError {}

// Conversion from hex decode errors
impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidKey {
            key_type: "hex_key".to_string(),
            reason: format!("hex decode error: {}", err),
        }
    }
}

// Conversion from elliptic curve errors (shared by p256 and p384)
impl From<p256::elliptic_curve::Error> for CryptoError {
    fn from(err: p256::elliptic_curve::Error) -> Self {
        CryptoError::InvalidKey {
            key_type: "unknown".to_string(),
            reason: format!("elliptic curve error: {}", err),
        }
    }
}

// Conversion from AES-SIV errors
impl From<aes_siv::aead::Error> for CryptoError {
    fn from(_: aes_siv::aead::Error) -> Self {
        CryptoError::DecryptionFailed {
            operation: "AES-SIV".to_string(),
            reason: "authentication tag mismatch".to_string(),
        }
    }
}
