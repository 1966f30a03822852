// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDSA signatures in JWS form
//!
//! Connectors carry the raw `r | s` pair (each `prime_len` octets), not a
//! DER SEQUENCE. The digest follows the curve: SHA-256 for P-256 (ES256),
//! SHA-384 for P-384 (ES384).

use p256::ecdsa::signature::{Signer, Verifier};

use super::error::CryptoError;
use super::keys::{EcPrivateKey, EcPublicKey};

/// Sign `message` with `key`, returning the raw `r | s` signature
///
/// # Arguments
///
/// * `key` - Signing key (the Configurator's C-sign key)
/// * `message` - Octets to sign (`base64url(header) "." base64url(payload)`)
///
/// # Returns
///
/// `2 * prime_len` octets
///
/// # Example
///
/// ```ignore
/// let sig = sign_raw(&csign, b"eyJ0eXAi...eyJncm91cHMi...")?;
/// assert_eq!(sig.len(), 64);
/// ```
pub fn sign_raw(key: &EcPrivateKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let sig = match key {
        EcPrivateKey::P256(sk) => {
            let signing = p256::ecdsa::SigningKey::from(sk);
            let sig: p256::ecdsa::Signature = signing
                .try_sign(message)
                .map_err(|e| sign_error(e.to_string()))?;
            sig.to_bytes().to_vec()
        }
        EcPrivateKey::P384(sk) => {
            let signing = p384::ecdsa::SigningKey::from(sk);
            let sig: p384::ecdsa::Signature = signing
                .try_sign(message)
                .map_err(|e| sign_error(e.to_string()))?;
            sig.to_bytes().to_vec()
        }
    };
    Ok(sig)
}

/// Verify a raw `r | s` signature over `message`
///
/// # Errors
///
/// `InvalidSignature` when the signature has the wrong length for the
/// key's curve, does not decode, or does not verify.
pub fn verify_raw(key: &EcPublicKey, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    // 1. Length must match the curve of the verifying key
    let expected = 2 * key.curve().prime_len;
    if signature.len() != expected {
        return Err(verify_error(format!(
            "Unexpected signature length {} (expected {})",
            signature.len(),
            expected
        )));
    }

    // 2. Decode and verify
    match key {
        EcPublicKey::P256(pk) => {
            let sig = p256::ecdsa::Signature::from_slice(signature)
                .map_err(|e| verify_error(e.to_string()))?;
            p256::ecdsa::VerifyingKey::from(pk)
                .verify(message, &sig)
                .map_err(|_| verify_error("signature does not verify".to_string()))
        }
        EcPublicKey::P384(pk) => {
            let sig = p384::ecdsa::Signature::from_slice(signature)
                .map_err(|e| verify_error(e.to_string()))?;
            p384::ecdsa::VerifyingKey::from(pk)
                .verify(message, &sig)
                .map_err(|_| verify_error("signature does not verify".to_string()))
        }
    }
}

fn sign_error(reason: String) -> CryptoError {
    CryptoError::InvalidSignature {
        operation: "sign".to_string(),
        reason,
    }
}

fn verify_error(reason: String) -> CryptoError {
    CryptoError::InvalidSignature {
        operation: "verify".to_string(),
        reason,
    }
}
