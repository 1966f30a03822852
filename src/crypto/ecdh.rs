// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH and the mutual-authentication secret Lx
//!
//! All results are the x coordinate of the shared point, left-padded to
//! `prime_len` bytes, wrapped in `Zeroizing` so they are wiped on drop.

use p256::elliptic_curve::point::AffineCoordinates;
use zeroize::Zeroizing;

use super::error::CryptoError;
use super::keys::{EcPrivateKey, EcPublicKey};

fn curve_mismatch(operation: &str) -> CryptoError {
    CryptoError::KeyDerivationFailed {
        operation: operation.to_string(),
        reason: "keys are on different curves".to_string(),
    }
}

fn point_at_infinity(operation: &str) -> CryptoError {
    CryptoError::KeyDerivationFailed {
        operation: operation.to_string(),
        reason: "result is the point at infinity".to_string(),
    }
}

/// Derive an ECDH shared secret
///
/// # Arguments
///
/// * `own` - Local private key (bootstrapping or protocol key)
/// * `peer` - Peer public key on the same curve
///
/// # Returns
///
/// x coordinate of `own * peer`, `prime_len` bytes
///
/// # Example
///
/// ```ignore
/// let mx = ecdh(&own_protocol_key, &peer_bootstrap_key)?;
/// let k1 = derive_k1(curve, &mx)?;
/// ```
pub fn ecdh(own: &EcPrivateKey, peer: &EcPublicKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    match (own, peer) {
        (EcPrivateKey::P256(sk), EcPublicKey::P256(pk)) => {
            let shared = p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
            Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
        }
        (EcPrivateKey::P384(sk), EcPublicKey::P384(pk)) => {
            let shared = p384::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
            Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
        }
        _ => Err(curve_mismatch("ecdh")),
    }
}

/// Responder side of Lx: ((bR + pR) mod q) * BI
pub fn responder_lx(
    own_bootstrap: &EcPrivateKey,
    own_protocol: &EcPrivateKey,
    peer_bootstrap: &EcPublicKey,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    match (own_bootstrap, own_protocol, peer_bootstrap) {
        (EcPrivateKey::P256(br), EcPrivateKey::P256(pr), EcPublicKey::P256(bi)) => {
            let sum = *br.to_nonzero_scalar() + *pr.to_nonzero_scalar();
            let point = bi.to_projective() * sum;
            if point == p256::ProjectivePoint::IDENTITY {
                return Err(point_at_infinity("Lx"));
            }
            Ok(Zeroizing::new(point.to_affine().x().to_vec()))
        }
        (EcPrivateKey::P384(br), EcPrivateKey::P384(pr), EcPublicKey::P384(bi)) => {
            let sum = *br.to_nonzero_scalar() + *pr.to_nonzero_scalar();
            let point = bi.to_projective() * sum;
            if point == p384::ProjectivePoint::IDENTITY {
                return Err(point_at_infinity("Lx"));
            }
            Ok(Zeroizing::new(point.to_affine().x().to_vec()))
        }
        _ => Err(curve_mismatch("Lx")),
    }
}

/// Initiator side of Lx: bI * (BR + PR)
pub fn initiator_lx(
    own_bootstrap: &EcPrivateKey,
    peer_bootstrap: &EcPublicKey,
    peer_protocol: &EcPublicKey,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    match (own_bootstrap, peer_bootstrap, peer_protocol) {
        (EcPrivateKey::P256(bi), EcPublicKey::P256(br), EcPublicKey::P256(pr)) => {
            let sum = br.to_projective() + pr.to_projective();
            let point = sum * *bi.to_nonzero_scalar();
            if point == p256::ProjectivePoint::IDENTITY {
                return Err(point_at_infinity("Lx"));
            }
            Ok(Zeroizing::new(point.to_affine().x().to_vec()))
        }
        (EcPrivateKey::P384(bi), EcPublicKey::P384(br), EcPublicKey::P384(pr)) => {
            let sum = br.to_projective() + pr.to_projective();
            let point = sum * *bi.to_nonzero_scalar();
            if point == p384::ProjectivePoint::IDENTITY {
                return Err(point_at_infinity("Lx"));
            }
            Ok(Zeroizing::new(point.to_affine().x().to_vec()))
        }
        _ => Err(curve_mismatch("Lx")),
    }
}
