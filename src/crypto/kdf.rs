// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hash, HMAC and HKDF dispatch by curve hash length
//!
//! DPP picks the hash from the curve: 32 bytes selects SHA-256, 48
//! SHA-384 and 64 SHA-512. Every helper here takes that length and runs
//! the matching RustCrypto implementation.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use super::curves::CurveParams;
use super::error::CryptoError;

const LABEL_K1: &[u8] = b"first intermediate key";
const LABEL_K2: &[u8] = b"second intermediate key";
const LABEL_KE: &[u8] = b"DPP Key";
const LABEL_PMK: &[u8] = b"DPP PMK";

/// Run `$body` with `$h` bound to the hash type for `$len`
macro_rules! with_hash {
    ($len:expr, $h:ident => $body:expr) => {
        match $len {
            32 => {
                type $h = Sha256;
                $body
            }
            48 => {
                type $h = Sha384;
                $body
            }
            64 => {
                type $h = Sha512;
                $body
            }
            other => Err(CryptoError::UnsupportedHashLength(other)),
        }
    };
}

/// Hash the concatenation of `parts`
pub fn hash_vector(hash_len: usize, parts: &[&[u8]]) -> Result<Vec<u8>, CryptoError> {
    with_hash!(hash_len, H => {
        let mut hasher = H::new();
        for part in parts {
            hasher.update(part);
        }
        Ok(hasher.finalize().to_vec())
    })
}

/// HMAC over the concatenation of `parts`
pub fn hmac_vector(
    hash_len: usize,
    key: &[u8],
    parts: &[&[u8]],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    with_hash!(hash_len, H => {
        let mut mac = <Hmac<H> as Mac>::new_from_slice(key).map_err(|e| {
            CryptoError::KeyDerivationFailed {
                operation: "hmac".to_string(),
                reason: e.to_string(),
            }
        })?;
        for part in parts {
            mac.update(part);
        }
        Ok(Zeroizing::new(mac.finalize().into_bytes().to_vec()))
    })
}

/// HKDF with an all-zero salt: extract `ikm`, expand with `label`
pub fn hkdf_extract_expand(
    hash_len: usize,
    ikm: &[u8],
    label: &[u8],
    out_len: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    with_hash!(hash_len, H => {
        let hk = Hkdf::<H>::new(None, ikm);
        let mut okm = Zeroizing::new(vec![0u8; out_len]);
        hk.expand(label, &mut okm).map_err(|e| CryptoError::KeyDerivationFailed {
            operation: "hkdf_expand".to_string(),
            reason: e.to_string(),
        })?;
        Ok(okm)
    })
}

/// HKDF-Expand from an existing pseudorandom key
pub fn hkdf_expand(
    hash_len: usize,
    prk: &[u8],
    label: &[u8],
    out_len: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    with_hash!(hash_len, H => {
        let hk = Hkdf::<H>::from_prk(prk).map_err(|e| CryptoError::KeyDerivationFailed {
            operation: "hkdf_from_prk".to_string(),
            reason: e.to_string(),
        })?;
        let mut okm = Zeroizing::new(vec![0u8; out_len]);
        hk.expand(label, &mut okm).map_err(|e| CryptoError::KeyDerivationFailed {
            operation: "hkdf_expand".to_string(),
            reason: e.to_string(),
        })?;
        Ok(okm)
    })
}

/// k1 = HKDF(<>, "first intermediate key", M.x)
pub fn derive_k1(curve: &CurveParams, mx: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    hkdf_extract_expand(curve.hash_len, mx, LABEL_K1, curve.hash_len)
}

/// k2 = HKDF(<>, "second intermediate key", N.x)
pub fn derive_k2(curve: &CurveParams, nx: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    hkdf_extract_expand(curve.hash_len, nx, LABEL_K2, curve.hash_len)
}

/// Derive bk and ke
///
/// bk = HKDF-Extract(I-nonce | R-nonce, M.x | N.x [| L.x]),
/// ke = HKDF-Expand(bk, "DPP Key", hash_len)
///
/// # Returns
///
/// `(bk, ke)`
pub fn derive_bk_ke(
    curve: &CurveParams,
    i_nonce: &[u8],
    r_nonce: &[u8],
    mx: &[u8],
    nx: &[u8],
    lx: Option<&[u8]>,
) -> Result<(Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>), CryptoError> {
    let mut salt = Vec::with_capacity(i_nonce.len() + r_nonce.len());
    salt.extend_from_slice(i_nonce);
    salt.extend_from_slice(r_nonce);

    let bk = match lx {
        Some(lx) => hmac_vector(curve.hash_len, &salt, &[mx, nx, lx])?,
        None => hmac_vector(curve.hash_len, &salt, &[mx, nx])?,
    };
    let ke = hkdf_expand(curve.hash_len, &bk, LABEL_KE, curve.hash_len)?;
    Ok((bk, ke))
}

/// PMK = HKDF(<>, "DPP PMK", N.x), `hash_len` bytes
pub fn derive_pmk(curve: &CurveParams, nx: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    hkdf_extract_expand(curve.hash_len, nx, LABEL_PMK, curve.hash_len)
}

/// PMKID = Truncate-128(SHA-256(min(NK.x, PK.x) | max(NK.x, PK.x)))
pub fn derive_pmkid(own_x: &[u8], peer_x: &[u8]) -> [u8; 16] {
    let (low, high) = if own_x < peer_x {
        (own_x, peer_x)
    } else {
        (peer_x, own_x)
    };
    let digest = Sha256::new().chain_update(low).chain_update(high).finalize();
    let mut pmkid = [0u8; 16];
    pmkid.copy_from_slice(&digest[..16]);
    pmkid
}
