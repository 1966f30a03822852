// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! JWK encoding of EC public keys and base64url helpers

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::curves::CurveParams;
use super::error::CryptoError;
use super::keys::EcPublicKey;

/// base64url without padding on output, padding optional on input
const B64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn b64url_encode(data: &[u8]) -> String {
    B64URL.encode(data)
}

pub fn b64url_decode(data: &str) -> Option<Vec<u8>> {
    B64URL.decode(data).ok()
}

pub fn b64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn b64_decode(data: &str) -> Option<Vec<u8>> {
    STANDARD.decode(data.trim()).ok()
}

/// Key identifier: base64url(SHA-256(uncompressed point))
pub fn key_id(key: &EcPublicKey) -> String {
    b64url_encode(&key_id_hash(key))
}

pub fn key_id_hash(key: &EcPublicKey) -> [u8; 32] {
    Sha256::digest(key.to_uncompressed()).into()
}

/// Encode `key` as a JWK, optionally with a "kid"
pub fn to_jwk(key: &EcPublicKey, kid: Option<&str>) -> Value {
    let mut jwk = json!({
        "kty": "EC",
        "crv": key.curve().jwk_crv,
        "x": b64url_encode(&key.x()),
        "y": b64url_encode(&key.y()),
    });
    if let Some(kid) = kid {
        jwk["kid"] = Value::String(kid.to_string());
    }
    jwk
}

/// Decode an EC JWK into a public key
///
/// # Arguments
///
/// * `jwk` - JSON object with "kty", "crv", "x" and "y"
///
/// # Returns
///
/// The key and the curve named by "crv"
pub fn from_jwk(jwk: &Value) -> Result<(EcPublicKey, &'static CurveParams), CryptoError> {
    let invalid = |reason: &str| CryptoError::InvalidKey {
        key_type: "jwk".to_string(),
        reason: reason.to_string(),
    };

    if jwk.get("kty").and_then(Value::as_str) != Some("EC") {
        return Err(invalid("Unexpected JWK kty"));
    }

    let crv = jwk
        .get("crv")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("JWK without crv"))?;
    let curve = CurveParams::by_jwk_crv(crv).ok_or_else(|| invalid("Unsupported JWK crv"))?;
    curve.ensure_supported()?;

    let x = jwk
        .get("x")
        .and_then(Value::as_str)
        .and_then(b64url_decode)
        .ok_or_else(|| invalid("Missing or invalid JWK x"))?;
    let y = jwk
        .get("y")
        .and_then(Value::as_str)
        .and_then(b64url_decode)
        .ok_or_else(|| invalid("Missing or invalid JWK y"))?;
    if x.len() != curve.prime_len || y.len() != curve.prime_len {
        return Err(invalid("Unexpected JWK x/y length"));
    }

    let mut xy = x;
    xy.extend_from_slice(&y);
    let key = EcPublicKey::from_xy(curve, &xy)?;
    Ok((key, curve))
}
