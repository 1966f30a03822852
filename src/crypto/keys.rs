// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! EC key handling for bootstrapping, protocol and signing keys
//!
//! Keys are enums over the supported curves so that protocol code can
//! carry a key without being generic over the curve type.

use std::fmt;

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::DecodePublicKey;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::curves::{CurveId, CurveParams};
use super::error::CryptoError;

/// DER prefix of a P-256 SubjectPublicKeyInfo holding a compressed point
const SPKI_PREFIX_P256: [u8; 26] = [
    0x30, 0x39, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08,
    0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x22, 0x00,
];

/// DER prefix of a P-384 SubjectPublicKeyInfo holding a compressed point
const SPKI_PREFIX_P384: [u8; 23] = [
    0x30, 0x46, 0x30, 0x10, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x05,
    0x2b, 0x81, 0x04, 0x00, 0x22, 0x03, 0x32, 0x00,
];

/// Prefix mixed into the bootstrapping key hash used for chirping
const CHIRP_PREFIX: &[u8] = b"chirp";

/// EC private key on a supported curve
#[derive(Clone)]
pub enum EcPrivateKey {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
}

/// EC public key on a supported curve
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EcPublicKey {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
}

impl EcPrivateKey {
    /// Generate a fresh random key on `curve`
    pub fn generate(curve: &CurveParams) -> Result<Self, CryptoError> {
        match curve.id {
            CurveId::P256 => Ok(Self::P256(p256::SecretKey::random(&mut OsRng))),
            CurveId::P384 => Ok(Self::P384(p384::SecretKey::random(&mut OsRng))),
            _ => Err(CryptoError::UnsupportedCurve(curve.name.to_string())),
        }
    }

    /// Load a private scalar (big-endian, `prime_len` bytes)
    pub fn from_bytes(curve: &CurveParams, bytes: &[u8]) -> Result<Self, CryptoError> {
        curve.ensure_supported()?;
        if bytes.len() != curve.prime_len {
            return Err(CryptoError::InvalidKey {
                key_type: "private_key".to_string(),
                reason: format!(
                    "expected {} bytes, got {} bytes",
                    curve.prime_len,
                    bytes.len()
                ),
            });
        }

        match curve.id {
            CurveId::P256 => Ok(Self::P256(p256::SecretKey::from_slice(bytes)?)),
            CurveId::P384 => Ok(Self::P384(p384::SecretKey::from_slice(bytes)?)),
            _ => Err(CryptoError::UnsupportedCurve(curve.name.to_string())),
        }
    }

    /// Load a private scalar from hex
    pub fn from_hex(curve: &CurveParams, hex_key: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(hex::decode(hex_key.trim())?);
        Self::from_bytes(curve, &bytes)
    }

    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            Self::P256(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
            Self::P384(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
        }
    }

    pub fn public_key(&self) -> EcPublicKey {
        match self {
            Self::P256(sk) => EcPublicKey::P256(sk.public_key()),
            Self::P384(sk) => EcPublicKey::P384(sk.public_key()),
        }
    }

    pub fn curve(&self) -> &'static CurveParams {
        match self {
            Self::P256(_) => CurveId::P256.params(),
            Self::P384(_) => CurveId::P384.params(),
        }
    }
}

impl fmt::Debug for EcPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EcPrivateKey({}, ..)", self.curve().jwk_crv)
    }
}

impl EcPublicKey {
    pub fn curve(&self) -> &'static CurveParams {
        match self {
            Self::P256(_) => CurveId::P256.params(),
            Self::P384(_) => CurveId::P384.params(),
        }
    }

    /// SEC1 uncompressed encoding (0x04 | x | y)
    pub fn to_uncompressed(&self) -> Vec<u8> {
        match self {
            Self::P256(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
            Self::P384(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    /// SEC1 compressed encoding (0x02/0x03 | x)
    pub fn to_compressed(&self) -> Vec<u8> {
        match self {
            Self::P256(pk) => pk.to_encoded_point(true).as_bytes().to_vec(),
            Self::P384(pk) => pk.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    /// x coordinate, `prime_len` bytes
    pub fn x(&self) -> Vec<u8> {
        let len = self.curve().prime_len;
        self.to_uncompressed()[1..1 + len].to_vec()
    }

    /// y coordinate, `prime_len` bytes
    pub fn y(&self) -> Vec<u8> {
        let len = self.curve().prime_len;
        self.to_uncompressed()[1 + len..].to_vec()
    }

    /// Raw x | y as carried in I/R-Protocol Key attributes
    pub fn to_xy(&self) -> Vec<u8> {
        self.to_uncompressed()[1..].to_vec()
    }

    /// Parse a raw x | y point on `curve`
    ///
    /// # Arguments
    ///
    /// * `curve` - Curve negotiated for the exchange
    /// * `xy` - Concatenated coordinates, `2 * prime_len` bytes
    ///
    /// # Returns
    ///
    /// The public key, or `InvalidKey` if the length is wrong or the point
    /// is not on the curve
    pub fn from_xy(curve: &CurveParams, xy: &[u8]) -> Result<Self, CryptoError> {
        curve.ensure_supported()?;
        if xy.len() != 2 * curve.prime_len {
            return Err(CryptoError::InvalidKey {
                key_type: "protocol_key".to_string(),
                reason: format!(
                    "expected {} bytes, got {} bytes",
                    2 * curve.prime_len,
                    xy.len()
                ),
            });
        }

        let mut sec1 = Vec::with_capacity(xy.len() + 1);
        sec1.push(0x04);
        sec1.extend_from_slice(xy);
        Self::from_sec1(curve, &sec1)
    }

    /// Parse a SEC1 encoded point (compressed or uncompressed) on `curve`
    pub fn from_sec1(curve: &CurveParams, bytes: &[u8]) -> Result<Self, CryptoError> {
        let key = match curve.id {
            CurveId::P256 => p256::PublicKey::from_sec1_bytes(bytes).map(Self::P256),
            CurveId::P384 => p384::PublicKey::from_sec1_bytes(bytes).map(Self::P384),
            _ => return Err(CryptoError::UnsupportedCurve(curve.name.to_string())),
        };
        key.map_err(|_| CryptoError::InvalidKey {
            key_type: "public_key".to_string(),
            reason: "point is not on the curve".to_string(),
        })
    }

    /// Decode a DER SubjectPublicKeyInfo (as carried in the URI "K:" field)
    pub fn from_spki_der(der: &[u8]) -> Result<Self, CryptoError> {
        if let Ok(pk) = p256::PublicKey::from_public_key_der(der) {
            return Ok(Self::P256(pk));
        }
        if let Ok(pk) = p384::PublicKey::from_public_key_der(der) {
            return Ok(Self::P384(pk));
        }
        Err(CryptoError::InvalidKey {
            key_type: "bootstrap_key".to_string(),
            reason: "not a P-256 or P-384 SubjectPublicKeyInfo".to_string(),
        })
    }

    /// DER SubjectPublicKeyInfo with the point in compressed form
    pub fn to_spki_der(&self) -> Vec<u8> {
        let prefix: &[u8] = match self {
            Self::P256(_) => &SPKI_PREFIX_P256,
            Self::P384(_) => &SPKI_PREFIX_P384,
        };
        let mut der = prefix.to_vec();
        der.extend_from_slice(&self.to_compressed());
        der
    }

    /// SHA-256 over the compressed-point SubjectPublicKeyInfo
    pub fn bootstrap_hash(&self) -> [u8; 32] {
        Sha256::digest(self.to_spki_der()).into()
    }

    /// SHA-256 over "chirp" | SubjectPublicKeyInfo
    pub fn chirp_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(CHIRP_PREFIX);
        hasher.update(self.to_spki_der());
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_p256_and_p384() {
        let p256 = EcPrivateKey::generate(CurveId::P256.params()).unwrap();
        assert_eq!(p256.public_key().to_xy().len(), 64);
        assert_eq!(p256.to_bytes().len(), 32);

        let p384 = EcPrivateKey::generate(CurveId::P384.params()).unwrap();
        assert_eq!(p384.public_key().to_xy().len(), 96);
        assert_eq!(p384.curve().jwk_crv, "P-384");
    }

    #[test]
    fn test_generate_unsupported_curve() {
        let err = EcPrivateKey::generate(CurveId::BrainpoolP384r1.params()).unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedCurve(_)));
    }

    #[test]
    fn test_private_key_bytes_round_trip() {
        let key = EcPrivateKey::generate(CurveId::P256.params()).unwrap();
        let restored = EcPrivateKey::from_bytes(CurveId::P256.params(), &key.to_bytes()).unwrap();
        assert_eq!(key.public_key(), restored.public_key());
    }

    #[test]
    fn test_private_key_wrong_length() {
        let err = EcPrivateKey::from_bytes(CurveId::P384.params(), &[1u8; 32]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey { .. }));
    }

    #[test]
    fn test_from_xy_rejects_off_curve_point() {
        let err = EcPublicKey::from_xy(CurveId::P256.params(), &[0x11u8; 64]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey { .. }));
    }

    #[test]
    fn test_from_xy_rejects_wrong_length() {
        let key = EcPrivateKey::generate(CurveId::P256.params()).unwrap();
        let xy = key.public_key().to_xy();
        assert!(EcPublicKey::from_xy(CurveId::P384.params(), &xy).is_err());
        assert_eq!(
            EcPublicKey::from_xy(CurveId::P256.params(), &xy).unwrap(),
            key.public_key()
        );
    }

    #[test]
    fn test_spki_der_layout_and_parse() {
        let key = EcPrivateKey::generate(CurveId::P256.params()).unwrap();
        let der = key.public_key().to_spki_der();
        assert_eq!(der.len(), 59);
        assert_eq!(&der[..2], &[0x30, 0x39]);
        assert_eq!(EcPublicKey::from_spki_der(&der).unwrap(), key.public_key());

        let key = EcPrivateKey::generate(CurveId::P384.params()).unwrap();
        let der = key.public_key().to_spki_der();
        assert_eq!(der.len(), 72);
        assert_eq!(EcPublicKey::from_spki_der(&der).unwrap(), key.public_key());
    }

    #[test]
    fn test_spki_der_garbage_rejected() {
        assert!(EcPublicKey::from_spki_der(b"not a key").is_err());
    }

    #[test]
    fn test_bootstrap_and_chirp_hashes_differ() {
        let key = EcPrivateKey::generate(CurveId::P256.params()).unwrap();
        let pk = key.public_key();
        let expected: [u8; 32] = Sha256::digest(pk.to_spki_der()).into();
        assert_eq!(pk.bootstrap_hash(), expected);
        assert_ne!(pk.bootstrap_hash(), pk.chirp_hash());
    }

    #[test]
    fn test_debug_does_not_leak_scalar() {
        let key = EcPrivateKey::generate(CurveId::P256.params()).unwrap();
        let dbg = format!("{:?}", key);
        assert_eq!(dbg, "EcPrivateKey(P-256, ..)");
    }
}
