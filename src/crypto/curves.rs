// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DPP curve table
//!
//! Static parameters for every curve DPP names. Key arithmetic is only
//! available for P-256 and P-384; the remaining rows are kept so that
//! names, JWK identifiers and IKE groups resolve consistently.

use std::fmt;

use super::error::CryptoError;

/// Identifier of a DPP curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveId {
    P256,
    P384,
    P521,
    BrainpoolP256r1,
    BrainpoolP384r1,
    BrainpoolP512r1,
}

/// Per-curve parameters
#[derive(Debug, PartialEq, Eq)]
pub struct CurveParams {
    pub id: CurveId,
    /// Name used in configuration and URIs ("prime256v1")
    pub name: &'static str,
    pub hash_len: usize,
    pub aes_siv_key_len: usize,
    pub nonce_len: usize,
    /// Length of a field element (and of each signature half)
    pub prime_len: usize,
    /// "crv" value in JWK
    pub jwk_crv: &'static str,
    pub ike_group: u16,
    /// JWS "alg" value for connectors signed with this curve
    pub jws_alg: &'static str,
}

pub static CURVES: [CurveParams; 6] = [
    CurveParams {
        id: CurveId::P256,
        name: "prime256v1",
        hash_len: 32,
        aes_siv_key_len: 32,
        nonce_len: 16,
        prime_len: 32,
        jwk_crv: "P-256",
        ike_group: 19,
        jws_alg: "ES256",
    },
    CurveParams {
        id: CurveId::P384,
        name: "secp384r1",
        hash_len: 48,
        aes_siv_key_len: 48,
        nonce_len: 24,
        prime_len: 48,
        jwk_crv: "P-384",
        ike_group: 20,
        jws_alg: "ES384",
    },
    CurveParams {
        id: CurveId::P521,
        name: "secp521r1",
        hash_len: 64,
        aes_siv_key_len: 64,
        nonce_len: 32,
        prime_len: 66,
        jwk_crv: "P-521",
        ike_group: 21,
        jws_alg: "ES512",
    },
    CurveParams {
        id: CurveId::BrainpoolP256r1,
        name: "brainpoolP256r1",
        hash_len: 32,
        aes_siv_key_len: 32,
        nonce_len: 16,
        prime_len: 32,
        jwk_crv: "BP-256",
        ike_group: 28,
        jws_alg: "BS256",
    },
    CurveParams {
        id: CurveId::BrainpoolP384r1,
        name: "brainpoolP384r1",
        hash_len: 48,
        aes_siv_key_len: 48,
        nonce_len: 24,
        prime_len: 48,
        jwk_crv: "BP-384",
        ike_group: 29,
        jws_alg: "BS384",
    },
    CurveParams {
        id: CurveId::BrainpoolP512r1,
        name: "brainpoolP512r1",
        hash_len: 64,
        aes_siv_key_len: 64,
        nonce_len: 32,
        prime_len: 64,
        jwk_crv: "BP-512",
        ike_group: 30,
        jws_alg: "BS512",
    },
];

impl CurveParams {
    /// The curve used when none is requested (P-256)
    pub fn default_curve() -> &'static CurveParams {
        &CURVES[0]
    }

    /// Look up a curve by table name or JWK "crv" value
    pub fn by_name(name: &str) -> Option<&'static CurveParams> {
        CURVES
            .iter()
            .find(|c| c.name == name || c.jwk_crv == name)
    }

    pub fn by_jwk_crv(crv: &str) -> Option<&'static CurveParams> {
        CURVES.iter().find(|c| c.jwk_crv == crv)
    }

    pub fn by_ike_group(group: u16) -> Option<&'static CurveParams> {
        CURVES.iter().find(|c| c.ike_group == group)
    }

    /// Whether keys on this curve can be generated and used
    pub fn is_supported(&self) -> bool {
        matches!(self.id, CurveId::P256 | CurveId::P384)
    }

    /// Fail with `UnsupportedCurve` unless key operations are available
    pub fn ensure_supported(&self) -> Result<(), CryptoError> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(CryptoError::UnsupportedCurve(self.name.to_string()))
        }
    }
}

impl CurveId {
    pub fn params(self) -> &'static CurveParams {
        match self {
            CurveId::P256 => &CURVES[0],
            CurveId::P384 => &CURVES[1],
            CurveId::P521 => &CURVES[2],
            CurveId::BrainpoolP256r1 => &CURVES[3],
            CurveId::BrainpoolP384r1 => &CURVES[4],
            CurveId::BrainpoolP512r1 => &CURVES[5],
        }
    }
}

impl fmt::Display for CurveParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
