// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DPP Cryptographic Primitives
//!
//! This module implements the primitives the DPP exchanges are built on:
//!
//! - **Curves**: Static table of DPP curves (hash, nonce and key lengths)
//! - **Keys**: P-256/P-384 private and public keys, SPKI and x|y encodings
//! - **ECDH**: Shared secrets M, N and the mutual-authentication secret L
//! - **KDF**: Hash/HMAC/HKDF dispatch and the k1/k2/bk/ke/PMK derivations
//! - **AES-SIV**: Deterministic AEAD with vector associated data
//! - **Auth Tags**: R-auth and I-auth computation
//! - **JWK**: JSON Web Key encoding and base64url helpers
//! - **Signature**: Raw r|s ECDSA signatures for Connectors
//!
//! ## Security Considerations
//!
//! - Intermediate secrets are returned as `Zeroizing` buffers
//! - Authenticating tags are compared in constant time
//! - Curves without key arithmetic fail with `UnsupportedCurve`

pub mod aes_siv;
pub mod auth_tags;
pub mod curves;
pub mod ecdh;
pub mod error;
pub mod jwk;
pub mod kdf;
pub mod keys;
pub mod signature;

pub use aes_siv::{aead_open, aead_seal, AES_BLOCK_SIZE};
pub use auth_tags::{compute_i_auth, compute_r_auth, tags_match, AuthTagInput};
pub use curves::{CurveId, CurveParams, CURVES};
pub use ecdh::{ecdh, initiator_lx, responder_lx};
pub use error::CryptoError;
pub use jwk::{
    b64_decode, b64_encode, b64url_decode, b64url_encode, from_jwk, key_id, key_id_hash, to_jwk,
};
pub use kdf::{
    derive_bk_ke, derive_k1, derive_k2, derive_pmk, derive_pmkid, hash_vector, hkdf_expand,
    hkdf_extract_expand, hmac_vector,
};
pub use keys::{EcPrivateKey, EcPublicKey};
pub use signature::{sign_raw, verify_raw};
