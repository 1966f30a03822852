// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Responder and Initiator authenticating tags
//!
//! R-auth = H(I-nonce | R-nonce | PI.x | PR.x | [BI.x |] BR.x | 0)
//! I-auth = H(R-nonce | I-nonce | PR.x | PI.x | BR.x | [BI.x |] 1)
//!
//! BI.x participates only when mutual authentication is in use.

use subtle::ConstantTimeEq;

use super::error::CryptoError;
use super::kdf::hash_vector;

/// Inputs shared by both tag computations
pub struct AuthTagInput<'a> {
    pub hash_len: usize,
    pub i_nonce: &'a [u8],
    pub r_nonce: &'a [u8],
    /// Initiator protocol key x
    pub pi_x: &'a [u8],
    /// Responder protocol key x
    pub pr_x: &'a [u8],
    /// Initiator bootstrapping key x, present only for mutual authentication
    pub bi_x: Option<&'a [u8]>,
    /// Responder bootstrapping key x
    pub br_x: &'a [u8],
}

pub fn compute_r_auth(input: &AuthTagInput<'_>) -> Result<Vec<u8>, CryptoError> {
    let zero = [0u8];
    let mut parts: Vec<&[u8]> = vec![input.i_nonce, input.r_nonce, input.pi_x, input.pr_x];
    if let Some(bi_x) = input.bi_x {
        parts.push(bi_x);
    }
    parts.push(input.br_x);
    parts.push(&zero);
    hash_vector(input.hash_len, &parts)
}

pub fn compute_i_auth(input: &AuthTagInput<'_>) -> Result<Vec<u8>, CryptoError> {
    let one = [1u8];
    let mut parts: Vec<&[u8]> = vec![input.r_nonce, input.i_nonce, input.pr_x, input.pi_x, input.br_x];
    if let Some(bi_x) = input.bi_x {
        parts.push(bi_x);
    }
    parts.push(&one);
    hash_vector(input.hash_len, &parts)
}

/// Constant-time tag comparison
pub fn tags_match(expected: &[u8], received: &[u8]) -> bool {
    expected.len() == received.len() && bool::from(expected.ct_eq(received))
}
