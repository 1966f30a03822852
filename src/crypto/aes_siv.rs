// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-SIV (RFC 5297) with a vector of associated-data components
//!
//! The key length picks the block cipher: 32 bytes AES-128, 48 bytes
//! AES-192, 64 bytes AES-256. Output is the 16-byte synthetic IV followed
//! by the ciphertext.

use aes_siv::aead::KeyInit;
use aes_siv::siv::{Aes128Siv, Aes256Siv, CmacSiv};

use super::error::CryptoError;

/// Length of the synthetic IV prepended to every ciphertext
pub const AES_BLOCK_SIZE: usize = 16;

type Aes192Siv = CmacSiv<aes::Aes192>;

/// Run `$body` with `$siv` bound to a cipher instance keyed from `$key`
macro_rules! with_siv {
    ($key:expr, $op:expr, $siv:ident => $body:expr) => {
        match $key.len() {
            32 => {
                let mut $siv = Aes128Siv::new_from_slice($key).map_err(|_| bad_key($op))?;
                $body
            }
            48 => {
                let mut $siv = Aes192Siv::new_from_slice($key).map_err(|_| bad_key($op))?;
                $body
            }
            64 => {
                let mut $siv = Aes256Siv::new_from_slice($key).map_err(|_| bad_key($op))?;
                $body
            }
            other => Err(CryptoError::EncryptionFailed {
                operation: $op.to_string(),
                reason: format!("unsupported AES-SIV key length {}", other),
            }),
        }
    };
}

fn bad_key(operation: &str) -> CryptoError {
    CryptoError::InvalidKey {
        key_type: "aes_siv_key".to_string(),
        reason: format!("rejected by AES-SIV during {}", operation),
    }
}

/// Seal `plaintext` under `key`, authenticating each `ad` component
///
/// # Arguments
///
/// * `key` - 32, 48 or 64 byte key (k1, k2 or ke)
/// * `plaintext` - Attributes to protect
/// * `ad` - Associated data components, in order
///
/// # Returns
///
/// SIV | ciphertext, `plaintext.len() + 16` bytes
pub fn aead_seal(key: &[u8], plaintext: &[u8], ad: &[&[u8]]) -> Result<Vec<u8>, CryptoError> {
    with_siv!(key, "seal", siv => {
        siv.encrypt(ad.iter().copied(), plaintext)
            .map_err(|_| CryptoError::EncryptionFailed {
                operation: "seal".to_string(),
                reason: "AES-SIV encryption failed".to_string(),
            })
    })
}

/// Open a sealed buffer; any tampering with key, ciphertext or AD fails
pub fn aead_open(key: &[u8], ciphertext: &[u8], ad: &[&[u8]]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < AES_BLOCK_SIZE {
        return Err(CryptoError::DecryptionFailed {
            operation: "open".to_string(),
            reason: "ciphertext shorter than the synthetic IV".to_string(),
        });
    }
    with_siv!(key, "open", siv => {
        siv.decrypt(ad.iter().copied(), ciphertext)
            .map_err(CryptoError::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc5297_deterministic_vector() {
        // RFC 5297 A.1
        let key = hex::decode(
            "fffefdfcfbfaf9f8f7f6f5f4f3f2f1f0f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff",
        )
        .unwrap();
        let ad = hex::decode("101112131415161718191a1b1c1d1e1f2021222324252627").unwrap();
        let pt = hex::decode("112233445566778899aabbccddee").unwrap();

        let ct = aead_seal(&key, &pt, &[&ad]).unwrap();
        assert_eq!(
            hex::encode(&ct),
            "85632d07c6e8f37f950acd320a2ecc9340c02b9690c4dc04daef7f6afe5c"
        );
        assert_eq!(aead_open(&key, &ct, &[&ad]).unwrap(), pt);
    }

    #[test]
    fn test_all_key_lengths_round_trip() {
        for len in [32usize, 48, 64] {
            let key = vec![0x42u8; len];
            let ct = aead_seal(&key, b"attributes", &[b"hdr", b"clear"]).unwrap();
            assert_eq!(ct.len(), 10 + AES_BLOCK_SIZE);
            let pt = aead_open(&key, &ct, &[b"hdr", b"clear"]).unwrap();
            assert_eq!(pt, b"attributes");
        }
    }

    #[test]
    fn test_open_detects_ad_change() {
        let key = [1u8; 32];
        let ct = aead_seal(&key, b"payload", &[b"hdr", b"a"]).unwrap();
        assert!(aead_open(&key, &ct, &[b"hdr", b"b"]).is_err());
        assert!(aead_open(&key, &ct, &[b"hdr"]).is_err());
    }

    #[test]
    fn test_open_detects_ciphertext_change() {
        let key = [1u8; 48];
        let mut ct = aead_seal(&key, b"payload", &[]).unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0x01;
        assert!(matches!(
            aead_open(&key, &ct, &[]),
            Err(CryptoError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn test_unsupported_key_length() {
        assert!(aead_seal(&[0u8; 16], b"x", &[]).is_err());
        assert!(aead_open(&[0u8; 16], &[0u8; 16], &[]).is_err());
    }
}
