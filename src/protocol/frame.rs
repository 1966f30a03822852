// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DPP Public Action frame envelope
//!
//! A DPP frame is a Public Action vendor-specific frame:
//! `category(4) | action(9) | OUI 50:6f:9a | type 0x1a | suite 1 | frame type | attributes`.
//! The six octets from the OUI through the frame type form the header
//! that is authenticated as the first AES-SIV AD component.

use super::cursor::ByteReader;
use crate::error::{DppError, Result};

pub const WLAN_ACTION_PUBLIC: u8 = 4;
pub const WLAN_PA_VENDOR_SPECIFIC: u8 = 9;
pub const OUI_WFA: [u8; 3] = [0x50, 0x6f, 0x9a];
pub const DPP_OUI_TYPE: u8 = 0x1a;
pub const DPP_CRYPTO_SUITE: u8 = 1;
/// OUI, OUI type, crypto suite, frame type
pub const DPP_HDR_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    AuthenticationRequest = 0,
    AuthenticationResponse = 1,
    AuthenticationConfirm = 2,
    PeerDiscoveryRequest = 5,
    PeerDiscoveryResponse = 6,
    PkexV1ExchangeRequest = 7,
    PkexExchangeResponse = 8,
    PkexCommitRevealRequest = 9,
    PkexCommitRevealResponse = 10,
    ConfigurationResult = 11,
    ConnectionStatusResult = 12,
    PresenceAnnouncement = 13,
    ReconfigAnnouncement = 14,
    ReconfigAuthRequest = 15,
    ReconfigAuthResponse = 16,
    ReconfigAuthConfirm = 17,
    PkexExchangeRequest = 18,
}

impl FrameType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::AuthenticationRequest,
            1 => Self::AuthenticationResponse,
            2 => Self::AuthenticationConfirm,
            5 => Self::PeerDiscoveryRequest,
            6 => Self::PeerDiscoveryResponse,
            7 => Self::PkexV1ExchangeRequest,
            8 => Self::PkexExchangeResponse,
            9 => Self::PkexCommitRevealRequest,
            10 => Self::PkexCommitRevealResponse,
            11 => Self::ConfigurationResult,
            12 => Self::ConnectionStatusResult,
            13 => Self::PresenceAnnouncement,
            14 => Self::ReconfigAnnouncement,
            15 => Self::ReconfigAuthRequest,
            16 => Self::ReconfigAuthResponse,
            17 => Self::ReconfigAuthConfirm,
            18 => Self::PkexExchangeRequest,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Parsed six-octet DPP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: FrameType,
}

impl FrameHeader {
    pub fn new(frame_type: FrameType) -> Self {
        Self { frame_type }
    }

    pub fn to_bytes(&self) -> [u8; DPP_HDR_LEN] {
        [
            OUI_WFA[0],
            OUI_WFA[1],
            OUI_WFA[2],
            DPP_OUI_TYPE,
            DPP_CRYPTO_SUITE,
            self.frame_type.as_u8(),
        ]
    }

    /// Parse the header octets (exactly six)
    pub fn parse(hdr: &[u8]) -> Result<Self> {
        if hdr.len() != DPP_HDR_LEN {
            return Err(DppError::MalformedFrame(format!(
                "Invalid DPP header length {}",
                hdr.len()
            )));
        }
        if hdr[..3] != OUI_WFA || hdr[3] != DPP_OUI_TYPE {
            return Err(DppError::MalformedFrame(
                "Not a DPP vendor-specific frame".to_string(),
            ));
        }
        if hdr[4] != DPP_CRYPTO_SUITE {
            return Err(DppError::MalformedFrame(format!(
                "Unsupported crypto suite {}",
                hdr[4]
            )));
        }
        let frame_type = FrameType::from_u8(hdr[5]).ok_or_else(|| {
            DppError::MalformedFrame(format!("Unknown DPP frame type {}", hdr[5]))
        })?;
        Ok(Self { frame_type })
    }
}

/// A DPP frame ready to hand to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingFrame {
    pub frame_type: FrameType,
    pub attrs: Vec<u8>,
}

impl OutgoingFrame {
    pub fn new(frame_type: FrameType, attrs: Vec<u8>) -> Self {
        Self { frame_type, attrs }
    }

    pub fn header(&self) -> [u8; DPP_HDR_LEN] {
        FrameHeader::new(self.frame_type).to_bytes()
    }

    /// Full Public Action frame body
    pub fn to_public_action(&self) -> Vec<u8> {
        build_outgoing(self.frame_type, &self.attrs)
    }
}

/// Build a Public Action frame body for `frame_type` carrying `attrs`
pub fn build_outgoing(frame_type: FrameType, attrs: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + DPP_HDR_LEN + attrs.len());
    out.push(WLAN_ACTION_PUBLIC);
    out.push(WLAN_PA_VENDOR_SPECIFIC);
    out.extend_from_slice(&FrameHeader::new(frame_type).to_bytes());
    out.extend_from_slice(attrs);
    out
}

/// Split a received Public Action frame into header octets and attributes
///
/// # Returns
///
/// `(header, raw header octets, attributes)`
pub fn parse_public_action(frame: &[u8]) -> Result<(FrameHeader, &[u8], &[u8])> {
    let mut reader = ByteReader::new(frame);
    let category = reader.read_u8()?;
    let action = reader.read_u8()?;
    if category != WLAN_ACTION_PUBLIC || action != WLAN_PA_VENDOR_SPECIFIC {
        return Err(DppError::MalformedFrame(format!(
            "Not a Public Action vendor frame (category {} action {})",
            category, action
        )));
    }
    let hdr = reader.read_bytes(DPP_HDR_LEN)?;
    let header = FrameHeader::parse(hdr)?;
    Ok((header, hdr, reader.rest()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let hdr = FrameHeader::new(FrameType::AuthenticationConfirm).to_bytes();
        assert_eq!(hdr, [0x50, 0x6f, 0x9a, 0x1a, 0x01, 0x02]);
        assert_eq!(
            FrameHeader::parse(&hdr).unwrap().frame_type,
            FrameType::AuthenticationConfirm
        );
    }

    #[test]
    fn test_header_rejects_other_suites_and_ouis() {
        assert!(FrameHeader::parse(&[0x50, 0x6f, 0x9a, 0x1a, 0x02, 0x00]).is_err());
        assert!(FrameHeader::parse(&[0x00, 0x6f, 0x9a, 0x1a, 0x01, 0x00]).is_err());
        assert!(FrameHeader::parse(&[0x50, 0x6f, 0x9a, 0x1a, 0x01, 0x03]).is_err());
        assert!(FrameHeader::parse(&[0x50, 0x6f, 0x9a]).is_err());
    }

    #[test]
    fn test_public_action_round_trip() {
        let frame = build_outgoing(FrameType::PresenceAnnouncement, &[1, 2, 3]);
        assert_eq!(&frame[..2], &[0x04, 0x09]);
        let (header, raw, attrs) = parse_public_action(&frame).unwrap();
        assert_eq!(header.frame_type, FrameType::PresenceAnnouncement);
        assert_eq!(raw.len(), DPP_HDR_LEN);
        assert_eq!(attrs, &[1, 2, 3]);
    }

    #[test]
    fn test_public_action_rejects_other_categories() {
        assert!(parse_public_action(&[0x07, 0x09, 0x50]).is_err());
        assert!(parse_public_action(&[0x04]).is_err());
    }
}
