// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! GAS encapsulation of the DPP Configuration Request/Response
//!
//! Initial Request: `category(4) | action(10) | dialog token | Adv Proto IE | LE16 len | query`
//! Initial Response: `category(4) | action(11) | dialog token | LE16 status | LE16 comeback | Adv Proto IE | LE16 len | response`

use super::cursor::ByteReader;
use super::frame::{DPP_OUI_TYPE, OUI_WFA, WLAN_ACTION_PUBLIC};
use crate::error::{DppError, Result};

pub const WLAN_PA_GAS_INITIAL_REQ: u8 = 10;
pub const WLAN_PA_GAS_INITIAL_RESP: u8 = 11;
pub const WLAN_EID_ADV_PROTO: u8 = 108;
pub const WLAN_EID_VENDOR_SPECIFIC: u8 = 221;
pub const WLAN_STATUS_SUCCESS: u16 = 0;

/// Advertisement Protocol element announcing the DPP configuration protocol
pub const DPP_ADV_PROTO: [u8; 10] = [
    WLAN_EID_ADV_PROTO,
    8,
    0x7f,
    WLAN_EID_VENDOR_SPECIFIC,
    5,
    OUI_WFA[0],
    OUI_WFA[1],
    OUI_WFA[2],
    DPP_OUI_TYPE,
    0x01,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasRequest<'a> {
    pub dialog_token: u8,
    pub query: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasResponse<'a> {
    pub dialog_token: u8,
    pub status_code: u16,
    pub comeback_delay: u16,
    pub response: &'a [u8],
}

fn put_query(out: &mut Vec<u8>, query: &[u8]) {
    out.extend_from_slice(&DPP_ADV_PROTO);
    out.extend_from_slice(&(query.len() as u16).to_le_bytes());
    out.extend_from_slice(query);
}

fn read_adv_proto(reader: &mut ByteReader<'_>) -> Result<()> {
    let ie = reader.read_bytes(DPP_ADV_PROTO.len())?;
    if ie != DPP_ADV_PROTO {
        return Err(DppError::MalformedFrame(
            "Not a DPP Advertisement Protocol element".to_string(),
        ));
    }
    Ok(())
}

fn read_query<'a>(reader: &mut ByteReader<'a>) -> Result<&'a [u8]> {
    let len = reader.read_le16()? as usize;
    let body = reader.read_bytes(len)?;
    if !reader.is_empty() {
        return Err(DppError::MalformedFrame(format!(
            "Unexpected {} octets after GAS query",
            reader.remaining()
        )));
    }
    Ok(body)
}

pub fn build_initial_request(dialog_token: u8, query: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + DPP_ADV_PROTO.len() + 2 + query.len());
    out.push(WLAN_ACTION_PUBLIC);
    out.push(WLAN_PA_GAS_INITIAL_REQ);
    out.push(dialog_token);
    put_query(&mut out, query);
    out
}

pub fn parse_initial_request(frame: &[u8]) -> Result<GasRequest<'_>> {
    let mut reader = ByteReader::new(frame);
    if reader.read_u8()? != WLAN_ACTION_PUBLIC || reader.read_u8()? != WLAN_PA_GAS_INITIAL_REQ {
        return Err(DppError::MalformedFrame(
            "Not a GAS Initial Request".to_string(),
        ));
    }
    let dialog_token = reader.read_u8()?;
    read_adv_proto(&mut reader)?;
    let query = read_query(&mut reader)?;
    Ok(GasRequest {
        dialog_token,
        query,
    })
}

pub fn build_initial_response(
    dialog_token: u8,
    status_code: u16,
    comeback_delay: u16,
    response: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(7 + DPP_ADV_PROTO.len() + 2 + response.len());
    out.push(WLAN_ACTION_PUBLIC);
    out.push(WLAN_PA_GAS_INITIAL_RESP);
    out.push(dialog_token);
    out.extend_from_slice(&status_code.to_le_bytes());
    out.extend_from_slice(&comeback_delay.to_le_bytes());
    put_query(&mut out, response);
    out
}

pub fn parse_initial_response(frame: &[u8]) -> Result<GasResponse<'_>> {
    let mut reader = ByteReader::new(frame);
    if reader.read_u8()? != WLAN_ACTION_PUBLIC || reader.read_u8()? != WLAN_PA_GAS_INITIAL_RESP {
        return Err(DppError::MalformedFrame(
            "Not a GAS Initial Response".to_string(),
        ));
    }
    let dialog_token = reader.read_u8()?;
    let status_code = reader.read_le16()?;
    let comeback_delay = reader.read_le16()?;
    read_adv_proto(&mut reader)?;
    let response = read_query(&mut reader)?;
    Ok(GasResponse {
        dialog_token,
        status_code,
        comeback_delay,
        response,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adv_proto_bytes() {
        assert_eq!(
            DPP_ADV_PROTO,
            [0x6c, 0x08, 0x7f, 0xdd, 0x05, 0x50, 0x6f, 0x9a, 0x1a, 0x01]
        );
    }

    #[test]
    fn test_request_layout() {
        let frame = build_initial_request(7, &[0xaa, 0xbb]);
        assert_eq!(&frame[..3], &[0x04, 0x0a, 0x07]);
        assert_eq!(&frame[13..15], &[0x02, 0x00]);

        let req = parse_initial_request(&frame).unwrap();
        assert_eq!(req.dialog_token, 7);
        assert_eq!(req.query, &[0xaa, 0xbb]);
    }

    #[test]
    fn test_response_layout() {
        let frame = build_initial_response(3, WLAN_STATUS_SUCCESS, 0, b"resp");
        let resp = parse_initial_response(&frame).unwrap();
        assert_eq!(resp.dialog_token, 3);
        assert_eq!(resp.status_code, 0);
        assert_eq!(resp.response, b"resp");
    }

    #[test]
    fn test_rejects_foreign_adv_proto_and_trailing_data() {
        let mut frame = build_initial_request(1, b"q");
        frame[8] = 0x00;
        assert!(parse_initial_request(&frame).is_err());

        let mut frame = build_initial_request(1, b"q");
        frame.push(0);
        assert!(parse_initial_request(&frame).is_err());
    }
}
