// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DPP Status attribute values

use std::fmt;

use super::attributes::AttrId;
use crate::error::DppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DppStatus {
    Ok = 0,
    NotCompatible = 1,
    AuthFailure = 2,
    UnwrapFailure = 3,
    BadGroup = 4,
    ConfigureFailure = 5,
    ResponsePending = 6,
    InvalidConnector = 7,
    NoMatch = 8,
    ConfigRejected = 9,
    NoAp = 10,
    ConfigurePending = 11,
    CsrNeeded = 12,
    CsrBad = 13,
    NewKeyNeeded = 14,
}

impl DppStatus {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == DppStatus::Ok
    }
}

impl TryFrom<u8> for DppStatus {
    type Error = DppError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Ok,
            1 => Self::NotCompatible,
            2 => Self::AuthFailure,
            3 => Self::UnwrapFailure,
            4 => Self::BadGroup,
            5 => Self::ConfigureFailure,
            6 => Self::ResponsePending,
            7 => Self::InvalidConnector,
            8 => Self::NoMatch,
            9 => Self::ConfigRejected,
            10 => Self::NoAp,
            11 => Self::ConfigurePending,
            12 => Self::CsrNeeded,
            13 => Self::CsrBad,
            14 => Self::NewKeyNeeded,
            other => {
                return Err(DppError::invalid(
                    AttrId::STATUS,
                    format!("Unknown DPP Status value {}", other),
                ))
            }
        })
    }
}

impl fmt::Display for DppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::NotCompatible => "NOT_COMPATIBLE",
            Self::AuthFailure => "AUTH_FAILURE",
            Self::UnwrapFailure => "UNWRAP_FAILURE",
            Self::BadGroup => "BAD_GROUP",
            Self::ConfigureFailure => "CONFIGURE_FAILURE",
            Self::ResponsePending => "RESPONSE_PENDING",
            Self::InvalidConnector => "INVALID_CONNECTOR",
            Self::NoMatch => "NO_MATCH",
            Self::ConfigRejected => "CONFIG_REJECTED",
            Self::NoAp => "NO_AP",
            Self::ConfigurePending => "CONFIGURE_PENDING",
            Self::CsrNeeded => "CSR_NEEDED",
            Self::CsrBad => "CSR_BAD",
            Self::NewKeyNeeded => "NEW_KEY_NEEDED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_values() {
        for value in 0u8..=14 {
            assert_eq!(DppStatus::try_from(value).unwrap().as_u8(), value);
        }
        assert!(DppStatus::try_from(15).is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(DppStatus::CsrNeeded.to_string(), "CSR_NEEDED");
        assert!(DppStatus::Ok.is_ok());
        assert!(!DppStatus::ResponsePending.is_ok());
    }
}
