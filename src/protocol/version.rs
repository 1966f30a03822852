// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DPP protocol version carried through message building

use std::fmt;

use serde::{Deserialize, Serialize};

/// DPP protocol version
///
/// Version 1 peers never see a Protocol Version attribute; version 2
/// adds it together with the Configuration Result, connection status
/// and CSR exchanges; version 3 adds the connector "version" member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProtocolVersion {
    V1 = 1,
    V2 = 2,
    V3 = 3,
}

impl ProtocolVersion {
    pub const LATEST: ProtocolVersion = ProtocolVersion::V3;

    /// Map a received version octet; zero is invalid, newer values clamp
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => None,
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            _ => Some(Self::V3),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether frames built at this version carry a Protocol Version attribute
    pub fn has_version_attr(self) -> bool {
        self >= Self::V2
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            other => Err(format!("unsupported DPP version {}", other)),
        }
    }
}

impl From<ProtocolVersion> for u8 {
    fn from(version: ProtocolVersion) -> Self {
        version.as_u8()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_mapping() {
        assert_eq!(ProtocolVersion::from_wire(0), None);
        assert_eq!(ProtocolVersion::from_wire(2), Some(ProtocolVersion::V2));
        assert_eq!(ProtocolVersion::from_wire(9), Some(ProtocolVersion::V3));
    }

    #[test]
    fn test_ordering_and_version_attr() {
        assert!(ProtocolVersion::V1 < ProtocolVersion::V2);
        assert!(!ProtocolVersion::V1.has_version_attr());
        assert!(ProtocolVersion::V3.has_version_attr());
        assert_eq!(ProtocolVersion::default(), ProtocolVersion::V3);
    }

    #[test]
    fn test_try_from_rejects_unknown() {
        assert!(ProtocolVersion::try_from(4).is_err());
        assert_eq!(ProtocolVersion::try_from(1).unwrap(), ProtocolVersion::V1);
    }
}
