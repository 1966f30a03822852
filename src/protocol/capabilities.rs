// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! I/R-capabilities octet and local role policy

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const CAPAB_ENROLLEE: u8 = 0x01;
pub const CAPAB_CONFIGURATOR: u8 = 0x02;
pub const CAPAB_ROLE_MASK: u8 = CAPAB_ENROLLEE | CAPAB_CONFIGURATOR;

/// Roles this device is willing to take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowedRoles {
    Configurator,
    Enrollee,
    Either,
}

impl AllowedRoles {
    /// Capability bits advertised for this policy
    pub fn capab_bits(self) -> u8 {
        match self {
            Self::Configurator => CAPAB_CONFIGURATOR,
            Self::Enrollee => CAPAB_ENROLLEE,
            Self::Either => CAPAB_CONFIGURATOR | CAPAB_ENROLLEE,
        }
    }

    pub fn allows_configurator(self) -> bool {
        self.capab_bits() & CAPAB_CONFIGURATOR != 0
    }

    pub fn allows_enrollee(self) -> bool {
        self.capab_bits() & CAPAB_ENROLLEE != 0
    }
}

impl Default for AllowedRoles {
    fn default() -> Self {
        Self::Either
    }
}

impl FromStr for AllowedRoles {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "configurator" => Ok(Self::Configurator),
            "enrollee" => Ok(Self::Enrollee),
            "either" => Ok(Self::Either),
            other => Err(format!("unknown role policy '{}'", other)),
        }
    }
}

impl fmt::Display for AllowedRoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configurator => "configurator",
            Self::Enrollee => "enrollee",
            Self::Either => "either",
        })
    }
}

/// Outcome of resolving the local role against the peer's I-capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSelection {
    /// Local side acts as Configurator (`true`) or Enrollee (`false`)
    Selected { configurator: bool },
    /// Peer asked for a role local policy does not allow
    NotCompatible,
    /// Peer advertised no role at all
    Invalid,
}

/// Responder role selection from the Initiator's I-capabilities
///
/// When the Initiator offers both roles the Responder prefers Enrollee.
pub fn select_responder_role(allowed: AllowedRoles, i_capab: u8) -> RoleSelection {
    match i_capab & CAPAB_ROLE_MASK {
        CAPAB_ENROLLEE if allowed.allows_configurator() => {
            RoleSelection::Selected { configurator: true }
        }
        CAPAB_CONFIGURATOR if allowed.allows_enrollee() => {
            RoleSelection::Selected {
                configurator: false,
            }
        }
        CAPAB_ROLE_MASK if allowed.allows_enrollee() => RoleSelection::Selected {
            configurator: false,
        },
        CAPAB_ROLE_MASK if allowed.allows_configurator() => {
            RoleSelection::Selected { configurator: true }
        }
        0 => RoleSelection::Invalid,
        _ => RoleSelection::NotCompatible,
    }
}

/// Initiator role check against the Responder's R-capabilities
///
/// `current` is the role the Initiator assumed when sending the request.
pub fn select_initiator_role(allowed: AllowedRoles, current: bool, r_capab: u8) -> RoleSelection {
    let role = r_capab & CAPAB_ROLE_MASK;
    if allowed == AllowedRoles::Either && (role == CAPAB_CONFIGURATOR || role == CAPAB_ENROLLEE) {
        return RoleSelection::Selected {
            configurator: role == CAPAB_ENROLLEE,
        };
    }
    if (current && role != CAPAB_ENROLLEE) || (!current && role != CAPAB_CONFIGURATOR) {
        return RoleSelection::NotCompatible;
    }
    RoleSelection::Selected {
        configurator: current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_responder_role_table() {
        use AllowedRoles::*;
        assert_eq!(
            select_responder_role(Configurator, CAPAB_ENROLLEE),
            RoleSelection::Selected { configurator: true }
        );
        assert_eq!(
            select_responder_role(Configurator, CAPAB_CONFIGURATOR),
            RoleSelection::NotCompatible
        );
        assert_eq!(
            select_responder_role(Enrollee, CAPAB_CONFIGURATOR),
            RoleSelection::Selected {
                configurator: false
            }
        );
        assert_eq!(
            select_responder_role(Either, CAPAB_ROLE_MASK),
            RoleSelection::Selected {
                configurator: false
            }
        );
        assert_eq!(
            select_responder_role(Configurator, CAPAB_ROLE_MASK),
            RoleSelection::Selected { configurator: true }
        );
        assert_eq!(select_responder_role(Either, 0), RoleSelection::Invalid);
    }

    #[test]
    fn test_initiator_role_table() {
        use AllowedRoles::*;
        assert_eq!(
            select_initiator_role(Either, true, CAPAB_CONFIGURATOR),
            RoleSelection::Selected {
                configurator: false
            }
        );
        assert_eq!(
            select_initiator_role(Configurator, true, CAPAB_ENROLLEE),
            RoleSelection::Selected { configurator: true }
        );
        assert_eq!(
            select_initiator_role(Configurator, true, CAPAB_CONFIGURATOR),
            RoleSelection::NotCompatible
        );
        assert_eq!(
            select_initiator_role(Enrollee, false, CAPAB_ROLE_MASK),
            RoleSelection::NotCompatible
        );
    }

    #[test]
    fn test_role_policy_parse() {
        assert_eq!("either".parse::<AllowedRoles>().unwrap(), AllowedRoles::Either);
        assert!("both".parse::<AllowedRoles>().is_err());
        assert_eq!(AllowedRoles::Either.capab_bits(), 0x03);
    }
}
