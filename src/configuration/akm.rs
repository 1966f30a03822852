// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Authentication and key management suites carried in `cred.akm`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DppError, Result};

const SEL_DPP: &str = "506F9A02";
const SEL_PSK: &str = "000FAC02";
const SEL_PSK_SHA256: &str = "000FAC06";
const SEL_SAE: &str = "000FAC08";
const SEL_DOT1X: &str = "000FAC01";
const SEL_DOT1X_SHA256: &str = "000FAC05";

/// Credential type of a configuration object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Akm {
    Psk,
    Sae,
    PskSae,
    Dpp,
    SaeDpp,
    PskSaeDpp,
    Dot1x,
}

impl Akm {
    pub const ALL: [Akm; 7] = [
        Akm::Psk,
        Akm::Sae,
        Akm::PskSae,
        Akm::Dpp,
        Akm::SaeDpp,
        Akm::PskSaeDpp,
        Akm::Dot1x,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Akm::Psk => "psk",
            Akm::Sae => "sae",
            Akm::PskSae => "psk+sae",
            Akm::Dpp => "dpp",
            Akm::SaeDpp => "dpp+sae",
            Akm::PskSaeDpp => "dpp+psk+sae",
            Akm::Dot1x => "dot1x",
        }
    }

    /// AKM suite selector list, `+` separated
    pub fn selector(self) -> &'static str {
        match self {
            Akm::Dpp => "506F9A02",
            Akm::Psk => "000FAC02+000FAC06",
            Akm::Sae => "000FAC08",
            Akm::PskSae => "000FAC02+000FAC06+000FAC08",
            Akm::SaeDpp => "506F9A02+000FAC08",
            Akm::PskSaeDpp => "506F9A02+000FAC08+000FAC02+000FAC06",
            Akm::Dot1x => "000FAC01+000FAC05",
        }
    }

    /// Parse either a name (`psk+sae`) or a suite selector list
    ///
    /// Selector lists are matched case-insensitively; unknown selectors are
    /// skipped and the result is the combination of the known ones.
    pub fn parse(value: &str) -> Result<Self> {
        if let Some(akm) = Self::ALL.iter().copied().find(|a| a.as_str() == value) {
            return Ok(akm);
        }
        Self::from_selectors(value).ok_or_else(|| DppError::UnknownAkm(value.to_string()))
    }

    fn from_selectors(value: &str) -> Option<Self> {
        let (mut dpp, mut psk, mut sae, mut dot1x) = (false, false, false, false);
        for sel in value.split('+') {
            if sel.len() != 8 {
                break;
            }
            match sel.to_ascii_uppercase().as_str() {
                SEL_DPP => dpp = true,
                SEL_PSK | SEL_PSK_SHA256 => psk = true,
                SEL_SAE => sae = true,
                SEL_DOT1X | SEL_DOT1X_SHA256 => dot1x = true,
                _ => {}
            }
        }

        match (dpp, psk, sae, dot1x) {
            (true, true, true, _) => Some(Akm::PskSaeDpp),
            (true, _, true, _) => Some(Akm::SaeDpp),
            (true, _, _, _) => Some(Akm::Dpp),
            (false, true, true, _) => Some(Akm::PskSae),
            (false, false, true, _) => Some(Akm::Sae),
            (false, true, false, _) => Some(Akm::Psk),
            (false, false, false, true) => Some(Akm::Dot1x),
            _ => None,
        }
    }

    pub fn is_psk(self) -> bool {
        matches!(self, Akm::Psk | Akm::PskSae | Akm::PskSaeDpp)
    }

    pub fn is_sae(self) -> bool {
        matches!(self, Akm::Sae | Akm::PskSae | Akm::SaeDpp | Akm::PskSaeDpp)
    }

    /// Pure passphrase/PSK credential with no Connector
    pub fn is_legacy(self) -> bool {
        matches!(self, Akm::Psk | Akm::Sae | Akm::PskSae)
    }

    pub fn is_dpp(self) -> bool {
        matches!(self, Akm::Dpp | Akm::SaeDpp | Akm::PskSaeDpp)
    }

    /// DPP combined with a legacy AKM, only understood by R2+ peers
    pub fn is_ver2(self) -> bool {
        matches!(self, Akm::SaeDpp | Akm::PskSaeDpp)
    }

    /// AKM to hand to a peer of the given version
    pub fn for_peer_version(self, peer_version: u8) -> Self {
        if self.is_ver2() && peer_version < 2 {
            Akm::Dpp
        } else {
            self
        }
    }
}

impl fmt::Display for Akm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Akm {
    type Err = DppError;

    fn from_str(s: &str) -> Result<Self> {
        Akm::parse(s)
    }
}

impl TryFrom<String> for Akm {
    type Error = DppError;

    fn try_from(value: String) -> Result<Self> {
        Akm::parse(&value)
    }
}

impl From<Akm> for String {
    fn from(akm: Akm) -> Self {
        akm.as_str().to_string()
    }
}
