// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the DPP engine

use crate::protocol::ProtocolVersion;

/// Full build tag
pub const VERSION: &str = "v0.1.0-dpp-r3-2025-10-19";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2025-10-19";

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!(
        "DPP Engine {} ({}, {}, protocol v{})",
        VERSION_NUMBER,
        VERSION,
        BUILD_DATE,
        ProtocolVersion::LATEST
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string() {
        let version = get_version_string();
        assert!(version.contains(VERSION_NUMBER));
        assert!(version.contains(VERSION));
        assert!(version.contains("protocol v3"));
    }
}
