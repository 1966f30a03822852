// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Network introduction between two provisioned devices
//!
//! Each side presents its Connector; when both were signed by the same
//! C-sign key and their groups pair up, ECDH over the two netAccessKeys
//! yields the PMK and PMKID used by the link layer.

use std::fmt;

use tracing::{debug, info};
use zeroize::Zeroizing;

use super::connector::{parse_own_connector, verify_connector};
use crate::crypto::{derive_pmk, derive_pmkid, ecdh, EcPrivateKey, EcPublicKey};
use crate::error::{DppError, Result};

/// Keys agreed by a successful introduction
pub struct Introduction {
    pub pmk: Zeroizing<Vec<u8>>,
    pub pmkid: [u8; 16],
    /// Connector version advertised by the peer, when present
    pub peer_version: Option<u8>,
    /// Expiry of the peer's netAccessKey
    pub expiry: Option<String>,
}

impl fmt::Debug for Introduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Introduction")
            .field("pmkid", &hex::encode(self.pmkid))
            .field("peer_version", &self.peer_version)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

/// Run network introduction against a peer Connector
///
/// # Arguments
///
/// * `own_connector` - Own signed Connector
/// * `net_access_key` - Private key matching the own Connector's netAccessKey
/// * `csign` - C-sign public key both Connectors must be signed with
/// * `peer_connector` - Connector received from the peer
///
/// # Returns
///
/// PMK and PMKID, or `ConnectorInvalid` / `NoMatch`
///
/// # Example
///
/// ```ignore
/// let intro = peer_intro(&obj.connector, &obj.net_access_key, &obj.c_sign_key, &peer)?;
/// install_pmk(&intro.pmk, intro.pmkid);
/// ```
pub fn peer_intro(
    own_connector: &str,
    net_access_key: &EcPrivateKey,
    csign: &EcPublicKey,
    peer_connector: &str,
) -> Result<Introduction> {
    // 1. Own claims, taken as-is
    let own = parse_own_connector(own_connector)?;

    // 2. Peer Connector must verify under the shared C-sign key
    let peer = verify_connector(csign, peer_connector)?.payload;

    // 3. Groups and roles
    if !own.matches_groups(&peer) {
        debug!("DPP: Peer connector does not include compatible group netrole with own connector");
        return Err(DppError::NoMatch);
    }

    // 4. Peer netAccessKey on our curve
    let peer_key = peer.net_access_key()?;
    let curve = net_access_key.curve();
    if peer_key.curve().id != curve.id {
        return Err(DppError::ConnectorInvalid(format!(
            "peer netAccessKey uses {} instead of {}",
            peer_key.curve().name,
            curve.name
        )));
    }

    // 5. N = nk * PK, PMK and PMKID
    let nx = ecdh(net_access_key, &peer_key)?;
    let pmk = derive_pmk(curve, &nx)?;
    let pmkid = derive_pmkid(&net_access_key.public_key().x(), &peer_key.x());

    info!("DPP: Network introduction completed, PMKID {}", hex::encode(pmkid));
    Ok(Introduction {
        pmk,
        pmkid,
        peer_version: peer.version,
        expiry: peer.expiry,
    })
}
