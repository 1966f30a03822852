// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configurator signing keys and their registry

use std::fmt;
use std::sync::Arc;

use tracing::info;
use zeroize::Zeroizing;

use super::connector::{format_expiry, sign_connector, ConnectorPayload};
use super::params::NetRole;
use crate::crypto::{key_id, key_id_hash, CurveParams, EcPrivateKey, EcPublicKey};
use crate::error::{DppError, Result};

/// A Configurator: C-sign key, privacy protection key and key identifier
pub struct Configurator {
    pub id: u32,
    pub curve: &'static CurveParams,
    csign: EcPrivateKey,
    pp_key: EcPrivateKey,
    /// base64url(SHA-256(uncompressed C-sign public key))
    pub kid: String,
    pub kid_hash: [u8; 32],
}

impl fmt::Debug for Configurator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configurator")
            .field("id", &self.id)
            .field("curve", &self.curve.name)
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl Configurator {
    /// Generate or import a Configurator
    ///
    /// # Arguments
    ///
    /// * `curve` - Curve name (`prime256v1`, `P-256`, ...); `None` selects the default
    /// * `key` - Optional hex C-sign private key
    /// * `pp_key` - Optional hex privacy protection private key
    pub fn new(curve: Option<&str>, key: Option<&str>, pp_key: Option<&str>) -> Result<Self> {
        let curve = match curve {
            Some(name) => CurveParams::by_name(name)
                .ok_or_else(|| DppError::UnsupportedCurve(name.to_string()))?,
            None => CurveParams::default_curve(),
        };

        let csign = match key {
            Some(hex_key) => EcPrivateKey::from_hex(curve, hex_key)?,
            None => EcPrivateKey::generate(curve)?,
        };
        let pp_key = match pp_key {
            Some(hex_key) => EcPrivateKey::from_hex(curve, hex_key)?,
            None => EcPrivateKey::generate(curve)?,
        };

        let public = csign.public_key();
        Ok(Self {
            id: 0,
            curve,
            kid: key_id(&public),
            kid_hash: key_id_hash(&public),
            csign,
            pp_key,
        })
    }

    pub fn csign(&self) -> &EcPrivateKey {
        &self.csign
    }

    pub fn csign_public(&self) -> EcPublicKey {
        self.csign.public_key()
    }

    pub fn pp_key_public(&self) -> EcPublicKey {
        self.pp_key.public_key()
    }

    /// C-sign private key as hex
    pub fn get_key(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&*self.csign.to_bytes()))
    }

    /// Sign a Connector for `net_access_key`
    pub fn sign(&self, payload: &ConnectorPayload) -> Result<String> {
        sign_connector(&self.csign, payload)
    }

    /// Build a Connector for the Configurator's own network access
    ///
    /// # Returns
    ///
    /// The signed Connector and the freshly generated netAccessKey
    pub fn own_config(
        &self,
        curve: Option<&str>,
        netrole: NetRole,
        group_id: &str,
        expiry: Option<i64>,
    ) -> Result<(String, EcPrivateKey)> {
        let curve = match curve {
            Some(name) => CurveParams::by_name(name)
                .ok_or_else(|| DppError::UnsupportedCurve(name.to_string()))?,
            None => self.curve,
        };
        info!(
            "DPP: Building own configuration/connector with curve {}",
            curve.name
        );

        let net_access_key = EcPrivateKey::generate(curve)?;
        let mut payload =
            ConnectorPayload::new(group_id, netrole.as_str(), &net_access_key.public_key());
        payload.expiry = expiry.and_then(format_expiry);
        let connector = self.sign(&payload)?;
        Ok((connector, net_access_key))
    }
}

/// Configurators known to the engine, keyed by id
#[derive(Debug, Default)]
pub struct ConfiguratorRegistry {
    entries: Vec<Arc<Configurator>>,
}

impl ConfiguratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u32 {
        self.entries.iter().map(|c| c.id).max().unwrap_or(0) + 1
    }

    /// Register a Configurator and return its id
    pub fn add(&mut self, mut conf: Configurator) -> u32 {
        conf.id = self.next_id();
        let id = conf.id;
        info!("DPP: Added configurator id={} kid={}", id, conf.kid);
        self.entries.push(Arc::new(conf));
        id
    }

    /// `configurator_add`: generate or import, then register
    pub fn configurator_add(
        &mut self,
        curve: Option<&str>,
        key: Option<&str>,
        pp_key: Option<&str>,
    ) -> Result<u32> {
        let conf = Configurator::new(curve, key, pp_key)?;
        Ok(self.add(conf))
    }

    pub fn get(&self, id: u32) -> Option<Arc<Configurator>> {
        self.entries.iter().find(|c| c.id == id).cloned()
    }

    pub fn require(&self, id: u32) -> Result<Arc<Configurator>> {
        self.get(id).ok_or(DppError::NotFound {
            kind: "configurator",
            id,
        })
    }

    /// Remove one Configurator by id, or all with "*"
    pub fn remove(&mut self, id: &str) -> Result<()> {
        if id == "*" {
            self.entries.clear();
            return Ok(());
        }
        let id: u32 = id
            .parse()
            .ok()
            .filter(|id| *id != 0)
            .ok_or_else(|| DppError::Config(format!("Invalid configurator id '{}'", id)))?;
        let before = self.entries.len();
        self.entries.retain(|c| c.id != id);
        if self.entries.len() == before {
            return Err(DppError::NotFound {
                kind: "configurator",
                id,
            });
        }
        Ok(())
    }

    /// Hex C-sign private key of Configurator `id`
    pub fn get_key(&self, id: u32) -> Result<Zeroizing<String>> {
        Ok(self.require(id)?.get_key())
    }

    /// Configurator whose kid hash equals `kid_hash`
    pub fn find_kid(&self, kid_hash: &[u8]) -> Option<Arc<Configurator>> {
        self.entries
            .iter()
            .find(|c| c.kid_hash.as_slice() == kid_hash)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::connector::verify_connector;

    #[test]
    fn test_add_assigns_increasing_ids() {
        let mut reg = ConfiguratorRegistry::new();
        let a = reg.configurator_add(None, None, None).unwrap();
        let b = reg.configurator_add(Some("P-256"), None, None).unwrap();
        assert_eq!((a, b), (1, 2));
        reg.remove("1").unwrap();
        assert_eq!(reg.configurator_add(None, None, None).unwrap(), 3);
    }

    #[test]
    fn test_remove_semantics() {
        let mut reg = ConfiguratorRegistry::new();
        reg.configurator_add(None, None, None).unwrap();
        assert!(matches!(reg.remove("9"), Err(DppError::NotFound { .. })));
        assert!(matches!(reg.remove("0"), Err(DppError::Config(_))));
        assert!(matches!(reg.remove("x"), Err(DppError::Config(_))));
        reg.remove("*").unwrap();
        assert!(reg.is_empty());
        reg.remove("*").unwrap();
    }

    #[test]
    fn test_key_import_round_trip() {
        let mut reg = ConfiguratorRegistry::new();
        let id = reg.configurator_add(Some("prime256v1"), None, None).unwrap();
        let key = reg.get_key(id).unwrap();
        assert_eq!(key.len(), 64);

        let imported = Configurator::new(Some("prime256v1"), Some(&key), None).unwrap();
        assert_eq!(imported.kid, reg.get(id).unwrap().kid);
    }

    #[test]
    fn test_find_kid() {
        let mut reg = ConfiguratorRegistry::new();
        let id = reg.configurator_add(None, None, None).unwrap();
        let conf = reg.get(id).unwrap();
        assert_eq!(reg.find_kid(&conf.kid_hash).unwrap().id, id);
        assert!(reg.find_kid(&[0u8; 32]).is_none());
    }

    #[test]
    fn test_unsupported_curve() {
        assert!(matches!(
            Configurator::new(Some("brainpoolP256r1"), None, None),
            Err(DppError::UnsupportedCurve(_))
        ));
        assert!(matches!(
            Configurator::new(Some("nonsense"), None, None),
            Err(DppError::UnsupportedCurve(_))
        ));
    }

    #[test]
    fn test_own_config_is_verifiable() {
        let conf = Configurator::new(None, None, None).unwrap();
        let (connector, nak) = conf.own_config(None, NetRole::Ap, "*", None).unwrap();
        let verified = verify_connector(&conf.csign_public(), &connector).unwrap();
        assert_eq!(verified.payload.groups[0].net_role, "ap");
        assert_eq!(verified.payload.net_access_key().unwrap(), nak.public_key());
    }
}
