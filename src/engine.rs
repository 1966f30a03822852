// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DPP engine: registries plus session creation
//!
//! The engine owns the bootstrapping and Configurator registries and hands
//! them to the sessions it creates. Nothing is process-global; two engines
//! in one process never see each other's keys.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::{auth_req_rx, Action, AuthSession, InitiatorParams, SessionOptions};
use crate::bootstrap::{BootstrapGenParams, BootstrapInfo, BootstrapRegistry};
use crate::config::DppConfig;
use crate::configuration::{Configurator, ConfiguratorParams, ConfiguratorRegistry, NetRole};
use crate::crypto::EcPrivateKey;
use crate::error::{DppError, Result};
use crate::protocol::OutgoingFrame;

/// Entry point for bootstrapping, Configurator management and new sessions
#[derive(Debug)]
pub struct DppEngine {
    config: DppConfig,
    bootstrap: BootstrapRegistry,
    configurators: ConfiguratorRegistry,
    /// Parameters used when the peer record carries none
    default_params: Option<ConfiguratorParams>,
}

impl DppEngine {
    /// Create an engine with empty registries
    pub fn new(config: DppConfig) -> Result<Self> {
        let bootstrap = BootstrapRegistry::new(config.protocol_version);
        Self::with_registries(config, bootstrap, ConfiguratorRegistry::new())
    }

    /// Create an engine around existing registries
    pub fn with_registries(
        config: DppConfig,
        bootstrap: BootstrapRegistry,
        configurators: ConfiguratorRegistry,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            "DPP: Engine ready version={} roles={} curve={} pending_timeout={}s",
            config.protocol_version,
            config.allowed_roles,
            config.default_curve,
            config.response_pending_timeout_secs
        );
        Ok(Self {
            config,
            bootstrap,
            configurators,
            default_params: None,
        })
    }

    pub fn config(&self) -> &DppConfig {
        &self.config
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::from(&self.config)
    }

    pub fn bootstrap(&self) -> &BootstrapRegistry {
        &self.bootstrap
    }

    pub fn bootstrap_mut(&mut self) -> &mut BootstrapRegistry {
        &mut self.bootstrap
    }

    pub fn configurators(&self) -> &ConfiguratorRegistry {
        &self.configurators
    }

    pub fn configurators_mut(&mut self) -> &mut ConfiguratorRegistry {
        &mut self.configurators
    }

    /// Generate an own bootstrapping key; the curve defaults to `default_curve`
    pub fn bootstrap_gen(&mut self, params: &BootstrapGenParams) -> Result<u32> {
        let mut params = params.clone();
        if params.curve.is_none() {
            params.curve = Some(self.config.default_curve.clone());
        }
        self.bootstrap.bootstrap_gen(&params)
    }

    /// Register a peer URI scanned from a QR code
    pub fn add_qr_code(&mut self, uri: &str) -> Result<Arc<BootstrapInfo>> {
        self.bootstrap.add_qr_code(uri)
    }

    pub fn configurator_add(
        &mut self,
        curve: Option<&str>,
        key: Option<&str>,
        pp_key: Option<&str>,
    ) -> Result<u32> {
        let curve = curve.or(Some(self.config.default_curve.as_str()));
        self.configurators.configurator_add(curve, key, pp_key)
    }

    /// Self-issued Connector for Configurator `id`
    pub fn own_config(
        &self,
        id: u32,
        curve: Option<&str>,
        netrole: NetRole,
        group_id: &str,
        expiry: Option<i64>,
    ) -> Result<(String, EcPrivateKey)> {
        self.configurators
            .require(id)?
            .own_config(curve, netrole, group_id, expiry)
    }

    /// Parameters used for peers without their own `configurator_params`
    pub fn set_default_configurator_params(&mut self, params: ConfiguratorParams) -> Result<()> {
        params.validate()?;
        self.configurators.require(params.configurator_id)?;
        self.default_params = Some(params);
        Ok(())
    }

    /// Start an exchange as Initiator towards peer record `peer_id`
    ///
    /// # Arguments
    ///
    /// * `peer_id` - Registry id of the Responder's bootstrapping key
    /// * `own_id` - Own bootstrapping key id, for mutual authentication
    /// * `params` - Negotiation channel and local channel list
    ///
    /// # Returns
    ///
    /// The session and the Authentication Request to transmit
    pub fn auth_init(
        &self,
        peer_id: u32,
        own_id: Option<u32>,
        params: &InitiatorParams<'_>,
    ) -> Result<(AuthSession, OutgoingFrame)> {
        let peer_bi = self.bootstrap.require(peer_id)?;
        if peer_bi.own {
            return Err(DppError::Config(format!(
                "Bootstrapping info {} is an own key, not a peer",
                peer_id
            )));
        }
        let own_bi = own_id.map(|id| self.bootstrap.require(id)).transpose()?;

        let (mut session, frame) =
            AuthSession::auth_init(&self.session_options(), Arc::clone(&peer_bi), own_bi, params)?;
        if session.is_configurator() {
            self.attach_configurator(&mut session, &peer_bi)?;
        }
        Ok((session, frame))
    }

    /// Process an Authentication Request addressed to one of our keys
    ///
    /// # Returns
    ///
    /// A Responder session and its first action; requests for unknown keys
    /// are errors and leave no session behind
    pub fn auth_req_rx(&self, hdr: &[u8], attrs: &[u8]) -> Result<(AuthSession, Action)> {
        let (mut session, action) =
            auth_req_rx(&self.bootstrap, &self.session_options(), hdr, attrs)?;
        if session.is_configurator() {
            let peer_bi = session.peer_bootstrap().cloned();
            match peer_bi {
                Some(bi) => self.attach_configurator(&mut session, &bi)?,
                None => self.attach_default_configurator(&mut session)?,
            }
        }
        Ok((session, action))
    }

    /// Presence Announcement received: the known peer that sent it, if any
    pub fn presence_announcement_rx(&self, attrs: &[u8]) -> Result<Option<Arc<BootstrapInfo>>> {
        self.bootstrap.presence_announcement_rx(attrs)
    }

    fn attach_configurator(&self, session: &mut AuthSession, peer_bi: &BootstrapInfo) -> Result<()> {
        match &peer_bi.configurator_params {
            Some(text) => {
                debug!("DPP: Using configurator params of peer id={}", peer_bi.id);
                let params = ConfiguratorParams::from_toml(text)?;
                let configurator = self.configurators.require(params.configurator_id)?;
                session.set_configurator(configurator, params);
                Ok(())
            }
            None => self.attach_default_configurator(session),
        }
    }

    fn attach_default_configurator(&self, session: &mut AuthSession) -> Result<()> {
        match &self.default_params {
            Some(params) => {
                let configurator = self.configurators.require(params.configurator_id)?;
                session.set_configurator(configurator, params.clone());
            }
            None => warn!("DPP: No configurator parameters - Configuration Requests will fail"),
        }
        Ok(())
    }

    /// Configurator registered under `id`
    pub fn configurator(&self, id: u32) -> Result<Arc<Configurator>> {
        self.configurators.require(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{Akm, DppConfiguration};

    #[test]
    fn test_engines_do_not_share_registries() {
        let mut a = DppEngine::new(DppConfig::default()).unwrap();
        let b = DppEngine::new(DppConfig::default()).unwrap();
        a.bootstrap_gen(&BootstrapGenParams::default()).unwrap();
        a.configurator_add(None, None, None).unwrap();
        assert_eq!(a.bootstrap().len(), 1);
        assert!(b.bootstrap().is_empty());
        assert!(b.configurators().is_empty());
    }

    #[test]
    fn test_default_params_need_known_configurator() {
        let mut engine = DppEngine::new(DppConfig::default()).unwrap();
        let params = ConfiguratorParams::new(1).with_config(
            DppConfiguration::new(NetRole::Sta, Akm::Dpp, "home"),
        );
        assert!(matches!(
            engine.set_default_configurator_params(params.clone()),
            Err(DppError::NotFound { .. })
        ));
        engine.configurator_add(None, None, None).unwrap();
        engine.set_default_configurator_params(params).unwrap();
    }

    #[test]
    fn test_auth_init_rejects_own_record_as_peer() {
        let mut engine = DppEngine::new(DppConfig::default()).unwrap();
        let own = engine.bootstrap_gen(&BootstrapGenParams::default()).unwrap();
        assert!(engine.auth_init(own, None, &InitiatorParams::default()).is_err());
        assert!(matches!(
            engine.auth_init(99, None, &InitiatorParams::default()),
            Err(DppError::NotFound { .. })
        ));
    }
}
