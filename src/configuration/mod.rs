// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DPP Configuration exchange
//!
//! Runs over an authenticated [`AuthSession`](crate::auth::AuthSession):
//!
//! - **AKM**: Closed set of credential types with name/selector tables
//! - **Params**: Configurator-side slots (`DppConfiguration`) per net role
//! - **Connector**: Signing and verification of Connectors
//! - **Configurator**: C-sign keys and the Configurator registry
//! - **Request**: Enrollee Configuration Request (GAS)
//! - **Response**: Configurator processing and configuration objects
//! - **Enrollee**: Configuration Response parsing and received objects
//! - **Result**: Configuration Result and Connection Status Result frames
//! - **Intro**: Network introduction from two Connectors (PMK, PMKID)

pub mod akm;
pub mod configurator;
pub mod connector;
pub mod enrollee;
pub mod intro;
pub mod params;
pub mod request;
pub mod response;
pub mod result;

use std::sync::Arc;

use zeroize::Zeroizing;

pub use akm::Akm;
pub use configurator::{Configurator, ConfiguratorRegistry};
pub use connector::{
    format_expiry, key_expired, parse_own_connector, sign_connector, verify_connector,
    ConnectorGroup, ConnectorHeader, ConnectorPayload, VerifiedConnector, CONNECTOR_TYP,
};
pub use enrollee::{ConfigObject, ConfigResponseOutcome, MAX_CONF_OBJ};
pub use intro::{peer_intro, Introduction};
pub use params::{ConfiguratorParams, DppConfiguration, NetRole, SSID_MAX_LEN};
pub use request::{ConfigAttributes, ConfigRequestParams};
pub use response::ConfigRequestOutcome;
pub use result::ConnStatusResult;

use crate::protocol::DppStatus;

/// Configuration-phase state carried by a session
#[derive(Default)]
pub(crate) struct ConfigExchange {
    /// E-nonce chosen by the Enrollee (and echoed by the Configurator)
    pub e_nonce: Vec<u8>,
    /// Signing Configurator and its provisioning slots
    pub configurator: Option<Arc<Configurator>>,
    pub params: Option<ConfiguratorParams>,
    /// Net role the Enrollee asked for
    pub netrole: Option<NetRole>,
    /// GAS dialog token of the request being answered
    pub dialog_token: u8,
    /// CSR received from the Enrollee while the certificate is fetched
    pub pending_csr: Option<Zeroizing<Vec<u8>>>,
    pub waiting_cert: bool,
    pub waiting_csr: bool,
    /// CSR attributes sent by the Configurator with CSR_NEEDED
    pub csrattrs: Option<Vec<u8>>,
    pub conf_resp_status: Option<DppStatus>,
    /// Configurator asked for a Connection Status Result
    pub send_conn_status: bool,
    /// Enrollee was asked for a Connection Status Result
    pub conn_status_requested: bool,
    pub waiting_conf_result: bool,
    pub waiting_conn_status_result: bool,
    pub conf_result: Option<DppStatus>,
    pub conn_status: Option<ConnStatusResult>,
    pub objects: Vec<ConfigObject>,
}
