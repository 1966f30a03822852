// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DPP attribute TLV codec
//!
//! Attributes are `u16 id (LE) | u16 length (LE) | value`, repeated.
//! Wrapped Data must be the last attribute of any buffer it appears in.
//!
//! - [`AttrReader`] walks a buffer and yields each attribute, failing on
//!   truncation, trailing octets or anything after Wrapped Data
//! - [`Attributes`] is a validated view with lookup helpers
//! - [`AttrWriter`] builds attribute buffers

use std::fmt;

use super::cursor::ByteReader;
use super::status::DppStatus;
use crate::error::{DppError, Result};

/// Size of the id + length header preceding every value
pub const ATTR_HEADER_LEN: usize = 4;

/// DPP attribute identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrId(pub u16);

impl AttrId {
    pub const STATUS: Self = Self(0x1000);
    pub const I_BOOTSTRAP_KEY_HASH: Self = Self(0x1001);
    pub const R_BOOTSTRAP_KEY_HASH: Self = Self(0x1002);
    pub const I_PROTOCOL_KEY: Self = Self(0x1003);
    pub const WRAPPED_DATA: Self = Self(0x1004);
    pub const I_NONCE: Self = Self(0x1005);
    pub const I_CAPABILITIES: Self = Self(0x1006);
    pub const R_NONCE: Self = Self(0x1007);
    pub const R_CAPABILITIES: Self = Self(0x1008);
    pub const R_PROTOCOL_KEY: Self = Self(0x1009);
    pub const I_AUTH_TAG: Self = Self(0x100a);
    pub const R_AUTH_TAG: Self = Self(0x100b);
    pub const CONFIG_OBJ: Self = Self(0x100c);
    pub const CONNECTOR: Self = Self(0x100d);
    pub const CONFIG_ATTR_OBJ: Self = Self(0x100e);
    pub const BOOTSTRAP_KEY: Self = Self(0x100f);
    pub const OWN_NET_NK_HASH: Self = Self(0x1011);
    pub const FINITE_CYCLIC_GROUP: Self = Self(0x1012);
    pub const ENCRYPTED_KEY: Self = Self(0x1013);
    pub const ENROLLEE_NONCE: Self = Self(0x1014);
    pub const CODE_IDENTIFIER: Self = Self(0x1015);
    pub const TRANSACTION_ID: Self = Self(0x1016);
    pub const BOOTSTRAP_INFO: Self = Self(0x1017);
    pub const CHANNEL: Self = Self(0x1018);
    pub const PROTOCOL_VERSION: Self = Self(0x1019);
    pub const ENVELOPED_DATA: Self = Self(0x101a);
    pub const SEND_CONN_STATUS: Self = Self(0x101b);
    pub const CONN_STATUS: Self = Self(0x101c);
    pub const RECONFIG_FLAGS: Self = Self(0x101d);
    pub const C_SIGN_KEY_HASH: Self = Self(0x101e);
    pub const CSR_ATTR_REQ: Self = Self(0x101f);
    pub const A_NONCE: Self = Self(0x1020);
    pub const E_PRIME_ID: Self = Self(0x1021);
    pub const C_NONCE: Self = Self(0x1022);

    /// Human-readable attribute name used in failure reasons
    pub fn name(self) -> &'static str {
        match self {
            Self::STATUS => "DPP Status",
            Self::I_BOOTSTRAP_KEY_HASH => "Initiator Bootstrapping Key Hash",
            Self::R_BOOTSTRAP_KEY_HASH => "Responder Bootstrapping Key Hash",
            Self::I_PROTOCOL_KEY => "Initiator Protocol Key",
            Self::WRAPPED_DATA => "Wrapped Data",
            Self::I_NONCE => "I-nonce",
            Self::I_CAPABILITIES => "I-capabilities",
            Self::R_NONCE => "R-nonce",
            Self::R_CAPABILITIES => "R-capabilities",
            Self::R_PROTOCOL_KEY => "Responder Protocol Key",
            Self::I_AUTH_TAG => "Initiator Authenticating Tag",
            Self::R_AUTH_TAG => "Responder Authenticating Tag",
            Self::CONFIG_OBJ => "Configuration Object",
            Self::CONNECTOR => "Connector",
            Self::CONFIG_ATTR_OBJ => "Config Attributes",
            Self::BOOTSTRAP_KEY => "Bootstrapping Key",
            Self::OWN_NET_NK_HASH => "Own Network NK Hash",
            Self::FINITE_CYCLIC_GROUP => "Finite Cyclic Group",
            Self::ENCRYPTED_KEY => "Encrypted Key",
            Self::ENROLLEE_NONCE => "Enrollee Nonce",
            Self::CODE_IDENTIFIER => "Code Identifier",
            Self::TRANSACTION_ID => "Transaction ID",
            Self::BOOTSTRAP_INFO => "Bootstrapping Info",
            Self::CHANNEL => "Channel",
            Self::PROTOCOL_VERSION => "Protocol Version",
            Self::ENVELOPED_DATA => "Enveloped Data",
            Self::SEND_CONN_STATUS => "Send Connection Status",
            Self::CONN_STATUS => "Connection Status",
            Self::RECONFIG_FLAGS => "Reconfiguration Flags",
            Self::C_SIGN_KEY_HASH => "C-sign-key Hash",
            Self::CSR_ATTR_REQ => "CSR Attributes Request",
            Self::A_NONCE => "A-NONCE",
            Self::E_PRIME_ID => "E'-id",
            Self::C_NONCE => "C-nonce",
            _ => "Unknown",
        }
    }
}

impl fmt::Debug for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04x})", self.name(), self.0)
    }
}

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One attribute borrowed from a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub id: AttrId,
    pub value: &'a [u8],
    /// Offset of the attribute header within the scanned buffer
    pub offset: usize,
}

/// Iterator over the attributes of a buffer with full validation
pub struct AttrReader<'a> {
    reader: ByteReader<'a>,
    seen_wrapped: bool,
    failed: bool,
}

impl<'a> AttrReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(buf),
            seen_wrapped: false,
            failed: false,
        }
    }

    fn next_attr(&mut self) -> Result<Attribute<'a>> {
        let remaining = self.reader.remaining();
        if remaining < ATTR_HEADER_LEN {
            return Err(DppError::MalformedFrame(format!(
                "Unexpected octets ({}) after the last attribute",
                remaining
            )));
        }

        let offset = self.reader.position();
        let id = AttrId(self.reader.read_le16()?);
        let len = self.reader.read_le16()? as usize;
        let value = self.reader.read_bytes(len).map_err(|_| {
            DppError::MalformedFrame(
                "Truncated message - not enough room for the attribute".to_string(),
            )
        })?;

        if self.seen_wrapped {
            return Err(DppError::MalformedFrame(
                "An unexpected attribute included after the Wrapped Data attribute".to_string(),
            ));
        }
        if id == AttrId::WRAPPED_DATA {
            self.seen_wrapped = true;
        }

        Ok(Attribute { id, value, offset })
    }
}

impl<'a> Iterator for AttrReader<'a> {
    type Item = Result<Attribute<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.is_empty() {
            return None;
        }
        let item = self.next_attr();
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

/// Validate a full attribute buffer
pub fn scan(buf: &[u8]) -> Result<()> {
    AttrReader::new(buf).try_for_each(|attr| attr.map(|_| ()))
}

/// First attribute with `id`, without validating the rest of the buffer
///
/// The walk stops at the first attribute whose length overruns the buffer.
pub fn find(buf: &[u8], id: AttrId) -> Option<&[u8]> {
    find_from(buf, 0, id).map(|attr| attr.value)
}

/// Next attribute with `id` after `prev`
pub fn find_next<'a>(buf: &'a [u8], prev: &Attribute<'a>, id: AttrId) -> Option<Attribute<'a>> {
    find_from(buf, prev.offset + ATTR_HEADER_LEN + prev.value.len(), id)
}

/// First attribute with `id` starting the walk at `start`
pub fn find_from(buf: &[u8], start: usize, id: AttrId) -> Option<Attribute<'_>> {
    let mut reader = ByteReader::new(buf.get(start..)?);
    while reader.remaining() >= ATTR_HEADER_LEN {
        let offset = start + reader.position();
        let attr_id = AttrId(reader.read_le16().ok()?);
        let len = reader.read_le16().ok()? as usize;
        let value = reader.read_bytes(len).ok()?;
        if attr_id == id {
            return Some(Attribute {
                id: attr_id,
                value,
                offset,
            });
        }
    }
    None
}

/// Encode one attribute
pub fn encode(id: AttrId, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ATTR_HEADER_LEN + value.len());
    out.extend_from_slice(&id.0.to_le_bytes());
    out.extend_from_slice(&(value.len() as u16).to_le_bytes());
    out.extend_from_slice(value);
    out
}

/// Validated attribute buffer with lookup helpers
#[derive(Debug, Clone)]
pub struct Attributes<'a> {
    buf: &'a [u8],
    items: Vec<Attribute<'a>>,
}

impl<'a> Attributes<'a> {
    /// Scan `buf` and index its attributes
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let items = AttrReader::new(buf).collect::<Result<Vec<_>>>()?;
        Ok(Self { buf, items })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute<'a>> {
        self.items.iter()
    }

    pub fn get(&self, id: AttrId) -> Option<&'a [u8]> {
        self.items.iter().find(|a| a.id == id).map(|a| a.value)
    }

    pub fn get_all(&self, id: AttrId) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.items.iter().filter(move |a| a.id == id).map(|a| a.value)
    }

    pub fn contains(&self, id: AttrId) -> bool {
        self.get(id).is_some()
    }

    /// Attribute that must be present with any length
    pub fn require(&self, id: AttrId) -> Result<&'a [u8]> {
        self.get(id).ok_or(DppError::MissingAttribute(id))
    }

    /// Attribute that must be present with exactly `len` octets
    pub fn require_len(&self, id: AttrId, len: usize) -> Result<&'a [u8]> {
        match self.get(id) {
            Some(value) if value.len() == len => Ok(value),
            _ => Err(DppError::MissingAttribute(id)),
        }
    }

    /// Attribute that must be present with at least `min` octets
    pub fn require_min(&self, id: AttrId, min: usize) -> Result<&'a [u8]> {
        match self.get(id) {
            Some(value) if value.len() >= min => Ok(value),
            _ => Err(DppError::MissingAttribute(id)),
        }
    }

    /// Optional attribute; if present it must have exactly `len` octets
    pub fn optional_len(&self, id: AttrId, len: usize) -> Result<Option<&'a [u8]>> {
        match self.get(id) {
            Some(value) if value.len() != len => Err(DppError::invalid(
                id,
                format!("Invalid {} attribute", id.name()),
            )),
            other => Ok(other),
        }
    }

    pub fn status(&self) -> Result<DppStatus> {
        let value = self.require_min(AttrId::STATUS, 1)?;
        DppStatus::try_from(value[0])
    }

    /// The Wrapped Data value, if any
    pub fn wrapped(&self) -> Option<&'a [u8]> {
        self.items
            .last()
            .filter(|a| a.id == AttrId::WRAPPED_DATA)
            .map(|a| a.value)
    }

    /// The octets preceding Wrapped Data (the whole buffer when absent)
    pub fn before_wrapped(&self) -> &'a [u8] {
        match self.items.last() {
            Some(last) if last.id == AttrId::WRAPPED_DATA => &self.buf[..last.offset],
            _ => self.buf,
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builder for attribute buffers
#[derive(Debug, Clone, Default)]
pub struct AttrWriter {
    buf: Vec<u8>,
}

impl AttrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, id: AttrId, value: &[u8]) -> &mut Self {
        debug_assert!(value.len() <= u16::MAX as usize);
        self.buf.extend_from_slice(&id.0.to_le_bytes());
        self.buf
            .extend_from_slice(&(value.len() as u16).to_le_bytes());
        self.buf.extend_from_slice(value);
        self
    }

    pub fn put_u8(&mut self, id: AttrId, value: u8) -> &mut Self {
        self.put(id, &[value])
    }

    pub fn put_status(&mut self, status: DppStatus) -> &mut Self {
        self.put_u8(AttrId::STATUS, status.as_u8())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
