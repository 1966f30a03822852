// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DPP wire format
//!
//! - **Cursor**: Bounds-checked byte reader shared by all decoders
//! - **Attributes**: TLV scan, lookup and building
//! - **Status**: DPP Status codes
//! - **Frame**: Public Action header and frame types
//! - **Version**: Protocol version threaded through builders
//! - **Capabilities**: Role bits and role selection
//! - **GAS**: Configuration Request/Response encapsulation

pub mod attributes;
pub mod capabilities;
pub mod cursor;
pub mod frame;
pub mod gas;
pub mod status;
pub mod version;

pub use attributes::{
    encode, find, find_from, find_next, scan, AttrId, AttrReader, AttrWriter, Attribute,
    Attributes, ATTR_HEADER_LEN,
};
pub use capabilities::{
    select_initiator_role, select_responder_role, AllowedRoles, RoleSelection, CAPAB_CONFIGURATOR,
    CAPAB_ENROLLEE, CAPAB_ROLE_MASK,
};
pub use cursor::ByteReader;
pub use frame::{
    build_outgoing, parse_public_action, FrameHeader, FrameType, OutgoingFrame, DPP_HDR_LEN,
};
pub use status::DppStatus;
pub use version::ProtocolVersion;
