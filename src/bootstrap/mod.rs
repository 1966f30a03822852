// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bootstrapping: URIs, key records and the registry
//!
//! - **URI**: `DPP:` URI parsing and generation
//! - **Info**: Own and peer bootstrapping key records
//! - **Registry**: Id-keyed collection with hash and chirp lookup
//! - **Channels**: Operating class conversion and Initiator channel planning

pub mod channels;
pub mod info;
pub mod registry;
pub mod uri;

pub use channels::{
    chan_to_freq, freq_to_op_class_channel, prepare_channel_list, ChannelInfo,
    DEFAULT_SOCIAL_FREQS, DPP_BOOTSTRAP_MAX_FREQ,
};
pub use info::{format_mac, BootstrapGenParams, BootstrapInfo, BootstrapType};
pub use registry::{build_presence_announcement, BootstrapRegistry};
pub use uri::{gen_uri, parse_chan_list, parse_mac, parse_uri, ChannelList};
