// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fault injection hooks for exercising failure paths
//!
//! Only compiled for tests or with the `fault-injection` feature; production
//! builds carry no hook calls at all.

use crate::protocol::FrameType;

/// Hooks invoked by a session at fixed points while it builds frames
#[cfg_attr(any(test, feature = "fault-injection"), mockall::automock)]
pub trait FaultInjector: Send {
    /// Called with the Responder Authenticating Tag before it is wrapped
    fn tamper_r_auth(&self, tag: &mut [u8]);

    /// Called with the Initiator Authenticating Tag before it is wrapped
    fn tamper_i_auth(&self, tag: &mut [u8]);

    /// Called with the finished attribute buffer of every outgoing frame
    fn tamper_outgoing(&self, frame_type: FrameType, attrs: &mut Vec<u8>);
}

/// Injector that flips the first octet of selected authenticating tags
#[derive(Debug, Default, Clone, Copy)]
pub struct TagCorruptor {
    pub r_auth: bool,
    pub i_auth: bool,
}

impl FaultInjector for TagCorruptor {
    fn tamper_r_auth(&self, tag: &mut [u8]) {
        if self.r_auth {
            if let Some(first) = tag.first_mut() {
                *first ^= 0x01;
            }
        }
    }

    fn tamper_i_auth(&self, tag: &mut [u8]) {
        if self.i_auth {
            if let Some(first) = tag.first_mut() {
                *first ^= 0x01;
            }
        }
    }

    fn tamper_outgoing(&self, _frame_type: FrameType, _attrs: &mut Vec<u8>) {}
}
