// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Operating class / channel conversion and Initiator channel planning

use tracing::{debug, info};

use crate::error::{DppError, Result};

/// Upper bound on frequencies kept from a URI channel list or local scan
pub const DPP_BOOTSTRAP_MAX_FREQ: usize = 30;

/// Channels tried when the radio reports no channel list
pub const DEFAULT_SOCIAL_FREQS: [u32; 3] = [2412, 2437, 2462];

/// One channel the local radio knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    pub freq: u32,
    pub disabled: bool,
    pub no_ir: bool,
    pub radar: bool,
}

impl ChannelInfo {
    pub fn usable(freq: u32) -> Self {
        Self {
            freq,
            disabled: false,
            no_ir: false,
            radar: false,
        }
    }

    /// Whether DPP may initiate on this channel
    pub fn can_initiate(&self) -> bool {
        !(self.disabled || self.no_ir || self.radar)
    }
}

/// Frequency (MHz) of `channel` in global operating class `op_class`
pub fn chan_to_freq(op_class: u8, channel: u8) -> Option<u32> {
    let ch = channel as u32;
    match op_class {
        81 if (1..=13).contains(&ch) => Some(2407 + 5 * ch),
        82 if ch == 14 => Some(2484),
        83 if (1..=9).contains(&ch) => Some(2407 + 5 * ch),
        84 if (5..=13).contains(&ch) => Some(2407 + 5 * ch),
        115..=130 if (36..=177).contains(&ch) => Some(5000 + 5 * ch),
        131..=135 if (1..=233).contains(&ch) => Some(5950 + 5 * ch),
        136 if ch == 2 => Some(5935),
        _ => None,
    }
}

/// Global operating class and channel number for `freq`
pub fn freq_to_op_class_channel(freq: u32) -> Option<(u8, u8)> {
    match freq {
        2412..=2472 if (freq - 2407) % 5 == 0 => Some((81, ((freq - 2407) / 5) as u8)),
        2484 => Some((82, 14)),
        5935 => Some((136, 2)),
        5180..=5885 if (freq - 5000) % 5 == 0 => {
            let ch = (freq - 5000) / 5;
            let op_class = match ch {
                36..=48 => 115,
                52..=64 => 118,
                100..=144 => 121,
                149..=161 => 124,
                165..=177 => 125,
                _ => return None,
            };
            Some((op_class, ch as u8))
        }
        5955..=7115 if (freq - 5950) % 5 == 0 => Some((131, ((freq - 5950) / 5) as u8)),
        _ => None,
    }
}

fn channel_ok_init(own: &[ChannelInfo], freq: u32) -> bool {
    if own.is_empty() {
        return true;
    }
    let ok = own.iter().any(|c| c.freq == freq && c.can_initiate());
    if !ok {
        debug!("DPP: Peer channel {} MHz not supported", freq);
    }
    ok
}

fn freq_to_start(freqs: &mut [u32], freq: u32) {
    if let Some(pos) = freqs.iter().position(|&f| f == freq) {
        freqs[..=pos].rotate_right(1);
    }
}

/// Build the ordered list of frequencies for sending an Authentication Request
///
/// # Arguments
///
/// * `neg_freq` - Frequency requested for the exchange, if any
/// * `own` - Channels the local radio reports (`None` when unknown)
/// * `peer_freqs` - Channels from the peer's bootstrapping URI
///
/// # Returns
///
/// Frequencies in try order; the first entry is the starting channel
pub fn prepare_channel_list(
    neg_freq: Option<u32>,
    own: Option<&[ChannelInfo]>,
    peer_freqs: &[u32],
) -> Result<Vec<u32>> {
    // 1. A requested channel wins when the local radio gives no channel list
    let mut freqs: Vec<u32> = Vec::new();
    match own {
        None => {
            if let Some(freq) = neg_freq {
                return Ok(vec![freq]);
            }
            // 2. Peer's advertised list, else the social channels
            for &freq in peer_freqs {
                if !freqs.contains(&freq) {
                    freqs.push(freq);
                }
            }
            if freqs.is_empty() {
                freqs.extend_from_slice(&DEFAULT_SOCIAL_FREQS);
            }
        }
        Some(own) if !peer_freqs.is_empty() => {
            for &freq in peer_freqs {
                if !freqs.contains(&freq) && channel_ok_init(own, freq) {
                    freqs.push(freq);
                }
            }
        }
        Some([]) => freqs.extend_from_slice(&DEFAULT_SOCIAL_FREQS),
        Some(own) => {
            for channel in own.iter().filter(|c| c.can_initiate()) {
                if freqs.contains(&channel.freq) {
                    continue;
                }
                freqs.push(channel.freq);
                if freqs.len() == DPP_BOOTSTRAP_MAX_FREQ {
                    break;
                }
            }
        }
    }

    if freqs.is_empty() {
        return Err(DppError::Config(
            "No available channels for initiating DPP Authentication".to_string(),
        ));
    }

    // 3. Prioritize 2.4 GHz channels 6, 1, 11 (in this order)
    freq_to_start(&mut freqs, 2462);
    freq_to_start(&mut freqs, 2412);
    freq_to_start(&mut freqs, 2437);

    info!("DPP: Possible frequencies for initiating: {:?}", freqs);
    Ok(freqs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chan_to_freq() {
        assert_eq!(chan_to_freq(81, 1), Some(2412));
        assert_eq!(chan_to_freq(81, 6), Some(2437));
        assert_eq!(chan_to_freq(82, 14), Some(2484));
        assert_eq!(chan_to_freq(115, 36), Some(5180));
        assert_eq!(chan_to_freq(131, 5), Some(5975));
        assert_eq!(chan_to_freq(81, 14), None);
        assert_eq!(chan_to_freq(200, 1), None);
    }

    #[test]
    fn test_freq_to_op_class_channel() {
        assert_eq!(freq_to_op_class_channel(2437), Some((81, 6)));
        assert_eq!(freq_to_op_class_channel(2484), Some((82, 14)));
        assert_eq!(freq_to_op_class_channel(5745), Some((124, 149)));
        assert_eq!(freq_to_op_class_channel(5975), Some((131, 5)));
        assert_eq!(freq_to_op_class_channel(1000), None);
    }

    #[test]
    fn test_no_local_list_uses_neg_freq() {
        assert_eq!(prepare_channel_list(Some(2462), None, &[]).unwrap(), vec![2462]);
    }

    #[test]
    fn test_no_local_list_uses_peer_channels() {
        assert_eq!(
            prepare_channel_list(None, None, &[5180, 2412, 5180]).unwrap(),
            vec![2412, 5180]
        );
    }

    #[test]
    fn test_nothing_known_uses_social_channels() {
        assert_eq!(
            prepare_channel_list(None, None, &[]).unwrap(),
            vec![2437, 2412, 2462]
        );
    }

    #[test]
    fn test_empty_local_list_uses_social_channels() {
        assert_eq!(
            prepare_channel_list(None, Some(&[]), &[]).unwrap(),
            vec![2437, 2412, 2462]
        );
    }

    #[test]
    fn test_intersection_skips_unusable_channels() {
        let own = [
            ChannelInfo::usable(2412),
            ChannelInfo {
                radar: true,
                ..ChannelInfo::usable(5260)
            },
            ChannelInfo::usable(5180),
        ];
        let freqs = prepare_channel_list(None, Some(&own), &[5180, 5260, 2412, 5180]).unwrap();
        assert_eq!(freqs, vec![2412, 5180]);
    }

    #[test]
    fn test_no_common_channel_is_error() {
        let own = [ChannelInfo::usable(2412)];
        assert!(prepare_channel_list(None, Some(&own), &[5180]).is_err());
    }

    #[test]
    fn test_local_list_is_capped() {
        let own: Vec<ChannelInfo> = (0..40).map(|i| ChannelInfo::usable(5000 + i * 5)).collect();
        let freqs = prepare_channel_list(None, Some(&own), &[]).unwrap();
        assert_eq!(freqs.len(), DPP_BOOTSTRAP_MAX_FREQ);
    }

    #[test]
    fn test_social_channel_priority() {
        let own = [
            ChannelInfo::usable(5180),
            ChannelInfo::usable(2462),
            ChannelInfo::usable(2412),
            ChannelInfo::usable(2437),
        ];
        assert_eq!(
            prepare_channel_list(None, Some(&own), &[]).unwrap(),
            vec![2437, 2412, 2462, 5180]
        );
    }
}
