//! Spectral sample parsing
//!
//! A spectral sample is a flat buffer without any length field of its own:
//!
//! ```text
//! HT20:    | bins[56]  | all_bins[3]                      max_exp[1] | radar_info[3] |
//! HT20/40: | bins[128] | lower_bins[3] upper_bins[3]      max_exp[1] | radar_info[3] |
//! ```
//!
//! The shape is known only from the channel width reported by the receive
//! path, so a buffer is accepted only if its length matches that shape exactly.

use crate::bin_group::{decode_bin_group, BIN_GROUP_LEN};
use crate::errors::SampleParseError;
use crate::sample::{BinSummary, ChannelWidth, DecodedSample, RadarInfo, RxMetadata, ScanMode};

/// Number of FFT bins in a HT20 sample
pub const HT20_NUM_BINS: usize = 56;
/// Number of FFT bins in a HT20/40 sample (lower and upper half)
pub const HT20_40_NUM_BINS: usize = 128;

const MAX_EXPONENT_LEN: usize = 1;
const RADAR_INFO_LEN: usize = 3;

/// Layout of a sample buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleShape {
    /// Single bin-group (HT20)
    Narrow,
    /// Lower and upper bin-group (HT20/40)
    Wide,
}

impl SampleShape {
    pub fn from_channel_width(width: ChannelWidth) -> Self {
        match width {
            ChannelWidth::Ht20 => SampleShape::Narrow,
            ChannelWidth::Ht20_40 => SampleShape::Wide,
        }
    }

    pub fn num_bins(self) -> usize {
        match self {
            SampleShape::Narrow => HT20_NUM_BINS,
            SampleShape::Wide => HT20_40_NUM_BINS,
        }
    }

    /// Length of the bin-group(s) plus max exponent
    pub fn mag_info_len(self) -> usize {
        match self {
            SampleShape::Narrow => BIN_GROUP_LEN + MAX_EXPONENT_LEN,
            SampleShape::Wide => 2 * BIN_GROUP_LEN + MAX_EXPONENT_LEN,
        }
    }

    /// Exact length of a sample buffer of this shape
    pub fn total_len(self) -> usize {
        self.num_bins() + self.mag_info_len() + RADAR_INFO_LEN
    }
}

/// Extract a decoded spectral sample from a raw sample buffer
///
/// # Parameters
/// * `raw` - Sample buffer as delivered by the hardware
/// * `mode` - Scan mode the radio is currently in
/// * `header` - Receive metadata of the buffer; its channel width selects the shape
/// * `timestamp` - Receive timestamp, passed through unmodified
pub fn parse_sample(
    raw: &[u8],
    mode: ScanMode,
    header: &RxMetadata,
    timestamp: u64,
) -> Result<DecodedSample, SampleParseError> {
    if !mode.is_active() {
        return Err(SampleParseError::InvalidMode);
    }

    let shape = SampleShape::from_channel_width(header.channel_width);
    let expected = shape.total_len();
    let truncated = SampleParseError::TruncatedPacket {
        expected,
        actual: raw.len(),
    };
    if raw.len() != expected {
        return Err(truncated);
    }

    let (bins, rest) = raw.split_at_checked(shape.num_bins()).ok_or(truncated)?;
    let (mag_info, radar_info) = rest.split_at_checked(shape.mag_info_len()).ok_or(truncated)?;

    let (summary, max_exponent) = match *mag_info {
        [a0, a1, a2, max_exp] => {
            let summary = BinSummary::Narrow {
                all_bins: decode_bin_group(&[a0, a1, a2]),
            };
            (summary, max_exp)
        }
        [lo0, lo1, lo2, up0, up1, up2, max_exp] => {
            let summary = BinSummary::Wide {
                lower_bins: decode_bin_group(&[lo0, lo1, lo2]),
                upper_bins: decode_bin_group(&[up0, up1, up2]),
            };
            (summary, max_exp)
        }
        _ => return Err(truncated),
    };
    let radar = match *radar_info {
        [pri, ext, bw] => RadarInfo::from_buf(&[pri, ext, bw]),
        _ => return Err(truncated),
    };

    Ok(DecodedSample {
        #[cfg(feature = "sample_metadata")]
        metadata: *header,
        mode,
        timestamp,
        raw_bins: bins.to_vec(),
        bins: summary,
        max_exponent,
        radar,
    })
}
