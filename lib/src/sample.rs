//! Spectral sample data structs used throughout the library.

use bilge::prelude::*;
use ndarray::Array2;

use crate::bin_group::DecodedBinGroup;
use crate::errors::BatchError;

/// Mask of the max exponent byte that holds the shift amount
const MAX_EXPONENT_MASK: u8 = 0x0f;

/// Spectral scan mode as configured on the radio
#[bitsize(2)]
#[derive(FromBits, Debug, Eq, PartialEq, Copy, Clone)]
pub enum ScanMode {
    /// Spectral scan is off; samples are not expected
    Disabled,
    /// Hardware sends samples whenever it is not busy otherwise
    Background,
    /// Samples are triggered manually
    Manual,
    /// Like manual, but also triggered on channel changes during a scan
    ChannelScan,
}

impl ScanMode {
    /// Whether samples are meaningful in this mode
    pub fn is_active(self) -> bool {
        self != ScanMode::Disabled
    }
}

impl std::str::FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" | "disabled" => Ok(ScanMode::Disabled),
            "background" => Ok(ScanMode::Background),
            "manual" => Ok(ScanMode::Manual),
            "chanscan" | "channel-scan" => Ok(ScanMode::ChannelScan),
            _ => Err(format!("Invalid scan mode: {}", s)),
        }
    }
}

/// Channel width the sample was captured at; selects the sample shape
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ChannelWidth {
    /// 20 MHz, one set of bins
    Ht20,
    /// Dynamic 20/40 MHz, lower and upper bins
    Ht20_40,
}

impl std::str::FromStr for ChannelWidth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ht20" => Ok(ChannelWidth::Ht20),
            "ht20_40" | "ht40" => Ok(ChannelWidth::Ht20_40),
            _ => Err(format!("Invalid channel width: {}", s)),
        }
    }
}

/**
 * Receive conditions handed over by the receive path with each buffer
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxMetadata {
    pub channel_width: ChannelWidth,
    /// Center frequency in MHz
    pub freq: u16,
    pub rssi: i8,
    pub noise: i8,
}

impl RxMetadata {
    /// Metadata carrying only the channel width
    pub fn with_width(channel_width: ChannelWidth) -> Self {
        Self {
            channel_width,
            freq: 0,
            rssi: 0,
            noise: 0,
        }
    }
}

/// Radar info suffix trailing every sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RadarInfo {
    pub pulse_length_primary: u8,
    pub pulse_length_extended: u8,
    pub pulse_bandwidth_info: u8,
}

impl RadarInfo {
    pub fn from_buf(buf: &[u8; 3]) -> Self {
        Self {
            pulse_length_primary: buf[0],
            pulse_length_extended: buf[1],
            pulse_bandwidth_info: buf[2],
        }
    }
}

/// Decoded bin-group(s) of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinSummary {
    Narrow {
        all_bins: DecodedBinGroup,
    },
    Wide {
        lower_bins: DecodedBinGroup,
        upper_bins: DecodedBinGroup,
    },
}

impl BinSummary {
    /// Largest peak magnitude over all bin-groups
    pub fn max_magnitude(&self) -> u16 {
        match self {
            BinSummary::Narrow { all_bins } => all_bins.max_magnitude,
            BinSummary::Wide {
                lower_bins,
                upper_bins,
            } => lower_bins.max_magnitude.max(upper_bins.max_magnitude),
        }
    }
}

/**
 * Data decoded from a single spectral sample
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSample {
    #[cfg(feature = "sample_metadata")]
    pub metadata: RxMetadata,
    pub mode: ScanMode,
    pub timestamp: u64,
    pub raw_bins: Vec<u8>,
    pub bins: BinSummary,
    pub max_exponent: u8,
    pub radar: RadarInfo,
}

impl DecodedSample {
    /// FFT bins shifted back up by the max exponent
    pub fn scaled_bins(&self) -> Vec<u32> {
        self.raw_bins
            .iter()
            .map(|&bin| scale_bin(bin, self.max_exponent))
            .collect()
    }
}

fn scale_bin(bin: u8, max_exponent: u8) -> u32 {
    (bin as u32) << (max_exponent & MAX_EXPONENT_MASK)
}

/**
 * A batch of samples
 */
#[derive(Debug, Clone)]
pub struct SampleBatch {
    #[cfg(feature = "sample_metadata")]
    pub metadata: Vec<RxMetadata>,
    pub modes: Vec<ScanMode>,
    pub timestamps: Vec<u64>,
    pub raw_bins: Vec<Vec<u8>>,
    pub bins: Vec<BinSummary>,
    pub max_exponents: Vec<u8>,
    pub radar: Vec<RadarInfo>,
}

impl SampleBatch {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Scaled bins of all samples, one row per sample.
    ///
    /// All samples must have the same number of bins, i.e. don't mix
    /// HT20 and HT20/40 samples in a batch.
    pub fn spectrogram(&self) -> Result<Array2<u32>, BatchError> {
        if self.max_exponents.len() != self.raw_bins.len() {
            return Err(BatchError::MismatchedColumns {
                raw_bins: self.raw_bins.len(),
                max_exponents: self.max_exponents.len(),
            });
        }

        let columns = self.raw_bins.first().map_or(0, Vec::len);
        if let Some((index, row)) = self
            .raw_bins
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns)
        {
            return Err(BatchError::RaggedBins {
                index,
                expected: columns,
                found: row.len(),
            });
        }

        Ok(Array2::from_shape_fn(
            (self.raw_bins.len(), columns),
            |(row, col)| scale_bin(self.raw_bins[row][col], self.max_exponents[row]),
        ))
    }
}

pub fn split_samples(input: Vec<DecodedSample>) -> SampleBatch {
    // Initialize vectors for each field
    #[cfg(feature = "sample_metadata")]
    let mut metadata = Vec::with_capacity(input.len());
    let mut modes = Vec::with_capacity(input.len());
    let mut timestamps = Vec::with_capacity(input.len());
    let mut raw_bins = Vec::with_capacity(input.len());
    let mut bins = Vec::with_capacity(input.len());
    let mut max_exponents = Vec::with_capacity(input.len());
    let mut radar = Vec::with_capacity(input.len());

    for sample in input {
        #[cfg(feature = "sample_metadata")]
        metadata.push(sample.metadata);
        modes.push(sample.mode);
        timestamps.push(sample.timestamp);
        raw_bins.push(sample.raw_bins);
        bins.push(sample.bins);
        max_exponents.push(sample.max_exponent);
        radar.push(sample.radar);
    }

    SampleBatch {
        #[cfg(feature = "sample_metadata")]
        metadata,
        modes,
        timestamps,
        raw_bins,
        bins,
        max_exponents,
        radar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(max_magnitude: u16) -> DecodedBinGroup {
        DecodedBinGroup {
            max_magnitude,
            max_index: 29,
            bitmap_weight: 1,
        }
    }

    fn sample(timestamp: u64, raw_bins: Vec<u8>, max_exponent: u8) -> DecodedSample {
        DecodedSample {
            #[cfg(feature = "sample_metadata")]
            metadata: RxMetadata::with_width(ChannelWidth::Ht20),
            mode: ScanMode::Background,
            timestamp,
            raw_bins,
            bins: BinSummary::Narrow {
                all_bins: group(100),
            },
            max_exponent,
            radar: RadarInfo::default(),
        }
    }

    #[test]
    fn scan_mode_from_str() {
        assert_eq!("disable".parse::<ScanMode>(), Ok(ScanMode::Disabled));
        assert_eq!("background".parse::<ScanMode>(), Ok(ScanMode::Background));
        assert_eq!("Manual".parse::<ScanMode>(), Ok(ScanMode::Manual));
        assert_eq!("chanscan".parse::<ScanMode>(), Ok(ScanMode::ChannelScan));
        assert!("trigger".parse::<ScanMode>().is_err());
    }

    #[test]
    fn scan_mode_bits() {
        assert_eq!(ScanMode::from(UInt::<u8, 2>::new(0)), ScanMode::Disabled);
        assert_eq!(ScanMode::from(UInt::<u8, 2>::new(3)), ScanMode::ChannelScan);
        assert!(!ScanMode::Disabled.is_active());
        assert!(ScanMode::Manual.is_active());
    }

    #[test]
    fn wide_summary_max_magnitude() {
        let bins = BinSummary::Wide {
            lower_bins: group(10),
            upper_bins: group(4000),
        };
        assert_eq!(bins.max_magnitude(), 4000);
    }

    #[test]
    fn scaled_bins_use_low_nibble() {
        let s = sample(0, vec![0, 1, 255], 0xf3);
        assert_eq!(s.scaled_bins(), vec![0, 8, 255 << 3]);
    }

    #[test]
    fn split_and_spectrogram() {
        let batch = split_samples(vec![sample(1, vec![1, 2], 0), sample(2, vec![3, 4], 1)]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.timestamps, vec![1, 2]);

        let spectrogram = batch.spectrogram().unwrap();
        assert_eq!(spectrogram.shape(), &[2, 2]);
        assert_eq!(spectrogram[[0, 1]], 2);
        assert_eq!(spectrogram[[1, 0]], 6);
    }

    #[test]
    fn mismatched_exponents_rejected() {
        let mut batch = split_samples(vec![sample(1, vec![1, 2], 0), sample(2, vec![3, 4], 0)]);
        batch.max_exponents.pop();
        assert_eq!(
            batch.spectrogram(),
            Err(BatchError::MismatchedColumns {
                raw_bins: 2,
                max_exponents: 1
            })
        );
    }

    #[test]
    fn ragged_spectrogram_rejected() {
        let batch = split_samples(vec![sample(1, vec![1, 2], 0), sample(2, vec![3], 0)]);
        assert_eq!(
            batch.spectrogram(),
            Err(BatchError::RaggedBins {
                index: 1,
                expected: 2,
                found: 1
            })
        );
    }
}
