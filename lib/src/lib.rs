mod bin_group;
mod capture;
mod dump;
mod errors;
mod parser;
mod sample;

// Public re-export
pub use crate::bin_group::{
    bitmap_weight, decode_bin_group, max_index, max_magnitude, BinGroup, DecodedBinGroup,
    BIN_GROUP_LEN,
};
pub use crate::errors::{BatchError, DumpError, SampleParseError};
pub use crate::parser::{parse_sample, SampleShape, HT20_40_NUM_BINS, HT20_NUM_BINS};
pub use crate::sample::{
    split_samples, BinSummary, ChannelWidth, DecodedSample, RadarInfo, RxMetadata, SampleBatch,
    ScanMode,
};

pub use crate::capture::{HarvestStats, HoneySink, RawSample, ScanModeHandle, StreamBee};
pub use dump::{create_dump_source, extract_from_dump, parse_dump_line, read_dump};
