//! Error types used by this lib.
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SampleParseError {
    #[error("Spectral scan is disabled; no sample can be parsed")]
    InvalidMode,
    #[error("Received sample of unexpected length: {actual} bytes (expected: {expected})")]
    TruncatedPacket { expected: usize, actual: usize },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BatchError {
    #[error("Sample {index} has {found} bins, but the batch started with {expected}")]
    RaggedBins {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("Batch has {raw_bins} rows of bins but {max_exponents} max exponents")]
    MismatchedColumns {
        raw_bins: usize,
        max_exponents: usize,
    },
}

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("IO error reading sample dump: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed dump line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
}
