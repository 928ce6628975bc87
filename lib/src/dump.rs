//! Some sample dump handling helpers
//!
//! A dump holds one raw sample per line:
//!
//! ```text
//! # tsf      width    freq  rssi  noise  payload
//! 1234567    ht20     2412  -60   -95    0a0b0c...
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use crossbeam_channel::{bounded, Receiver};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::thread;

use crate::capture::RawSample;
use crate::errors::DumpError;
use crate::parser::parse_sample;
use crate::sample::{DecodedSample, RxMetadata, ScanMode};

/// Capacity of the queue between the dump reader thread and its consumer.
const SOURCE_QUEUE_LEN: usize = 100;

const NUM_FIELDS: usize = 6;

/// Parse a single dump line into a raw sample
///
/// Returns `Ok(None)` for blank and comment lines.
///
/// # Parameters
/// * `line_no` - Line number (1-based), used in error messages
/// * `line` - The line contents
pub fn parse_dump_line(line_no: usize, line: &str) -> Result<Option<RawSample>, DumpError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let malformed = |reason: String| DumpError::MalformedLine {
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != NUM_FIELDS {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            NUM_FIELDS,
            fields.len()
        )));
    }

    let timestamp = fields[0]
        .parse::<u64>()
        .map_err(|e| malformed(format!("invalid tsf '{}': {}", fields[0], e)))?;
    let channel_width = fields[1].parse().map_err(malformed)?;
    let freq = fields[2]
        .parse::<u16>()
        .map_err(|e| malformed(format!("invalid frequency '{}': {}", fields[2], e)))?;
    let rssi = fields[3]
        .parse::<i8>()
        .map_err(|e| malformed(format!("invalid rssi '{}': {}", fields[3], e)))?;
    let noise = fields[4]
        .parse::<i8>()
        .map_err(|e| malformed(format!("invalid noise '{}': {}", fields[4], e)))?;
    let data = hex::decode(fields[5]).map_err(|e| malformed(format!("invalid payload: {}", e)))?;

    Ok(Some(RawSample {
        data,
        header: RxMetadata {
            channel_width,
            freq,
            rssi,
            noise,
        },
        timestamp,
    }))
}

/// Read all raw samples from a dump
pub fn read_dump<R: BufRead>(reader: R) -> Result<Vec<RawSample>, DumpError> {
    let mut samples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        if let Some(sample) = parse_dump_line(idx + 1, &line?)? {
            samples.push(sample);
        }
    }
    Ok(samples)
}

/// Extract all decodable samples from a dump file
///
/// Samples that don't decode in the given mode are logged and skipped.
///
/// # Parameters
/// * `dump_file` - Path to the dump file
/// * `mode` - Scan mode the samples were recorded in
pub fn extract_from_dump(
    dump_file: PathBuf,
    mode: ScanMode,
) -> Result<Vec<DecodedSample>, DumpError> {
    log::trace!("Extracting samples from dump file: {}", dump_file.display());

    let raw_samples = read_dump(BufReader::new(File::open(&dump_file)?))?;
    let total = raw_samples.len();

    let extracted: Vec<DecodedSample> = raw_samples
        .into_iter()
        .filter_map(|raw| {
            parse_sample(&raw.data, mode, &raw.header, raw.timestamp)
                .map_err(|e| {
                    log::warn!(
                        "Failed to decode sample at tsf {}. Skipping. Error: {}",
                        raw.timestamp,
                        e
                    )
                })
                .ok()
        })
        .collect();

    log::trace!(
        "Extracted {} of {} samples from dump file.",
        extracted.len(),
        total
    );
    Ok(extracted)
}

/// Creates a queue of raw samples fed from a dump on a background thread.
///
/// The queue disconnects once the reader is exhausted or hits a malformed
/// line (which is logged).
///
/// # Arguments
/// * `reader` - Reader to take the dump from, e.g. stdin
pub fn create_dump_source<R>(reader: R) -> Receiver<RawSample>
where
    R: BufRead + Send + 'static,
{
    log::info!("Creating sample source from dump stream");
    let (tx, rx) = bounded(SOURCE_QUEUE_LEN);

    thread::spawn(move || {
        for (idx, line) in reader.lines().enumerate() {
            let parsed = line
                .map_err(DumpError::from)
                .and_then(|line| parse_dump_line(idx + 1, &line));
            match parsed {
                Ok(Some(sample)) => {
                    if tx.send(sample).is_err() {
                        log::trace!("Sample consumer hung up; Stopping dump reader.");
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("Stopping dump reader. Error: {}", e);
                    return;
                }
            }
        }
        log::trace!("Dump stream exhausted");
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SampleShape;
    use crate::sample::ChannelWidth;
    use std::io::Cursor;

    fn line(tsf: u64, width: &str, len: usize) -> String {
        format!("{} {} 2437 -61 -96 {}", tsf, width, "7f".repeat(len))
    }

    #[test]
    fn dump_line_extraction() {
        let sample = parse_dump_line(1, "42 ht20_40 5180 -70 -100 0102ff")
            .unwrap()
            .unwrap();
        assert_eq!(sample.timestamp, 42);
        assert_eq!(sample.data, vec![0x01, 0x02, 0xff]);
        assert_eq!(
            sample.header,
            RxMetadata {
                channel_width: ChannelWidth::Ht20_40,
                freq: 5180,
                rssi: -70,
                noise: -100,
            }
        );
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        assert!(parse_dump_line(1, "").unwrap().is_none());
        assert!(parse_dump_line(2, "   # tsf width ...").unwrap().is_none());
    }

    #[test]
    fn malformed_lines_report_line_number() {
        for bad in [
            "1 ht20 2412 -60 -95",
            "x ht20 2412 -60 -95 00",
            "1 vht80 2412 -60 -95 00",
            "1 ht20 2412 -600 -95 00",
            "1 ht20 2412 -60 -95 0g",
        ] {
            match parse_dump_line(7, bad) {
                Err(DumpError::MalformedLine { line, .. }) => assert_eq!(line, 7),
                other => panic!("expected malformed line for '{}', got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn read_whole_dump() {
        let dump = format!(
            "# header\n{}\n\n{}\n",
            line(1, "ht20", SampleShape::Narrow.total_len()),
            line(2, "ht20_40", SampleShape::Wide.total_len())
        );
        let samples = read_dump(Cursor::new(dump)).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].data.len(), 138);
    }

    #[test]
    fn dump_source_feeds_queue() {
        let dump = format!(
            "{}\n{}\n",
            line(10, "ht20", SampleShape::Narrow.total_len()),
            line(11, "ht20", 3)
        );
        let rx = create_dump_source(Cursor::new(dump));
        let timestamps: Vec<u64> = rx.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![10, 11]);
    }

    #[test]
    fn extract_skips_undecodable_samples() {
        let path = std::env::temp_dir().join(format!("specbee-dump-{}.txt", std::process::id()));
        let dump = format!(
            "{}\n{}\n",
            line(1, "ht20", SampleShape::Narrow.total_len()),
            line(2, "ht20", SampleShape::Narrow.total_len() + 2)
        );
        std::fs::write(&path, dump).unwrap();

        let samples = extract_from_dump(path.clone(), ScanMode::Background).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp, 1);
        assert_eq!(samples[0].raw_bins, vec![0x7f; 56]);
    }
}
