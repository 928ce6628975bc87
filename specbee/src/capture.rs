use specbee_lib::{
    create_dump_source, extract_from_dump, split_samples, DumpError, ScanModeHandle, StreamBee,
};

use std::io::{self, BufReader};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::cli::{DecodeArgs, StreamArgs};

pub fn run_stream(args: StreamArgs) -> Result<(), ctrlc::Error> {
    let StreamArgs { mode, print } = args;

    // Set up the `running` flag for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);

    // Set up CTRL+C handler for graceful shutdown
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let source = create_dump_source(BufReader::new(io::stdin()));
    let mut bee = StreamBee::new(source, ScanModeHandle::new(mode));
    let stats = bee.stats();

    // Start decoding
    bee.start_harvesting(print);

    // Wait for CTRL+C or the end of the stream
    while running.load(Ordering::SeqCst) && bee.is_running() {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    println!("Shutting down gracefully...");
    bee.stop();
    println!(
        "Decoded {} samples, dropped {}.",
        stats.decoded(),
        stats.dropped()
    );
    Ok(())
}

pub fn run_decode(args: DecodeArgs) -> Result<(), DumpError> {
    let data = extract_from_dump(args.dump_in, args.mode)?;

    if args.print {
        println!("Data read: {:?}", data);
    }

    if args.summary {
        let batch = split_samples(data);
        let peak = batch.bins.iter().map(|b| b.max_magnitude()).max();
        println!(
            "Decoded {} samples; peak magnitude: {:?}",
            batch.len(),
            peak
        );
        match batch.spectrogram() {
            Ok(spectrogram) => println!("Spectrogram shape: {:?}", spectrogram.shape()),
            Err(e) => log::warn!("No spectrogram for this batch: {}", e),
        }
    }

    Ok(())
}
