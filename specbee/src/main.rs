mod capture;
mod cli;

use clap::Parser;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use crate::capture::{run_decode, run_stream};
use crate::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = TermLogger::init(
        cli.loglevel,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Couldn't set up logging: {}", e);
    }

    let result = match cli.command {
        Commands::Stream(args) => run_stream(args).map_err(|e| e.to_string()),
        Commands::Decode(args) => run_decode(args).map_err(|e| e.to_string()),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
