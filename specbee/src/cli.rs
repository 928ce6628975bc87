use clap::{ArgGroup, Parser, Subcommand};
use simplelog::LevelFilter;
use specbee_lib::ScanMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Log level for output (error, warn, info, debug, trace)
    #[arg(global = true, long, default_value = "info")]
    pub loglevel: LevelFilter,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode spectral samples streamed as a dump on stdin
    Stream(StreamArgs),

    /// Decode an existing sample dump file
    Decode(DecodeArgs),
}

#[derive(Parser)]
pub struct StreamArgs {
    /// Scan mode the radio is in (background, manual, chanscan, disable)
    #[arg(long, default_value = "background")]
    pub mode: ScanMode,

    /// Whether to print decoded samples
    #[arg(long, default_value = "false")]
    pub print: bool,
}

#[derive(Parser)]
#[command(group = ArgGroup::new("output").required(true).multiple(true).args(&["print", "summary"]))]
pub struct DecodeArgs {
    /// Read samples from an existing dump file
    #[arg(long)]
    pub dump_in: PathBuf,

    /// Scan mode the samples were recorded in
    #[arg(long, default_value = "background")]
    pub mode: ScanMode,

    /// Whether to print decoded samples
    #[arg(long, default_value = "false")]
    pub print: bool,

    /// Whether to print a summary of the decoded batch
    #[arg(long, default_value = "false")]
    pub summary: bool,
}
