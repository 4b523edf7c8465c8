//! Command-line interface for the escript runtime tools.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "escript")]
#[command(about = "Inspect escript values and compiler configuration", long_about = None)]
pub struct Cli {
    /// Raise the log level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the resolved compiler configuration
    Config {
        /// Configuration file; defaults come from the environment when omitted
        path: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode packed value files and print their kind and contents
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Write a sample packed struct
    PackDemo { file: PathBuf },
}

impl Cli {
    /// Default tracing filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
