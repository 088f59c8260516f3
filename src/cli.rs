use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "parqlens")]
#[command(version, about = "A lightweight inspector for Apache Parquet metadata and schema")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the metadata tree of a Parquet file
    Show {
        /// Path to the Parquet file
        path: PathBuf,
    },

    /// Print the schema tree of a Parquet file
    Schema {
        /// Path to the Parquet file
        path: PathBuf,
    },

    /// Dump a file holding a raw Thrift Compact structure
    Thrift {
        /// Path to the encoded struct
        path: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
