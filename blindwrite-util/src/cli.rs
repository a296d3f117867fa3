use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "blindwrite-util")]
#[command(about = "BlindWrite disc image utility", long_about = None)]
pub struct Cli {
    /// Log parsing details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Display information about an image
    Info {
        /// Path to the .b5t or .b6t descriptor
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },

    /// Write every media tag to a directory
    Tags {
        /// Path to the .b5t or .b6t descriptor
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Write the sectors of one track to a file
    Dump {
        /// Path to the .b5t or .b6t descriptor
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Track sequence number
        #[arg(short, long)]
        track: u32,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Write whole frames instead of user data
        #[arg(short, long)]
        long: bool,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the SHA-256 of each track's user data
    Hash {
        /// Path to the .b5t or .b6t descriptor
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },

    /// Check every sector against its EDC
    Verify {
        /// Path to the .b5t or .b6t descriptor
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },
}
