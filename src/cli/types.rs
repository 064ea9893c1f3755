//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bughound")]
#[command(about = "Bughound - crash-safe automated bug hunting", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the state directory and checkpoint database
    Init {
        /// Force reinitialization even if already initialized
        #[arg(short, long)]
        force: bool,
    },

    /// Run the hunt pipeline to completion
    Hunt(HuntArgs),

    /// Show tracked items, fixes, and the remaining entrypoint queue
    Status,

    /// Drop the entrypoint queue and every item resolution never touched
    Clear {
        /// Skip the confirmation requirement
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
pub struct HuntArgs {
    /// Resume the incomplete run found in the checkpoint store
    #[arg(long)]
    pub resume: bool,

    /// Start a fresh run, abandoning any incomplete one
    #[arg(long, conflicts_with = "resume")]
    pub fresh: bool,

    /// Seed entrypoints (comma-separated), skipping the first suggestion round
    #[arg(short, long, value_delimiter = ',')]
    pub entrypoint: Vec<String>,
}
