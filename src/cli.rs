use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "shelf-life")]
#[command(about = "Dataset folder lifecycle manager", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Discover datasets and run the archive pass (the default)
    Run,
    /// Print the active and archived records as JSON
    Inspect,
    /// Spread recorded scan times across the scan interval
    LoadBalance,
}
