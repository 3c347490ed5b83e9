use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on (overrides the configured one)
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Run a single prompt against local video files
    Process {
        /// Editing request in natural language
        #[arg(short, long)]
        prompt: String,

        /// Input video files, in order
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },

    /// Print the seconds a time expression stands for
    Normalize {
        /// Time expression such as "1:30" or "2 minutes 5 seconds"
        expression: String,
    },

    /// List artifacts in the output directory
    Outputs,

    /// Write the effective configuration to a file
    Config {
        /// Destination file
        #[arg(short, long, default_value = "kiru.toml")]
        output: PathBuf,
    },
}
