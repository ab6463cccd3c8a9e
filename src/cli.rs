use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "morphd")]
#[command(author, version, about = "File conversion automation service")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8090")]
        port: u16,
    },

    /// Convert one or more files directly, without the server
    Run {
        /// Input file(s)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Target format (lowercase extension, e.g. pdf, mp3, png)
        #[arg(long = "to")]
        to: String,

        /// Page selection, e.g. "1-3,5"
        #[arg(long)]
        pages: Option<String>,

        /// Split into one output per range, e.g. --split 1-5 --split 6-10
        #[arg(long)]
        split: Vec<String>,

        /// Append these documents after the first input
        #[arg(long)]
        merge: Vec<PathBuf>,

        /// Render each page to an image
        #[arg(long)]
        images: bool,

        /// Output directory (defaults to the configured one)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List supported conversions per category
    Formats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external engines are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
