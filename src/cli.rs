use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediagate")]
#[command(author, version, about = "JSON gateway over yt-dlp and Instagram account snapshots", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file (default: mediagate.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override `server.port`
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Print the effective configuration as JSON and exit
    ShowConfig,

    /// Extract one URL and print the normalized result
    Extract {
        url: String,

        /// Format selector: best, audio, a quality label or a format_id
        #[arg(short, long, default_value = "best")]
        format: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
