//! CLI for tbdl, the Terabox share-link downloader.

mod commands;
mod progress;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::fmt;
use std::path::{Path, PathBuf};
use tbdl_core::config::{self, TbdlConfig};
use tbdl_core::TbdlError;

use commands::{run_checksum, run_resolve, run_share_command, RunArgs};

/// Top-level CLI for tbdl.
#[derive(Debug, Parser)]
#[command(name = "tbdl", version)]
#[command(about = "tbdl: download videos from Terabox share links", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/tbdl/config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve a share link and download the video.
    Run {
        /// Terabox share URL (e.g. https://terabox.com/s/1abc...).
        url: String,

        /// Output directory (default: `output_dir` from config, "videos").
        #[arg(short = 'o', long = "output", value_name = "DIR")]
        output: Option<PathBuf>,

        /// Replace an existing file with the same name.
        #[arg(long)]
        overwrite: bool,

        /// Show the browser window while resolving.
        #[arg(long)]
        headful: bool,

        /// Print the SHA-256 of the downloaded file.
        #[arg(long)]
        sha256: bool,
    },

    /// Resolve a share link and print the media details without downloading.
    Resolve {
        /// Terabox share URL.
        url: String,

        /// Print the resolved media as JSON.
        #[arg(long)]
        json: bool,

        /// Show the browser window while resolving.
        #[arg(long)]
        headful: bool,
    },

    /// Compute SHA-256 of a file (e.g. after download).
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        Cli::parse().dispatch().await
    }

    async fn dispatch(self) -> Result<()> {
        match self.command {
            CliCommand::Run {
                url,
                output,
                overwrite,
                headful,
                sha256,
            } => {
                let cfg = load_config(self.config.as_deref())?;
                let args = RunArgs {
                    url,
                    output,
                    overwrite,
                    headful,
                    sha256,
                };
                run_share_command(cfg, args).await?;
            }
            CliCommand::Resolve { url, json, headful } => {
                let cfg = load_config(self.config.as_deref())?;
                run_resolve(cfg, &url, json, headful).await?;
            }
            CliCommand::Checksum { path } => run_checksum(&path).await?,
            CliCommand::Completions { shell } => {
                clap_complete::generate(shell, &mut Cli::command(), "tbdl", &mut std::io::stdout());
            }
        }
        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> Result<TbdlConfig> {
    let cfg = match path {
        Some(p) => config::load_or_init_at(p)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

/// A failed share run: the share URL plus the failure, for reporting and exit codes.
#[derive(Debug)]
pub struct ShareFailure {
    pub url: String,
    pub error: TbdlError,
}

impl ShareFailure {
    pub fn new(url: &str, error: TbdlError) -> Self {
        Self {
            url: url.to_string(),
            error,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

impl fmt::Display for ShareFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.error.kind(), self.url, self.error)
    }
}

impl std::error::Error for ShareFailure {}

#[cfg(test)]
mod tests;
