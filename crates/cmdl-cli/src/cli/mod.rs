//! CLI for the cmdl model downloader.

mod commands;
mod progress;
mod size;
mod source;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use cmdl_core::config::{self, CmdlConfig};
use std::path::{Path, PathBuf};

use commands::{run_completions, run_download, run_info};
pub use source::SourceArgs;

/// Top-level CLI for cmdl.
#[derive(Debug, Parser)]
#[command(name = "cmdl", version)]
#[command(about = "cmdl: concurrent chunked downloader for catalog model files", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/cmdl/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show debug-level log lines on stderr.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a file by URL, model id, model version id or hash.
    Download(DownloadArgs),

    /// Show catalog details for a model, model version or hash.
    Info {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print a shell completion script to stdout.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Directory to save into (default: config `download_dir`, else the current directory).
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Save under this file name instead of the server/catalog name.
    #[arg(long, value_name = "FILE")]
    pub name: Option<String>,

    /// Concurrent chunk fetches (default: config `threads`, 8).
    #[arg(short = 't', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Largest chunk, e.g. 512MiB or 1073741824 (default: config `max_chunk_size`, 1GiB).
    #[arg(short = 's', long, value_name = "SIZE", value_parser = size::parse_size)]
    pub max_chunk_size: Option<u64>,

    /// Known total size in bytes; skips the size probe.
    #[arg(long, value_name = "SIZE", value_parser = size::parse_size)]
    pub size: Option<u64>,

    /// One plain GET instead of concurrent ranged chunks.
    #[arg(long)]
    pub direct: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let Cli {
            config, command, ..
        } = self;
        match command {
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Download(args) => {
                let cfg = load_config(config.as_deref())?;
                run_download(&cfg, args).await
            }
            CliCommand::Info { source } => {
                let cfg = load_config(config.as_deref())?;
                run_info(&cfg, source).await
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<CmdlConfig> {
    let cfg = match path {
        Some(path) => config::load_from(path)?,
        None => config::load_or_init()?,
    };
    cfg.validate()?;
    tracing::debug!("loaded config: {:?}", redacted(&cfg));
    Ok(cfg)
}

/// Config for debug output without the API key.
fn redacted(cfg: &CmdlConfig) -> CmdlConfig {
    let mut cfg = cfg.clone();
    if !cfg.api_key.is_empty() {
        cfg.api_key = "<redacted>".to_string();
    }
    cfg
}

#[cfg(test)]
mod tests;
