//! CLI definitions and command dispatch.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use opfonts_core::config::{CONFIG_FILENAME, find_config};

use crate::commands::{build, download, extract_charset, generate_charsets, list_scripts, plan};

#[derive(Parser)]
#[command(name = "opfonts")]
#[command(about = "Build compact multi-script fonts from per-script source fonts")]
pub struct Cli {
    /// Build configuration (default: ./opfonts.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// -v for progress logs, -vv for debug output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every configured weight
    Build {
        /// Print the plan and source status without building
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the resolved build plan
    Plan,
    /// List configured scripts in merge order
    ListScripts,
    /// Download missing source fonts into the cache
    Download,
    /// Generate charset files
    #[command(subcommand)]
    Charsets(CharsetCommands),
}

/// Charset file generation
#[derive(Subcommand)]
pub enum CharsetCommands {
    /// Generate CJK charsets from the Unihan database
    Generate {
        #[arg(short, long, default_value = "charsets")]
        output_dir: PathBuf,
        #[arg(long, default_value = "./cache")]
        cache_dir: PathBuf,
    },
    /// Extract the non-ASCII codepoints used by a gettext template
    Extract {
        /// Local path or URL of a .pot file
        source: String,
        /// Write a charset file instead of printing the characters
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Default log filter; RUST_LOG takes precedence
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => match find_config() {
                Some(path) => Ok(path),
                None => bail!("No {CONFIG_FILENAME} in the current directory; pass --config"),
            },
        }
    }

    pub fn run(self) -> Result<()> {
        match &self.command {
            Commands::Build { dry_run } => build(&self.config_path()?, *dry_run),
            Commands::Plan => plan(&self.config_path()?),
            Commands::ListScripts => list_scripts(&self.config_path()?),
            Commands::Download => download(&self.config_path()?),
            Commands::Charsets(CharsetCommands::Generate { output_dir, cache_dir }) => {
                generate_charsets(output_dir, cache_dir)
            }
            Commands::Charsets(CharsetCommands::Extract { source, output }) => {
                extract_charset(source, output.as_deref())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_maps_to_filter() {
        let cli = Cli::parse_from(["opfonts", "plan"]);
        assert_eq!(cli.log_filter(), "warn");
        let cli = Cli::parse_from(["opfonts", "-vv", "build", "--dry-run"]);
        assert_eq!(cli.log_filter(), "debug");
        assert!(matches!(cli.command, Commands::Build { dry_run: true }));
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["opfonts", "list-scripts", "--config", "fonts/op.toml"]);
        assert_eq!(cli.config_path().unwrap(), PathBuf::from("fonts/op.toml"));
    }

    #[test]
    fn test_charsets_extract_args() {
        let cli = Cli::parse_from(["opfonts", "charsets", "extract", "app.pot", "-o", "ui.txt"]);
        let Commands::Charsets(CharsetCommands::Extract { source, output }) = cli.command else {
            panic!("expected charsets extract");
        };
        assert_eq!(source, "app.pot");
        assert_eq!(output, Some(PathBuf::from("ui.txt")));
    }
}
