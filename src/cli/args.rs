//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// tamp asset minifier CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: tamp.toml)
    #[arg(short = 'C', long, global = true, default_value = "tamp.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Minify files directly to stdout or an output directory
    #[command(visible_alias = "m")]
    Minify {
        #[command(flatten)]
        args: MinifyArgs,
    },

    /// Serve minified assets over HTTP with the disk cache
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },

    /// Remove all cached artifacts
    Clean,
}

/// Minify command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct MinifyArgs {
    /// Files to minify (extension selects the pipeline)
    #[arg(value_name = "FILE", required = true, value_hint = clap::ValueHint::FilePath)]
    pub files: Vec<PathBuf>,

    /// Write results into this directory instead of stdout
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub switches: SwitchArgs,
}

/// Serve command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory served as site root
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Cache directory for minified artifacts
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub cache_dir: Option<PathBuf>,

    #[command(flatten)]
    pub switches: SwitchArgs,
}

/// Per-pipeline switches shared by Minify and Serve commands
#[derive(clap::Args, Debug, Clone)]
pub struct SwitchArgs {
    /// Enable markup minification
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub html: Option<bool>,

    /// Enable stylesheet minification
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub css: Option<bool>,

    /// Enable script minification
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub js: Option<bool>,
}

#[allow(unused)]
impl Cli {
    pub const fn is_minify(&self) -> bool {
        matches!(self.command, Commands::Minify { .. })
    }
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
    pub const fn is_clean(&self) -> bool {
        matches!(self.command, Commands::Clean)
    }
}
