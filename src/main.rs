//! tamp - an on-demand asset minifier with an mtime-validated disk cache.

mod cache;
mod cli;
mod config;
mod core;
mod logger;
mod minify;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::AppConfig;

use crate::cache::AssetCache;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = AppConfig::load(&cli)?;

    match &cli.command {
        Commands::Minify { args } => cli::minify::run(args, &config),
        Commands::Serve { .. } => cli::serve::run(&config),
        Commands::Clean => clean_cache(&config),
    }
}

/// Drop every cached artifact and leave an empty cache directory behind.
fn clean_cache(config: &AppConfig) -> Result<()> {
    let cache = AssetCache::new(config.cache.dir.clone());
    cache.clear()?;
    log!("cache"; "cleared {}", cache.dir().display());
    Ok(())
}
