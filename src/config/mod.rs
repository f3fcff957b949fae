//! Application configuration.
//!
//! Loaded from `tamp.toml` when present, otherwise defaults; individual
//! fields can be overridden from the command line.
//!
//! # Example
//!
//! ```toml
//! [minify]
//! html = true                 # Minify markup responses
//! css = true                  # Minify stylesheet responses
//! js = true                   # Minify script responses
//!
//! [cache]
//! dir = ".tamp/cache"         # Flat cache directory for minified artifacts
//!
//! [serve]
//! interface = "127.0.0.1"     # Network interface to bind
//! port = 8080                 # Port number to listen on
//! root = "."                  # Directory served as site root
//! ```

mod error;

pub use error::ConfigError;

use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::Deserialize;

use crate::cli::{Cli, Commands, SwitchArgs};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub minify: MinifySection,
    pub cache: CacheSection,
    pub serve: ServeSection,
}

/// `[minify]` - the three independent pipeline switches.
///
/// A disabled pipeline passes content through unmodified; it does not
/// change which content type a response carries.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinifySection {
    pub html: bool,
    pub css: bool,
    pub js: bool,
}

/// `[cache]` - where minified artifacts live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    pub dir: PathBuf,
}

/// `[serve]` - HTTP front end binding and document root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeSection {
    pub interface: IpAddr,
    pub port: u16,
    pub root: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            minify: MinifySection::default(),
            cache: CacheSection::default(),
            serve: ServeSection::default(),
        }
    }
}

impl Default for MinifySection {
    fn default() -> Self {
        Self {
            html: true,
            css: true,
            js: true,
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".tamp/cache"),
        }
    }
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            root: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Load configuration for this invocation: file, then CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = if cli.config.exists() {
            let raw = fs::read_to_string(&cli.config)
                .map_err(|e| ConfigError::Io(cli.config.clone(), e))?;
            Self::parse(&raw)?
        } else {
            Self::default()
        };
        config.apply_cli(cli);
        Ok(config)
    }

    fn parse(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Minify { args } => self.apply_switches(&args.switches),
            Commands::Serve { args } => {
                self.apply_switches(&args.switches);
                if let Some(interface) = args.interface {
                    self.serve.interface = interface;
                }
                if let Some(port) = args.port {
                    self.serve.port = port;
                }
                if let Some(root) = &args.root {
                    self.serve.root = root.clone();
                }
                if let Some(dir) = &args.cache_dir {
                    self.cache.dir = dir.clone();
                }
            }
            Commands::Clean => {}
        }
    }

    fn apply_switches(&mut self, switches: &SwitchArgs) {
        if let Some(html) = switches.html {
            self.minify.html = html;
        }
        if let Some(css) = switches.css {
            self.minify.css = css;
        }
        if let Some(js) = switches.js {
            self.minify.js = js;
        }
    }

    /// Serve-mode validation: the document root must be a directory.
    pub fn validate_root(&self) -> Result<(), ConfigError> {
        if !self.serve.root.is_dir() {
            return Err(ConfigError::Validation(format!(
                "serve root `{}` is not a directory",
                self.serve.root.display()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.minify.html && config.minify.css && config.minify.js);
        assert_eq!(config.cache.dir, PathBuf::from(".tamp/cache"));
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_parse_partial_file() {
        let config = AppConfig::parse(
            r#"
[minify]
js = false

[serve]
port = 9090
"#,
        )
        .unwrap();
        assert!(config.minify.html);
        assert!(config.minify.css);
        assert!(!config.minify.js);
        assert_eq!(config.serve.port, 9090);
        assert_eq!(config.cache.dir, PathBuf::from(".tamp/cache"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(AppConfig::parse("[minify]\ntypo = true\n").is_err());
    }

    #[test]
    fn test_validate_root() {
        let mut config = AppConfig::default();
        config.serve.root = PathBuf::from("/definitely/not/here");
        assert!(matches!(
            config.validate_root(),
            Err(ConfigError::Validation(_))
        ));
    }
}
