//! One-shot minification command.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::cli::MinifyArgs;
use crate::config::AppConfig;
use crate::core::AssetKind;
use crate::log;
use crate::minify;

/// Minify each file; single results go to stdout, `-o DIR` writes files.
pub fn run(args: &MinifyArgs, config: &AppConfig) -> Result<()> {
    if let Some(dir) = &args.output {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    for file in &args.files {
        let minified = minify_file(file, config)?;
        match &args.output {
            Some(dir) => {
                let name = file
                    .file_name()
                    .with_context(|| format!("Invalid file name: {}", file.display()))?;
                let target = dir.join(name);
                fs::write(&target, &minified)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                log!("minify"; "{} ({} -> {} bytes)",
                    target.display(),
                    fs::metadata(file).map(|m| m.len()).unwrap_or(0),
                    minified.len());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(minified.as_bytes())?;
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

fn minify_file(file: &Path, config: &AppConfig) -> Result<String> {
    let kind = AssetKind::from_path(file);
    if kind == AssetKind::Other {
        bail!(
            "unsupported extension for {}: expected css, js or html",
            file.display()
        );
    }

    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let enabled = match kind {
        AssetKind::Css => config.minify.css,
        AssetKind::Js => config.minify.js,
        AssetKind::Html => config.minify.html,
        AssetKind::Other => false,
    };
    if !enabled {
        return Ok(source); // switched off: pass through unmodified
    }

    Ok(minify::minify(kind, &source).unwrap_or(source))
}
