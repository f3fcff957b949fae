//! HTTP front end for on-demand minification.

mod response;

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use percent_encoding::percent_decode_str;
use tiny_http::{Request, Server};

use crate::cache::{AssetCache, CacheError};
use crate::config::AppConfig;
use crate::core::{self, AssetKind};
use crate::minify;
use crate::{debug, log};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind, then serve requests until Ctrl+C unblocks the listener.
pub fn run(config: &AppConfig) -> Result<()> {
    config.validate_root()?;

    let cache = AssetCache::new(config.cache.dir.clone());
    cache.ensure_dir()?;

    let (server, addr) = bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    core::register_server(Arc::clone(&server));

    log!("serve"; "http://{}", addr);
    debug!("serve"; "root {} cache {}", config.serve.root.display(), cache.dir().display());

    run_request_loop(&server, config, &cache);
    Ok(())
}

/// Bind to the specified interface and port, with automatic port retry.
fn bind_with_retry(interface: std::net::IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < MAX_PORT_RETRIES => continue,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to bind after {} attempts (ports {}-{}): {}",
                    MAX_PORT_RETRIES,
                    base_port,
                    port,
                    e
                ));
            }
        }
    }
    unreachable!()
}

fn run_request_loop(server: &Server, config: &AppConfig, cache: &AssetCache) {
    // Small pool so slow disks never serialize all requests
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .expect("failed to create thread pool");

    pool.scope(|scope| {
        for request in server.incoming_requests() {
            scope.spawn(move |_| {
                if let Err(e) = handle_request(request, config, cache) {
                    log!("serve"; "request error: {e:#}");
                }
            });
        }
    });
}

/// Handle a single HTTP request
fn handle_request(request: Request, config: &AppConfig, cache: &AssetCache) -> Result<()> {
    if core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    let url = request.url().to_string();
    let (path, query) = match url.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (url.as_str(), None),
    };

    if path == "/min" {
        let Some(file) = query.and_then(|q| query_param(q, "file")) else {
            return response::respond_bad_request(request, "missing `file` parameter");
        };
        return respond_minified(request, &file, config, cache);
    }

    // raw static fallback
    match resolve_under_root(path.trim_start_matches('/'), &config.serve.root) {
        Some(target) if target.is_file() => response::respond_file(request, &target),
        _ => response::respond_not_found(request),
    }
}

/// Serve the minified form of `file`, honoring the pipeline switches.
fn respond_minified(
    request: Request,
    file: &str,
    config: &AppConfig,
    cache: &AssetCache,
) -> Result<()> {
    let Some(source) = resolve_under_root(file, &config.serve.root) else {
        return response::respond_not_found(request);
    };

    let kind = AssetKind::from_path(&source);
    let enabled = match kind {
        AssetKind::Css => config.minify.css,
        AssetKind::Js => config.minify.js,
        AssetKind::Html => config.minify.html,
        AssetKind::Other => false,
    };

    let served = match (kind, enabled) {
        (AssetKind::Css, true) => cache.serve(&source, minify::minify_css),
        (AssetKind::Js, true) => cache.serve(&source, minify::minify_js),
        // markup is minified per request and never cached
        (AssetKind::Html, true) => {
            read_text(&source).map(|text| minify::minify_html(&text).into_bytes())
        }
        // switched off or unrecognized: raw bytes, same content type
        _ => read_raw(&source),
    };

    let content_type = kind
        .content_type()
        .unwrap_or_else(|| crate::utils::mime::from_path(&source));

    match served {
        Ok(body) => response::send_body(request, 200, content_type, body),
        Err(CacheError::SourceNotFound(_)) => response::respond_not_found(request),
        Err(e @ CacheError::Io(..)) => {
            log!("error"; "{e:#}");
            response::respond_server_error(request)
        }
    }
}

fn read_text(path: &Path) -> Result<String, CacheError> {
    read_raw(path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

fn read_raw(path: &Path) -> Result<Vec<u8>, CacheError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CacheError::SourceNotFound(path.to_path_buf()))
        }
        Err(e) => Err(CacheError::Io(path.to_path_buf(), e)),
    }
}

/// Percent-decode a relative path and anchor it under the document root.
/// Absolute paths and `..` components are rejected.
fn resolve_under_root(raw: &str, root: &Path) -> Option<PathBuf> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    let relative = Path::new(decoded.as_ref());
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe || relative.as_os_str().is_empty() {
        return None;
    }
    Some(root.join(relative))
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        assert_eq!(
            query_param("file=css/app.css&v=2", "file").as_deref(),
            Some("css/app.css")
        );
        assert_eq!(query_param("v=2", "file"), None);
        assert_eq!(query_param("", "file"), None);
    }

    #[test]
    fn test_resolve_under_root_rejects_escape() {
        let root = Path::new("/srv/site");
        assert_eq!(
            resolve_under_root("css/app.css", root),
            Some(PathBuf::from("/srv/site/css/app.css"))
        );
        assert_eq!(resolve_under_root("../etc/passwd", root), None);
        assert_eq!(resolve_under_root("/etc/passwd", root), None);
        assert_eq!(resolve_under_root("", root), None);
    }

    #[test]
    fn test_resolve_under_root_decodes() {
        let root = Path::new("/srv/site");
        assert_eq!(
            resolve_under_root("css%2Fapp%20v2.css", root),
            Some(PathBuf::from("/srv/site/css/app v2.css"))
        );
    }
}
