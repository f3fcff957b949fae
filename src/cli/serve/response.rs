//! HTTP response helpers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tiny_http::{Header, Request, Response, StatusCode};

use crate::utils::mime;

/// Respond with a raw static file.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = mime::from_path(path);
    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    send_body(request, 200, content_type, body)
}

/// Respond with a plain-text 404.
pub fn respond_not_found(request: Request) -> Result<()> {
    send_body(request, 404, mime::types::PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 400 Bad Request and a short reason.
pub fn respond_bad_request(request: Request, reason: &str) -> Result<()> {
    send_body(
        request,
        400,
        mime::types::PLAIN,
        format!("400 Bad Request: {reason}").into_bytes(),
    )
}

/// Respond with a plain-text 500.
pub fn respond_server_error(request: Request) -> Result<()> {
    send_body(
        request,
        500,
        mime::types::PLAIN,
        b"500 Internal Server Error".to_vec(),
    )
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(
        request,
        503,
        mime::types::PLAIN,
        b"503 Service Unavailable".to_vec(),
    )
}

pub fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).unwrap()
}
