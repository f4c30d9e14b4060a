//! Pass-through file responder for the static client bundle.
//!
//! This is deliberately the smallest HTTP surface that can hand the built
//! PWA to a browser: GET only, no caching headers, no range requests,
//! connection closed after each response. Unknown paths fall back to
//! `index.html` so client-side routing survives a page refresh.

use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Upper bound on the request head we are willing to read.
const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Answers one plain HTTP request from `stream` out of `static_dir`.
///
/// # Errors
///
/// Returns an error only for transport-level failures (the peer vanished
/// mid-request or mid-response). Bad requests and missing files are
/// answered over the wire, not raised.
pub async fn serve_static(mut stream: TcpStream, static_dir: &Path) -> anyhow::Result<()> {
    let mut buf = vec![0u8; MAX_REQUEST_HEAD];
    let n = stream
        .read(&mut buf)
        .await
        .context("failed to read HTTP request")?;
    if n == 0 {
        return Ok(());
    }

    let head = String::from_utf8_lossy(&buf[..n]);
    let request_line = head.lines().next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => (method, target),
        _ => {
            return write_response(&mut stream, "400 Bad Request", "text/plain", b"bad request")
                .await;
        }
    };

    if method != "GET" {
        return write_response(
            &mut stream,
            "405 Method Not Allowed",
            "text/plain",
            b"method not allowed",
        )
        .await;
    }

    let Some(relative) = sanitize_path(target) else {
        debug!("rejected file request for {target}");
        return write_response(&mut stream, "404 Not Found", "text/plain", b"not found").await;
    };

    // Requested file, else the SPA entry point, else a plain 404.
    let candidate = static_dir.join(&relative);
    let (path, body) = match fs::read(&candidate).await {
        Ok(body) => (candidate, body),
        Err(_) => {
            let index = static_dir.join("index.html");
            match fs::read(&index).await {
                Ok(body) => (index, body),
                Err(_) => {
                    debug!("no file and no index.html for {target}");
                    return write_response(&mut stream, "404 Not Found", "text/plain", b"not found")
                        .await;
                }
            }
        }
    };

    debug!("serving {} ({} bytes)", path.display(), body.len());
    write_response(&mut stream, "200 OK", content_type_for(&path), &body).await
}

/// Turns a request target into a safe path relative to the bundle root.
///
/// Strips the query string and the leading slash, maps the bare root to
/// `index.html`, and refuses any target that tries to traverse out of the
/// bundle directory.
fn sanitize_path(target: &str) -> Option<PathBuf> {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Some(PathBuf::from("index.html"));
    }

    let relative = PathBuf::from(path);
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if safe {
        Some(relative)
    } else {
        None
    }
}

/// Content type by file extension; the bundle is a known, closed set.
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript",
        Some("css") => "text/css",
        Some("json") | Some("map") => "application/json",
        Some("webmanifest") => "application/manifest+json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

async fn write_response(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &[u8],
) -> anyhow::Result<()> {
    let header = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream
        .write_all(header.as_bytes())
        .await
        .context("failed to write response header")?;
    stream
        .write_all(body)
        .await
        .context("failed to write response body")?;
    stream
        .shutdown()
        .await
        .context("failed to close response stream")?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
