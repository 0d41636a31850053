//! Static file serving from the storage root
//!
//! Request paths are percent-decoded and cleaned the way a URL path is
//! cleaned: `.` segments vanish and `..` cannot climb above `/`. Directories
//! are served through their `index.html` when present, otherwise as a plain
//! HTML listing.

use super::response::{self, HttpResponse};
use crate::upload::path::is_plain_segment;
use bytes::Bytes;
use hyper::header::{self, HeaderValue};
use hyper::StatusCode;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

const INDEX_FILE: &str = "index.html";

/// Characters escaped in listing links
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

/// Serve `uri_path` from `root`
pub async fn serve(root: &Path, uri_path: &str) -> HttpResponse {
    let Some(segments) = clean_path(uri_path) else {
        return response::text(StatusCode::BAD_REQUEST, "400 bad request");
    };

    let fs_path = segments.iter().fold(root.to_path_buf(), |p, s| p.join(s));
    let metadata = match tokio::fs::metadata(&fs_path).await {
        Ok(metadata) => metadata,
        Err(e) => return io_error_response(&fs_path, e),
    };

    if !metadata.is_dir() {
        return serve_file(&fs_path).await;
    }

    if !uri_path.ends_with('/') {
        return response::redirect(&format!("{}/", uri_path));
    }

    let index = fs_path.join(INDEX_FILE);
    if tokio::fs::metadata(&index)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
    {
        return serve_file(&index).await;
    }

    match list_directory(&fs_path).await {
        Ok(html) => response::html(StatusCode::OK, html),
        Err(e) => io_error_response(&fs_path, e),
    }
}

/// Decode and clean a request path into filesystem segments
///
/// Returns `None` when the path is not valid UTF-8 after decoding or names
/// something that is not a plain file name.
fn clean_path(uri_path: &str) -> Option<Vec<String>> {
    let decoded = percent_decode_str(uri_path).decode_utf8().ok()?;

    let mut segments: Vec<String> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s if s.contains('\0') || s.contains('\\') || !is_plain_segment(s) => return None,
            s => segments.push(s.to_string()),
        }
    }
    Some(segments)
}

async fn serve_file(path: &Path) -> HttpResponse {
    match tokio::fs::read(path).await {
        Ok(contents) => {
            debug!(path = %path.display(), bytes = contents.len(), "Serving file");
            let mut resp = response::bytes(StatusCode::OK, Bytes::from(contents));
            resp.headers_mut()
                .insert(header::CONTENT_TYPE, content_type_for(path));
            resp
        }
        Err(e) => io_error_response(path, e),
    }
}

async fn list_directory(dir: &Path) -> io::Result<String> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await?.is_dir() {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort();

    let mut html = String::from(
        "<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n",
    );
    for name in entries {
        html.push_str(&format!(
            "<a href=\"{}\">{}</a>\n",
            utf8_percent_encode(&name, HREF),
            escape_html(&name)
        ));
    }
    html.push_str("</pre>\n");
    Ok(html)
}

fn io_error_response(path: &Path, e: io::Error) -> HttpResponse {
    match e.kind() {
        io::ErrorKind::NotFound => response::text(StatusCode::NOT_FOUND, "404 page not found"),
        io::ErrorKind::PermissionDenied => {
            response::text(StatusCode::FORBIDDEN, "403 Forbidden")
        }
        _ => {
            warn!(path = %path.display(), error = %e, "Failed to serve static path");
            response::text(
                StatusCode::INTERNAL_SERVER_ERROR,
                "500 Internal Server Error",
            )
        }
    }
}

/// Guessed MIME type, with a UTF-8 charset for text types
fn content_type_for(path: &Path) -> HeaderValue {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let is_text = mime.type_() == mime_guess::mime::TEXT;
    let value = if is_text && mime.get_param("charset").is_none() {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.to_string()
    };
    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
