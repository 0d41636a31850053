//! Request routing
//!
//! | Path       | GET/HEAD          | POST                     | other |
//! |------------|-------------------|--------------------------|-------|
//! | `/upload`  | upload form (GET) | store (`upload` route)   | 501   |
//! | `/receive` | 501               | store (`receive` route)  | 501   |
//! | anything   | static file       | 501                      | 501   |

use super::response::{self, HttpResponse};
use super::{static_files, AppState};
use crate::config::UploadRoute;
use crate::metrics;
use crate::upload;
use http_body_util::BodyExt;
use hyper::body::{Body, Incoming};
use hyper::header;
use hyper::{Method, Request, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Built-in upload form, used when no form file is configured
const UPLOAD_FORM: &str = include_str!("../../static/upload.html");

const FORM_ACTION_PLACEHOLDER: &str = "{{ACTION}}";

/// Handle one HTTP request
pub(crate) async fn handle_request(
    req: Request<Incoming>,
    peer: SocketAddr,
    state: Arc<AppState>,
) -> HttpResponse {
    let method = req.method().clone();
    info!(
        "\"{}\" request from \"{}\" for path \"{}\"",
        method,
        peer,
        req.uri()
    );

    let route = state.config.server.upload_route;
    let path = req.uri().path().to_string();

    match path.as_str() {
        "/upload" => {
            metrics::record_request("upload", method.as_str());
            match method {
                Method::GET => upload_form(&state).await,
                Method::POST if route == UploadRoute::Upload => receive_upload(req, &state).await,
                _ => unsupported(&method),
            }
        }
        "/receive" if route == UploadRoute::Receive => {
            metrics::record_request("receive", method.as_str());
            match method {
                Method::POST => receive_upload(req, &state).await,
                _ => unsupported(&method),
            }
        }
        _ => {
            metrics::record_request("static", method.as_str());
            match method {
                Method::GET => static_files::serve(&state.config.storage.root, &path).await,
                Method::HEAD => {
                    let resp = static_files::serve(&state.config.storage.root, &path).await;
                    strip_body(resp)
                }
                _ => unsupported(&method),
            }
        }
    }
}

async fn upload_form(state: &AppState) -> HttpResponse {
    let template = match &state.config.storage.upload_form {
        Some(path) => match tokio::fs::read_to_string(path).await {
            Ok(template) => template,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read upload form");
                return response::text(StatusCode::NOT_FOUND, "404 page not found");
            }
        },
        None => UPLOAD_FORM.to_string(),
    };

    let action = state.config.server.upload_route.path();
    response::html(
        StatusCode::OK,
        template.replace(FORM_ACTION_PLACEHOLDER, action),
    )
}

async fn receive_upload(req: Request<Incoming>, state: &AppState) -> HttpResponse {
    // Held until the upload is stored.
    let _permit = match &state.upload_slots {
        Some(slots) => Arc::clone(slots).acquire_owned().await.ok(),
        None => None,
    };

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = req.into_body().into_data_stream();

    match upload::receive(&state.pipeline, content_type.as_deref(), body).await {
        Ok(stored) => response::html(
            StatusCode::OK,
            format!(
                "<html><pre>File uploaded successfully: <a href=\"{0}\">{0}</a></pre></html>\n",
                stored.served_path
            ),
        ),
        Err(e) => {
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            response::text(status, format!("{}\n", e.client_message()))
        }
    }
}

fn unsupported(method: &Method) -> HttpResponse {
    info!("{} method has not yet been implemented", method);
    response::not_implemented(method)
}

/// Drop the body of a GET response to answer a HEAD, keeping the length
fn strip_body(resp: HttpResponse) -> HttpResponse {
    let (mut parts, body) = resp.into_parts();
    if let Some(len) = body.size_hint().exact() {
        parts.headers.insert(header::CONTENT_LENGTH, len.into());
    }
    HttpResponse::from_parts(parts, Default::default())
}
