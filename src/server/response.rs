//! Response builders shared by the handlers

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Method, Response, StatusCode};

/// Response type produced by every handler
pub type HttpResponse = Response<Full<Bytes>>;

/// Raw bytes with no content type
pub fn bytes(status: StatusCode, body: Bytes) -> HttpResponse {
    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;
    resp
}

/// `text/plain` response
pub fn text(status: StatusCode, body: impl Into<String>) -> HttpResponse {
    with_content_type(
        bytes(status, Bytes::from(body.into())),
        "text/plain; charset=utf-8",
    )
}

/// `text/html` response
pub fn html(status: StatusCode, body: impl Into<String>) -> HttpResponse {
    with_content_type(
        bytes(status, Bytes::from(body.into())),
        "text/html; charset=utf-8",
    )
}

/// 301 to `location`
pub fn redirect(location: &str) -> HttpResponse {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut resp = bytes(StatusCode::MOVED_PERMANENTLY, Bytes::new());
            resp.headers_mut().insert(header::LOCATION, value);
            resp
        }
        Err(_) => text(StatusCode::BAD_REQUEST, "400 bad request"),
    }
}

/// 501 naming the method that is not supported
pub fn not_implemented(method: &Method) -> HttpResponse {
    text(
        StatusCode::NOT_IMPLEMENTED,
        format!("{} method has not yet been implemented\n", method),
    )
}

fn with_content_type(mut resp: HttpResponse, content_type: &'static str) -> HttpResponse {
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}
