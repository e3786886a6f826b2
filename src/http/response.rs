//! HTTP response building module
//!
//! Builders for every response the gateway sends: resolved content (full,
//! single range, multipart ranges), rendered error pages and plain status
//! responses.

use crate::fetch::ResolvedPayload;
use crate::http::byteranges;
use crate::http::range::{RangeRequestKind, RangeSet};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::response::Builder;
use hyper::Response;

/// Build the response for resolved content
///
/// - no range: payload status (200 unless the fetcher said otherwise), body as-is
/// - single range: 206, body as-is (the fetcher already sliced it)
/// - multipart: 206, one part per requested range cut from the full body
pub fn build_content_response(
    payload: ResolvedPayload,
    ranges: Option<&RangeSet>,
    default_boundary: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let kind = RangeRequestKind::of(ranges);

    let (status, content_type, body) = match (kind, ranges) {
        (RangeRequestKind::Multipart, Some(ranges)) => {
            let boundary = payload
                .header("Content-Type")
                .and_then(byteranges::boundary_from_content_type)
                .unwrap_or(default_boundary)
                .to_string();
            let body = byteranges::build_multipart_body(&payload.body, ranges, &boundary);
            (
                206,
                Some(byteranges::multipart_content_type(&boundary)),
                body,
            )
        }
        (RangeRequestKind::Single, _) => (206, None, payload.body.clone()),
        _ => (payload.status.unwrap_or(200), None, payload.body.clone()),
    };

    let mut builder = Response::builder().status(status);
    for (name, value) in &payload.headers {
        let replaced = name.eq_ignore_ascii_case("Content-Length")
            || (content_type.is_some()
                && (name.eq_ignore_ascii_case("Content-Type")
                    || name.eq_ignore_ascii_case("Content-Range")));
        if !replaced {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }
    if let Some(content_type) = content_type {
        builder = builder.header("Content-Type", content_type);
    }

    finish(builder, body, is_head, &status.to_string())
}

/// Build a rendered error page response
pub fn build_error_page_response(page: String, status: u16, is_head: bool) -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(status)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Cache-Control", "no-store");

    finish(builder, Bytes::from(page), is_head, "error page")
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(total_len: Option<u64>) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(416)
        .header("Content-Type", "text/plain");
    if let Some(total_len) = total_len {
        builder = builder.header("Content-Range", format!("bytes */{total_len}"));
    }

    finish(
        builder,
        Bytes::from("Requested Range Not Satisfiable"),
        false,
        "416",
    )
}

/// Build 400 Bad Request response
pub fn build_400_response() -> Response<Full<Bytes>> {
    plain_text(400, "400 Bad Request")
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    plain_text(404, "404 Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(405)
        .header("Content-Type", "text/plain")
        .header("Allow", "GET, HEAD, OPTIONS");
    finish(builder, Bytes::from("405 Method Not Allowed"), false, "405")
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    plain_text(413, "413 Payload Too Large")
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(enable_cors: bool) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(204)
        .header("Allow", "GET, HEAD, OPTIONS");

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET, HEAD, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type, Range")
            .header("Access-Control-Max-Age", "86400");
    }

    finish(builder, Bytes::new(), false, "OPTIONS")
}

/// Build health check response
pub fn build_health_response(status: &str) -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(200)
        .header("Content-Type", "text/plain")
        .header("Cache-Control", "no-cache");
    finish(builder, Bytes::from(status.to_string()), false, "health")
}

fn plain_text(status: u16, text: &'static str) -> Response<Full<Bytes>> {
    let builder = Response::builder()
        .status(status)
        .header("Content-Type", "text/plain");
    finish(builder, Bytes::from(text), false, &status.to_string())
}

/// Attach `Content-Length` and the body (empty for HEAD)
fn finish(builder: Builder, body: Bytes, is_head: bool, what: &str) -> Response<Full<Bytes>> {
    let content_length = body.len();
    let body = if is_head { Bytes::new() } else { body };

    builder
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(what, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(what: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {what} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::range::parse_range_header;
    use http_body_util::BodyExt;

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn payload() -> ResolvedPayload {
        ResolvedPayload::new("0123456789")
            .with_header("Content-Type", "text/plain")
            .with_header("X-Site", "mysite")
    }

    #[tokio::test]
    async fn test_full_body_passes_headers_through() {
        let resp = build_content_response(payload(), None, "b", false);
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["X-Site"], "mysite");
        assert_eq!(resp.headers()["Content-Type"], "text/plain");
        assert_eq!(resp.headers()["Content-Length"], "10");
        assert_eq!(body_string(resp).await, "0123456789");
    }

    #[tokio::test]
    async fn test_single_range_is_206_without_reslicing() {
        let ranges = parse_range_header("bytes=2-3").unwrap();
        let sliced = ResolvedPayload::new("23")
            .with_status(206)
            .with_header("Content-Range", "bytes 2-3/10");
        let resp = build_content_response(sliced, Some(&ranges), "b", false);
        assert_eq!(resp.status(), 206);
        assert_eq!(resp.headers()["Content-Range"], "bytes 2-3/10");
        assert_eq!(body_string(resp).await, "23");
    }

    #[tokio::test]
    async fn test_multipart_uses_payload_boundary() {
        let ranges = parse_range_header("bytes=0-1,4-5,8-9").unwrap();
        let full = ResolvedPayload::new("0123456789")
            .with_header("Content-Type", "multipart/byteranges; boundary=abc");
        let resp = build_content_response(full, Some(&ranges), "default", false);
        assert_eq!(resp.status(), 206);
        assert_eq!(
            resp.headers()["Content-Type"],
            "multipart/byteranges; boundary=abc"
        );
        let body = body_string(resp).await;
        assert_eq!(body.matches("--abc\r\n").count(), 3);
        let first = body.find("bytes 0-1/10").unwrap();
        let second = body.find("bytes 4-5/10").unwrap();
        let third = body.find("bytes 8-9/10").unwrap();
        assert!(first < second && second < third);
        assert!(body.ends_with("--abc--\r\n"));
    }

    #[tokio::test]
    async fn test_multipart_falls_back_to_default_boundary() {
        let ranges = parse_range_header("bytes=0-0,9-").unwrap();
        let resp = build_content_response(payload(), Some(&ranges), "dflt", false);
        assert_eq!(
            resp.headers()["Content-Type"],
            "multipart/byteranges; boundary=dflt"
        );
        assert_eq!(resp.headers().get_all("Content-Type").iter().count(), 1);
        assert!(body_string(resp).await.starts_with("--dflt\r\n"));
    }

    #[tokio::test]
    async fn test_head_keeps_length_drops_body() {
        let resp = build_content_response(payload(), None, "b", true);
        assert_eq!(resp.headers()["Content-Length"], "10");
        assert_eq!(body_string(resp).await, "");
    }

    #[tokio::test]
    async fn test_416_response() {
        let resp = build_416_response(Some(10));
        assert_eq!(resp.status(), 416);
        assert_eq!(resp.headers()["Content-Range"], "bytes */10");
        assert_eq!(body_string(resp).await, "Requested Range Not Satisfiable");
    }
}
