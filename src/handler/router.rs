//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation,
//! route matching, dispatching and the access log line.

use crate::config::AppState;
use crate::handler::preview;
use crate::handler::site_link::{self, Served};
use crate::http;
use crate::link::SCHEME;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body as _, Bytes};
use hyper::header::{self, HeaderValue};
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub range_header: Option<String>,
}

impl RequestContext<'_> {
    /// The requested site-link: the target without its leading `/`
    pub fn address(&self) -> String {
        let link = self.path.strip_prefix('/').unwrap_or(self.path);
        match self.query {
            Some(query) => format!("{link}?{query}"),
            None => link.to_string(),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read, so any body type is accepted.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let req = req.map(|_| ());

    let (mut response, served) = dispatch(&req, &state).await;
    set_server_header(&mut response, &state.config.http.server_name);

    if state.config.logging.access_log {
        let mut entry = AccessLogEntry::new(
            remote_addr.ip().to_string(),
            req.method().to_string(),
            req.uri().path().to_string(),
        );
        entry.query = req.uri().query().map(ToString::to_string);
        entry.http_version = version_label(req.version()).to_string();
        entry.range = header_string(&req, header::RANGE);
        entry.referer = header_string(&req, header::REFERER);
        entry.user_agent = header_string(&req, header::USER_AGENT);
        entry.status = response.status().as_u16();
        entry.outcome = served.map(|s| s.label().to_string());
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn dispatch(
    req: &Request<()>,
    state: &AppState,
) -> (Response<Full<Bytes>>, Option<Served>) {
    // 1. Check HTTP method
    if let Some(resp) = check_http_method(req.method(), state.config.http.enable_cors) {
        return (resp, None);
    }

    // 2. Check body size
    if let Some(resp) = check_body_size(req, state.config.http.max_body_size) {
        return (resp, None);
    }

    // 3. Log headers if enabled
    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    // 4. Extract what the routes need
    let ctx = RequestContext {
        path: req.uri().path(),
        query: req.uri().query(),
        is_head: req.method() == Method::HEAD,
        range_header: header_string(req, header::RANGE),
    };

    route_request(&ctx, state).await
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match method {
        &Method::GET | &Method::HEAD => None,
        &Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(req: &Request<()>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get(header::CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// Route request based on path and configuration
async fn route_request(
    ctx: &RequestContext<'_>,
    state: &AppState,
) -> (Response<Full<Bytes>>, Option<Served>) {
    let config = &state.config;

    // 0. Health check endpoints (highest priority, always fast)
    let health = &config.routes.health;
    if health.enabled && (ctx.path == health.liveness_path || ctx.path == health.readiness_path) {
        return (http::build_health_response("ok"), None);
    }

    // 1. Error page previews
    if config.error_pages.preview_enabled {
        if let Some(kind_name) = ctx.path.strip_prefix(config.error_pages.preview_prefix.as_str()) {
            return preview::serve_preview(ctx, state, kind_name);
        }
    }

    // 2. Site-links: /safe://...
    if ctx
        .path
        .strip_prefix('/')
        .and_then(|p| p.strip_prefix(SCHEME))
        .is_some_and(|rest| rest.starts_with(':'))
    {
        let (resp, served) = site_link::serve_site_link(ctx, state).await;
        return (resp, Some(served));
    }

    logger::log_debug(&format!("No route for {}", ctx.path));
    (http::build_404_response(), None)
}

fn set_server_header(response: &mut Response<Full<Bytes>>, server_name: &str) {
    match HeaderValue::from_str(server_name) {
        Ok(value) => {
            response.headers_mut().insert(header::SERVER, value);
        }
        Err(e) => logger::log_warning(&format!("Invalid server_name '{server_name}': {e}")),
    }
}

fn header_string(req: &Request<()>, name: header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fetch::{FetchError, ResolvedPayload};
    use crate::resolver::tests::FakeFetcher;
    use http_body_util::BodyExt;

    fn state() -> Arc<AppState> {
        let mut config = Config::load_from("does-not-exist/config").unwrap();
        config.logging.access_log = false;
        let fetcher = FakeFetcher::default()
            .with(
                "safe://site/page",
                Ok(ResolvedPayload::new("hello").with_header("Content-Type", "text/plain")),
            )
            .with(
                "safe://site/",
                Err(FetchError::Transport("unreachable".to_string())),
            );
        Arc::new(AppState::with_fetcher(&config, Arc::new(fetcher)))
    }

    async fn send(method: &str, uri: &str) -> Response<Full<Bytes>> {
        let req = Request::builder().method(method).uri(uri).body(()).unwrap();
        handle_request(req, state(), "127.0.0.1:40000".parse().unwrap())
            .await
            .unwrap()
    }

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_address_strips_leading_slash() {
        let ctx = RequestContext {
            path: "/safe://site/a",
            query: Some("v=2"),
            is_head: false,
            range_header: None,
        };
        assert_eq!(ctx.address(), "safe://site/a?v=2");
    }

    #[tokio::test]
    async fn test_site_link_is_served_with_server_header() {
        let resp = send("GET", "/safe://site/page").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[header::SERVER], "sitelink-gateway/0.1");
        assert_eq!(body_string(resp).await, "hello");
    }

    #[tokio::test]
    async fn test_head_keeps_length_without_body() {
        let resp = send("HEAD", "/safe://site/page").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "5");
        assert_eq!(body_string(resp).await, "");
    }

    #[tokio::test]
    async fn test_unreachable_root_is_unknown_name_page() {
        let resp = send("GET", "/safe://site/missing").await;
        assert_eq!(resp.status(), 200);
        let body = body_string(resp).await;
        assert!(body.contains("Nobody owns this address yet"));
        assert!(body.contains("safe-browser://my-sites?register=site"));
    }

    #[tokio::test]
    async fn test_method_checks() {
        assert_eq!(send("POST", "/safe://site/page").await.status(), 405);
        assert_eq!(send("OPTIONS", "/safe://site/page").await.status(), 204);
    }

    #[tokio::test]
    async fn test_health_and_unknown_routes() {
        let resp = send("GET", "/healthz").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_string(resp).await, "ok");
        assert_eq!(send("GET", "/index.html").await.status(), 404);
        assert_eq!(send("GET", "/safety/page").await.status(), 404);
    }

    #[tokio::test]
    async fn test_preview_route() {
        let resp = send("GET", "/_errors/AUTH_FAILED").await;
        assert_eq!(resp.status(), 200);
        assert!(body_string(resp).await.contains("Authorisation Failed"));
        assert_eq!(send("GET", "/_errors/NOPE").await.status(), 404);
    }
}
