//! Error page preview route
//!
//! `GET <preview_prefix><KIND>?address=..&version=..&latest=..` renders the
//! page for `KIND` without touching the fetcher, so the pages can be checked
//! in a browser.

use crate::config::AppState;
use crate::error_page::{ErrorContext, ErrorKind};
use crate::handler::router::RequestContext;
use crate::handler::site_link::{self, Served};
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

/// Query parameters accepted by the preview route
#[derive(Debug, Default, PartialEq, Eq)]
struct PreviewParams {
    address: Option<String>,
    version: Option<String>,
    latest: Option<String>,
}

impl PreviewParams {
    fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned()).filter(|v| !v.is_empty());
            match key.as_ref() {
                "address" => params.address = value,
                "version" => params.version = value,
                "latest" => params.latest = value,
                _ => {}
            }
        }
        params
    }
}

/// Serve a preview page; `kind_name` is the path segment after the prefix
///
/// Unknown kinds get a 404, kinds that need an address get a 400 without one.
pub fn serve_preview(
    ctx: &RequestContext<'_>,
    state: &AppState,
    kind_name: &str,
) -> (Response<Full<Bytes>>, Option<Served>) {
    let kind = match kind_name.parse::<ErrorKind>() {
        Ok(kind) => kind,
        Err(e) => {
            logger::log_warning(&format!("Preview requested for {e}"));
            return (http::build_404_response(), None);
        }
    };

    let params = PreviewParams::from_query(ctx.query);
    let error_ctx = match params.address.as_deref() {
        Some(address) => ErrorContext::for_address(address),
        None if kind.requires_address() => {
            logger::log_warning(&format!("Preview of {kind} needs an address parameter"));
            return (http::build_400_response(), None);
        }
        None => ErrorContext::default(),
    };
    let error_ctx = match params.version {
        Some(version) => error_ctx.with_requested_version(version),
        None => error_ctx,
    };
    let error_ctx = match params.latest {
        Some(latest) => error_ctx.with_latest_version(latest),
        None => error_ctx,
    };

    let (resp, served) = site_link::error_page(kind, &error_ctx, state, ctx.is_head);
    (resp, Some(served))
}
