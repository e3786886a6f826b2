//! Site-link request handling
//!
//! Runs one `/safe://...` request through range parsing, resolution and
//! response building. Every failure is turned into a response here: a 416
//! for unsatisfiable ranges, otherwise a rendered error page.

use crate::config::AppState;
use crate::error::HandlerError;
use crate::error_page::{render_page, ErrorContext, ErrorKind, ErrorPageModel, PageStyle};
use crate::fetch::FetchError;
use crate::handler::router::RequestContext;
use crate::http::range::{self, RangeRequestKind};
use crate::http::response;
use crate::link::SiteLink;
use crate::logger;
use crate::resolver::{ResolutionOutcome, Resolver};
use futures::FutureExt;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::panic::AssertUnwindSafe;

/// What a site-link request ended up serving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    Content(RangeRequestKind),
    ErrorPage(ErrorKind),
    RangeNotSatisfiable,
}

impl Served {
    /// Short label for the access log
    pub const fn label(self) -> &'static str {
        match self {
            Self::Content(RangeRequestKind::None) => "resolved",
            Self::Content(RangeRequestKind::Single) => "resolved_range",
            Self::Content(RangeRequestKind::Multipart) => "resolved_multipart",
            Self::ErrorPage(kind) => kind.as_str(),
            Self::RangeNotSatisfiable => "range_not_satisfiable",
        }
    }
}

/// Serve a site-link request
///
/// Never fails: faults, including panics inside the fetcher, become a
/// `BAD_REQUEST` page echoing the requested address.
pub async fn serve_site_link(
    ctx: &RequestContext<'_>,
    state: &AppState,
) -> (Response<Full<Bytes>>, Served) {
    let address = ctx.address();
    logger::log_debug(&format!("Handling site-link request: {address}"));

    let result = AssertUnwindSafe(resolve_and_build(ctx, state, &address))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload.as_ref())));

    match result {
        Ok(served) => served,
        Err(HandlerError::Fetch(FetchError::RangeNotSatisfiable { total_len })) => {
            logger::log_warning(&format!(
                "Range not satisfiable for {address}: {}",
                ctx.range_header.as_deref().unwrap_or("-")
            ));
            (
                response::build_416_response(total_len),
                Served::RangeNotSatisfiable,
            )
        }
        Err(e) => {
            logger::log_error(&format!("Failed to serve {address}: {e}"));
            error_page(
                ErrorKind::BadRequest,
                &ErrorContext::for_address(&address),
                state,
                ctx.is_head,
            )
        }
    }
}

/// Parse, resolve and build; errors are left to the caller to classify
async fn resolve_and_build(
    ctx: &RequestContext<'_>,
    state: &AppState,
    address: &str,
) -> Result<(Response<Full<Bytes>>, Served), HandlerError> {
    let ranges = ctx
        .range_header
        .as_deref()
        .map(range::parse_range_header)
        .transpose()?;
    let link = SiteLink::parse(address)?;

    let outcome = Resolver::new(state.fetcher.as_ref())
        .resolve(&link, ranges.as_ref())
        .await;

    match outcome {
        Ok(ResolutionOutcome::Success(payload)) => {
            let kind = RangeRequestKind::of(ranges.as_ref());
            let resp = response::build_content_response(
                payload,
                ranges.as_ref(),
                &state.config.ranges.multipart_boundary,
                ctx.is_head,
            );
            Ok((resp, Served::Content(kind)))
        }
        Ok(ResolutionOutcome::Failure(kind, error_ctx)) => {
            Ok(error_page(kind, &error_ctx, state, ctx.is_head))
        }
        Err(FetchError::AuthFailed(message)) => {
            logger::log_warning(&format!("Authorisation failed for {link}: {message}"));
            Ok(error_page(
                ErrorKind::AuthFailed,
                &ErrorContext::for_link(&link),
                state,
                ctx.is_head,
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Render the page for `kind` and wrap it in a response
pub fn error_page(
    kind: ErrorKind,
    error_ctx: &ErrorContext,
    state: &AppState,
    is_head: bool,
) -> (Response<Full<Bytes>>, Served) {
    let settings = &state.config.error_pages;
    let model = ErrorPageModel::build(kind, error_ctx, &settings.register_url);
    let page = render_page(&model, &PageStyle::default());
    logger::log_debug(&format!("Constructing error page of type: {kind}"));

    let status = if settings.use_status_codes {
        kind.status_code()
    } else {
        200
    };

    (
        response::build_error_page_response(page, status, is_head),
        Served::ErrorPage(kind),
    )
}
