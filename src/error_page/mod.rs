//! Error page module
//!
//! Maps a classified resolution failure to a render-ready [`ErrorPageModel`]
//! and renders it as a self-contained HTML document.

mod render;

pub use render::{render_page, PageStyle};

use crate::link::SiteLink;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Classified failure, one page per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NoContentFound,
    InvalidVersion,
    UnknownName,
    AuthFailed,
}

impl ErrorKind {
    pub const ALL: [Self; 5] = [
        Self::BadRequest,
        Self::NoContentFound,
        Self::InvalidVersion,
        Self::UnknownName,
        Self::AuthFailed,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::NoContentFound => "NO_CONTENT_FOUND",
            Self::InvalidVersion => "INVALID_VERSION",
            Self::UnknownName => "UNKNOWN_NAME",
            Self::AuthFailed => "AUTH_FAILED",
        }
    }

    /// Status sent when per-kind status codes are enabled
    pub const fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::AuthFailed => 401,
            Self::NoContentFound | Self::InvalidVersion | Self::UnknownName => 404,
        }
    }

    /// Kinds whose page cannot be rendered without the offending address
    pub const fn requires_address(self) -> bool {
        matches!(
            self,
            Self::BadRequest | Self::InvalidVersion | Self::UnknownName
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown error page kind '{0}'")]
pub struct UnknownErrorKind(pub String);

impl FromStr for ErrorKind {
    type Err = UnknownErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownErrorKind(s.to_string()))
    }
}

/// What the page knows about the failed request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Address as requested
    pub address: String,
    /// Public name of the address, when it parsed as a site-link
    pub host: Option<String>,
    /// Explicitly requested version
    pub requested_version: Option<String>,
    /// Link to the latest version of the site
    pub latest_version: Option<String>,
}

impl ErrorContext {
    pub fn for_link(link: &SiteLink) -> Self {
        Self {
            address: link.address().to_string(),
            host: Some(link.host().to_string()),
            requested_version: link.version().map(ToString::to_string),
            latest_version: None,
        }
    }

    /// Context for a raw address that may not be a valid site-link
    pub fn for_address(address: &str) -> Self {
        match SiteLink::parse(address) {
            Ok(link) => Self::for_link(&link),
            Err(_) => Self {
                address: address.to_string(),
                ..Self::default()
            },
        }
    }

    #[must_use]
    pub fn with_latest_version(mut self, latest: impl Into<String>) -> Self {
        self.latest_version = Some(latest.into());
        self
    }

    #[must_use]
    pub fn with_requested_version(mut self, version: impl Into<String>) -> Self {
        self.requested_version = Some(version.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallToAction {
    pub text: String,
    pub target_url: String,
}

/// Fully resolved page content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPageModel {
    pub super_title: &'static str,
    pub title: &'static str,
    pub message: String,
    pub call_to_action: Option<CallToAction>,
}

impl ErrorPageModel {
    /// Build the page for `kind`
    ///
    /// `register_url` is the registration flow link the public name is appended to.
    pub fn build(kind: ErrorKind, ctx: &ErrorContext, register_url: &str) -> Self {
        match kind {
            ErrorKind::AuthFailed => Self {
                super_title: "Authorisation Failed",
                title: "Could not authorise on the network",
                message: "There was a problem with network authentication.".to_string(),
                call_to_action: None,
            },
            ErrorKind::BadRequest => Self {
                super_title: "Bad Request",
                title: "Invalid address",
                message: format!(
                    "{} is not a valid URL, please check it and try again.",
                    ctx.address
                ),
                call_to_action: None,
            },
            ErrorKind::NoContentFound => Self {
                super_title: "404",
                title: "Not Found",
                message:
                    "Nothing has been published at this address, no page or file can be found"
                        .to_string(),
                call_to_action: None,
            },
            ErrorKind::InvalidVersion => invalid_version_page(ctx),
            ErrorKind::UnknownName => {
                let name = ctx.host.as_deref().unwrap_or(&ctx.address);
                Self {
                    super_title: "Unknown Public Name",
                    title: "Nobody owns this address yet",
                    message: format!("{} has not been registered yet.", ctx.address),
                    call_to_action: Some(CallToAction {
                        text: format!("Register {}", ctx.address),
                        target_url: format!("{register_url}{name}"),
                    }),
                }
            }
        }
    }
}

fn invalid_version_page(ctx: &ErrorContext) -> ErrorPageModel {
    let bad_version = ctx.requested_version.as_deref().unwrap_or(&ctx.address);
    let mut message = format!("Version {bad_version} does not exist.");
    if let Some(latest) = &ctx.latest_version {
        message.push_str(&format!(" {latest} is the latest"));
    }

    ErrorPageModel {
        super_title: "Invalid version",
        title: "This page version does not exist",
        message,
        call_to_action: Some(CallToAction {
            text: "Go to latest".to_string(),
            target_url: ctx
                .latest_version
                .clone()
                .unwrap_or_else(|| ctx.address.clone()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTER: &str = "safe-browser://my-sites?register=";

    fn ctx(address: &str) -> ErrorContext {
        ErrorContext::for_address(address)
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ErrorKind::ALL {
            assert_eq!(kind.as_str().parse::<ErrorKind>(), Ok(kind));
        }
        assert_eq!("unknown_name".parse::<ErrorKind>(), Ok(ErrorKind::UnknownName));
        assert!("TEAPOT".parse::<ErrorKind>().is_err());
    }

    #[test]
    fn test_bad_request_echoes_address() {
        let page = ErrorPageModel::build(ErrorKind::BadRequest, &ctx("safe://%%bad"), REGISTER);
        assert_eq!(page.super_title, "Bad Request");
        assert_eq!(page.title, "Invalid address");
        assert_eq!(
            page.message,
            "safe://%%bad is not a valid URL, please check it and try again."
        );
        assert!(page.call_to_action.is_none());
    }

    #[test]
    fn test_no_content_found_has_no_cta() {
        let page = ErrorPageModel::build(ErrorKind::NoContentFound, &ctx("safe://x"), REGISTER);
        assert_eq!(page.super_title, "404");
        assert_eq!(page.title, "Not Found");
        assert!(page.call_to_action.is_none());
    }

    #[test]
    fn test_auth_failed() {
        let page = ErrorPageModel::build(ErrorKind::AuthFailed, &ctx("safe://x"), REGISTER);
        assert_eq!(page.super_title, "Authorisation Failed");
        assert_eq!(page.title, "Could not authorise on the network");
        assert!(page.call_to_action.is_none());
    }

    #[test]
    fn test_invalid_version_points_to_latest() {
        let context = ctx("safe://mysite/old/page").with_latest_version("safe://mysite/");
        let page = ErrorPageModel::build(ErrorKind::InvalidVersion, &context, REGISTER);
        assert_eq!(page.title, "This page version does not exist");
        assert_eq!(
            page.message,
            "Version safe://mysite/old/page does not exist. safe://mysite/ is the latest"
        );
        assert_eq!(
            page.call_to_action,
            Some(CallToAction {
                text: "Go to latest".to_string(),
                target_url: "safe://mysite/".to_string(),
            })
        );
    }

    #[test]
    fn test_invalid_version_prefers_requested_version() {
        let context = ctx("safe://mysite/page?v=7");
        let page = ErrorPageModel::build(ErrorKind::InvalidVersion, &context, REGISTER);
        assert_eq!(page.message, "Version 7 does not exist.");
    }

    #[test]
    fn test_unknown_name_registers_host() {
        let page = ErrorPageModel::build(ErrorKind::UnknownName, &ctx("safe://newname/blog"), REGISTER);
        assert_eq!(page.super_title, "Unknown Public Name");
        assert_eq!(page.message, "safe://newname/blog has not been registered yet.");
        let cta = page.call_to_action.unwrap();
        assert_eq!(cta.text, "Register safe://newname/blog");
        assert_eq!(cta.target_url, "safe-browser://my-sites?register=newname");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::BadRequest.status_code(), 400);
        assert_eq!(ErrorKind::AuthFailed.status_code(), 401);
        assert_eq!(ErrorKind::UnknownName.status_code(), 404);
    }
}
