//! Fetch collaborator boundary
//!
//! The gateway does not speak the storage network protocol itself. Content is
//! obtained through a [`ContentFetcher`]; failures come back as a structured
//! [`FetchError`] so resolution never depends on error message text.

pub mod directory;

pub use directory::DirectoryFetcher;

use crate::http::range::RangeSet;
use crate::link::SiteLink;
use async_trait::async_trait;
use hyper::body::Bytes;
use thiserror::Error;

/// Fetch failure reported by the collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Nothing resolves at this exact link
    #[error("content not found at {0}")]
    NotFound(String),

    /// Requested ranges cannot be served from the content
    #[error("requested range not satisfiable")]
    RangeNotSatisfiable { total_len: Option<u64> },

    /// The network refused our credentials
    #[error("authorisation failed: {0}")]
    AuthFailed(String),

    /// Any other transport or storage failure
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result of a successful fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPayload {
    /// Status suggested by the collaborator (e.g. 206 for a sliced body)
    pub status: Option<u16>,
    /// Response headers, in the order they should be sent
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResolvedPayload {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            status: None,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Source of site-link content
///
/// Implementations honour `ranges` where they can: a single range should come
/// back sliced with a `Content-Range` header, several ranges come back as the
/// full body with a `multipart/byteranges` content type.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(
        &self,
        link: &SiteLink,
        ranges: Option<&RangeSet>,
    ) -> Result<ResolvedPayload, FetchError>;
}
