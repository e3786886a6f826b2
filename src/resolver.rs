//! Site-link resolution
//!
//! Fetches a link and, when nothing is found at that exact link, runs the
//! fallback chain that tells missing content, a bad version and an
//! unregistered name apart.

use crate::error_page::{ErrorContext, ErrorKind};
use crate::fetch::{ContentFetcher, FetchError, ResolvedPayload};
use crate::http::range::RangeSet;
use crate::link::{SiteLink, SCHEME};
use crate::logger;

/// Result of resolving one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Success(ResolvedPayload),
    Failure(ErrorKind, ErrorContext),
}

pub struct Resolver<'a> {
    fetcher: &'a dyn ContentFetcher,
}

impl<'a> Resolver<'a> {
    pub fn new(fetcher: &'a dyn ContentFetcher) -> Self {
        Self { fetcher }
    }

    /// Resolve `link`, classifying not-found failures
    ///
    /// Only a [`FetchError::NotFound`] from the link itself starts the fallback
    /// chain; any other error from that fetch is returned unchanged. Every
    /// failure of the root probe is classified as an unknown name.
    /// At most two fetches are made: the link itself, then its root link.
    pub async fn resolve(
        &self,
        link: &SiteLink,
        ranges: Option<&RangeSet>,
    ) -> Result<ResolutionOutcome, FetchError> {
        match self.fetcher.fetch(link, ranges).await {
            Ok(payload) => {
                logger::log_debug(&format!("Resolved {link} ({} bytes)", payload.body.len()));
                Ok(ResolutionOutcome::Success(payload))
            }
            Err(FetchError::NotFound(message)) => {
                logger::log_warning(&format!("Resolution of {link} failed: {message}"));
                self.classify_not_found(link).await
            }
            Err(e) => Err(e),
        }
    }

    async fn classify_not_found(&self, link: &SiteLink) -> Result<ResolutionOutcome, FetchError> {
        // An explicitly versioned link that resolves to nothing is reported as missing content
        if link.version().is_some() {
            return Ok(no_content(link));
        }

        if link.is_root() {
            return Ok(no_content(link));
        }

        let root = link.root_link();
        match self.fetcher.fetch(&root, None).await {
            Ok(_) => {
                let latest = format!("{SCHEME}://{}{}", root.host(), root.path());
                logger::log_warning(&format!(
                    "{link} does not resolve but {root} does, reporting invalid version"
                ));
                Ok(ResolutionOutcome::Failure(
                    ErrorKind::InvalidVersion,
                    ErrorContext::for_link(link).with_latest_version(latest),
                ))
            }
            // Any root failure, not only not-found, is reported as an unknown name
            Err(e) => {
                logger::log_warning(&format!("Attempted to source root of {link}: {e}"));
                Ok(ResolutionOutcome::Failure(
                    ErrorKind::UnknownName,
                    ErrorContext::for_link(link),
                ))
            }
        }
    }
}

fn no_content(link: &SiteLink) -> ResolutionOutcome {
    ResolutionOutcome::Failure(ErrorKind::NoContentFound, ErrorContext::for_link(link))
}
