//! Request processing errors
//!
//! Everything that can stop a site-link request before a response is built.
//! None of these leave the request handler: each is turned into a 416 or an
//! error page there.

use crate::fetch::FetchError;
use crate::http::range::RangeError;
use crate::link::LinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("request handler panicked: {0}")]
    Panic(String),
}

impl HandlerError {
    /// Build from a caught panic payload
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Panic(message)
    }
}
