//! HTTP protocol layer module
//!
//! Range parsing, multipart/byteranges bodies, content types and response
//! builders. Knows nothing about site-links or resolution.

pub mod byteranges;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use response::{
    build_400_response, build_404_response, build_405_response, build_413_response,
    build_health_response, build_options_response,
};
