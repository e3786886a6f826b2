//! Request handler module
//!
//! Request routing dispatch, site-link serving and error page previews.

pub mod preview;
pub mod router;
pub mod site_link;

// Re-export main entry point
pub use router::handle_request;
