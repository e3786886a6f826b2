//! Site-link addressing module
//!
//! Parses `safe://host/path?v=N` addresses into an immutable [`SiteLink`].

use std::fmt;
use thiserror::Error;
use url::Url;

/// URI scheme served by the gateway
pub const SCHEME: &str = "safe";

/// Query parameter carrying an explicit content version
const VERSION_PARAM: &str = "v";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("'{address}' is not a valid URL: {message}")]
    Invalid { address: String, message: String },

    #[error("'{address}' does not use the {SCHEME}:// scheme")]
    UnsupportedScheme { address: String },

    #[error("'{address}' has no public name")]
    MissingHost { address: String },
}

/// Content-addressed link: host (public name), path and optional query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLink {
    address: String,
    host: String,
    path: String,
    query: Option<String>,
    version: Option<String>,
}

impl SiteLink {
    /// Parse a site-link address
    ///
    /// A single trailing slash is ignored and an empty path means `/`.
    pub fn parse(address: &str) -> Result<Self, LinkError> {
        let address = address.trim();
        let address = address.strip_suffix('/').unwrap_or(address);

        let url = Url::parse(address).map_err(|e| LinkError::Invalid {
            address: address.to_string(),
            message: e.to_string(),
        })?;

        if url.scheme() != SCHEME {
            return Err(LinkError::UnsupportedScheme {
                address: address.to_string(),
            });
        }

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => {
                return Err(LinkError::MissingHost {
                    address: address.to_string(),
                })
            }
        };

        let path = if url.path().is_empty() {
            "/".to_string()
        } else {
            url.path().to_string()
        };

        let version = url
            .query_pairs()
            .find(|(key, _)| key == VERSION_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|v| !v.is_empty());

        Ok(Self {
            address: address.to_string(),
            host,
            path,
            query: url.query().map(ToString::to_string),
            version,
        })
    }

    /// Address as it was requested (trailing slash removed)
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Explicitly requested version (`?v=`), if any
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Same public name with the path reset to `/` and no query
    pub fn root_link(&self) -> Self {
        let address = format!("{SCHEME}://{}", self.host);
        Self {
            address,
            host: self.host.clone(),
            path: "/".to_string(),
            query: None,
            version: None,
        }
    }
}

impl fmt::Display for SiteLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}://{}{}", self.host, self.path)?;
        if let Some(query) = self.query() {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_link() {
        let link = SiteLink::parse("safe://mysite/docs/page.html?v=3").unwrap();
        assert_eq!(link.host(), "mysite");
        assert_eq!(link.path(), "/docs/page.html");
        assert_eq!(link.query(), Some("v=3"));
        assert_eq!(link.version(), Some("3"));
        assert!(!link.is_root());
        assert_eq!(link.to_string(), "safe://mysite/docs/page.html?v=3");
    }

    #[test]
    fn test_bare_host_is_root() {
        for address in ["safe://mysite", "safe://mysite/"] {
            let link = SiteLink::parse(address).unwrap();
            assert_eq!(link.path(), "/");
            assert!(link.is_root());
            assert_eq!(link.address(), "safe://mysite");
        }
    }

    #[test]
    fn test_root_link_drops_path_and_query() {
        let link = SiteLink::parse("safe://mysite/a/b?v=2&x=1").unwrap();
        let root = link.root_link();
        assert_eq!(root.host(), "mysite");
        assert_eq!(root.path(), "/");
        assert_eq!(root.query(), None);
        assert_eq!(root.version(), None);
        assert_eq!(root.to_string(), "safe://mysite/");
    }

    #[test]
    fn test_query_without_version() {
        let link = SiteLink::parse("safe://mysite/page?lang=en").unwrap();
        assert_eq!(link.version(), None);
        assert_eq!(link.query(), Some("lang=en"));
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            SiteLink::parse("https://example.com/"),
            Err(LinkError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            SiteLink::parse("not a url"),
            Err(LinkError::Invalid { .. })
        ));
    }
}
