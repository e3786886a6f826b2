//! Directory-backed fetch collaborator
//!
//! Serves site-links from a local tree laid out as
//! `<root_dir>/<host>/<version>/<path>`, where unversioned links read from the
//! configured `latest_dir`. Useful for running the gateway without a network
//! client and as a reference implementation of the fetch contract.

use super::{ContentFetcher, FetchError, ResolvedPayload};
use crate::config::{RangesConfig, SitesConfig};
use crate::http::{byteranges, mime};
use crate::http::range::RangeSet;
use crate::link::SiteLink;
use crate::logger;
use async_trait::async_trait;
use hyper::body::Bytes;
use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct DirectoryFetcher {
    root_dir: PathBuf,
    index_files: Vec<String>,
    latest_dir: String,
    boundary: String,
}

impl DirectoryFetcher {
    pub fn new(sites: &SitesConfig, ranges: &RangesConfig) -> Self {
        Self {
            root_dir: PathBuf::from(&sites.root_dir),
            index_files: sites.index_files.clone(),
            latest_dir: sites.latest_dir.clone(),
            boundary: ranges.multipart_boundary.clone(),
        }
    }

    /// Locate the file backing `link`, refusing anything outside the site directory
    async fn locate(&self, link: &SiteLink) -> Result<PathBuf, FetchError> {
        let version_dir = link.version().unwrap_or(&self.latest_dir);
        if !is_plain_segment(link.host()) || !is_plain_segment(version_dir) {
            return Err(FetchError::NotFound(link.to_string()));
        }

        let site_dir = self.root_dir.join(link.host()).join(version_dir);
        let site_dir_canonical = fs::canonicalize(&site_dir)
            .await
            .map_err(|e| map_io_error(link, &e))?;

        let relative_path = decode_path(link)?;
        let mut file_path = site_dir_canonical.join(&relative_path);

        // Directories resolve through their index file
        if relative_path.is_empty() || fs::metadata(&file_path).await.is_ok_and(|m| m.is_dir()) {
            for index_file in &self.index_files {
                let index_path = file_path.join(index_file);
                if fs::metadata(&index_path).await.is_ok_and(|m| m.is_file()) {
                    file_path = index_path;
                    break;
                }
            }
        }

        let file_path_canonical = fs::canonicalize(&file_path)
            .await
            .map_err(|e| map_io_error(link, &e))?;
        if !file_path_canonical.starts_with(&site_dir_canonical) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {link} -> {}",
                file_path_canonical.display()
            ));
            return Err(FetchError::NotFound(link.to_string()));
        }

        if !fs::metadata(&file_path_canonical)
            .await
            .map_err(|e| map_io_error(link, &e))?
            .is_file()
        {
            return Err(FetchError::NotFound(link.to_string()));
        }

        Ok(file_path_canonical)
    }
}

#[async_trait]
impl ContentFetcher for DirectoryFetcher {
    async fn fetch(
        &self,
        link: &SiteLink,
        ranges: Option<&RangeSet>,
    ) -> Result<ResolvedPayload, FetchError> {
        let path = self.locate(link).await?;
        let content = fs::read(&path).await.map_err(|e| {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            map_io_error(link, &e)
        })?;

        build_payload(
            Bytes::from(content),
            mime::content_type_for(&path),
            ranges,
            &self.boundary,
        )
    }
}

/// Shape a loaded file according to the requested ranges
fn build_payload(
    content: Bytes,
    content_type: &str,
    ranges: Option<&RangeSet>,
    boundary: &str,
) -> Result<ResolvedPayload, FetchError> {
    let total_len = content.len() as u64;

    let Some(ranges) = ranges else {
        return Ok(ResolvedPayload::new(content)
            .with_header("Content-Type", content_type)
            .with_header("Accept-Ranges", "bytes"));
    };

    if ranges.iter().any(|r| r.start >= total_len) {
        return Err(FetchError::RangeNotSatisfiable {
            total_len: Some(total_len),
        });
    }

    if ranges.is_multipart() {
        // Parts are cut by the response builder from the full body
        return Ok(ResolvedPayload::new(content)
            .with_header("Content-Type", byteranges::multipart_content_type(boundary))
            .with_header("Accept-Ranges", "bytes"));
    }

    let range = ranges.ranges()[0];
    let end = range.end_position(total_len);
    let (Ok(start_idx), Ok(end_idx)) = (usize::try_from(range.start), usize::try_from(end)) else {
        return Err(FetchError::RangeNotSatisfiable {
            total_len: Some(total_len),
        });
    };

    Ok(ResolvedPayload::new(content.slice(start_idx..=end_idx))
        .with_status(206)
        .with_header("Content-Type", content_type)
        .with_header("Content-Range", range.content_range(total_len))
        .with_header("Accept-Ranges", "bytes"))
}

/// The link path with percent-escapes decoded and the leading `/` removed
///
/// Every decoded segment must be plain; empty segments from repeated or
/// trailing slashes are skipped.
fn decode_path(link: &SiteLink) -> Result<String, FetchError> {
    let decoded = percent_decode_str(link.path())
        .decode_utf8()
        .map_err(|_| FetchError::NotFound(link.to_string()))?;
    let relative_path = decoded.trim_start_matches('/');
    if relative_path.contains('\0')
        || !relative_path
            .split('/')
            .filter(|s| !s.is_empty())
            .all(is_plain_segment)
    {
        logger::log_warning(&format!("Rejected path of {link}"));
        return Err(FetchError::NotFound(link.to_string()));
    }
    Ok(relative_path.to_string())
}

/// A single path component with no separators or parent references
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
        && Path::new(segment).components().count() == 1
}

fn map_io_error(link: &SiteLink, error: &io::Error) -> FetchError {
    match error.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
            FetchError::NotFound(link.to_string())
        }
        io::ErrorKind::PermissionDenied => FetchError::AuthFailed(error.to_string()),
        _ => FetchError::Transport(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::range::parse_range_header;

    fn fetcher_for(root: &Path) -> DirectoryFetcher {
        DirectoryFetcher::new(
            &SitesConfig {
                root_dir: root.to_string_lossy().into_owned(),
                index_files: vec!["index.html".to_string()],
                latest_dir: "latest".to_string(),
            },
            &RangesConfig {
                multipart_boundary: "test-boundary".to_string(),
            },
        )
    }

    fn site_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let latest = dir.path().join("mysite").join("latest");
        std::fs::create_dir_all(latest.join("docs")).unwrap();
        std::fs::write(latest.join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(latest.join("docs").join("data.txt"), "0123456789").unwrap();
        let v2 = dir.path().join("mysite").join("2");
        std::fs::create_dir_all(&v2).unwrap();
        std::fs::write(v2.join("index.html"), "<h1>v2</h1>").unwrap();
        dir
    }

    fn link(address: &str) -> SiteLink {
        SiteLink::parse(address).unwrap()
    }

    #[tokio::test]
    async fn test_root_resolves_index() {
        let dir = site_tree();
        let payload = fetcher_for(dir.path())
            .fetch(&link("safe://mysite"), None)
            .await
            .unwrap();
        assert_eq!(payload.body, Bytes::from("<h1>home</h1>"));
        assert_eq!(payload.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(payload.status, None);
    }

    #[tokio::test]
    async fn test_explicit_version_directory() {
        let dir = site_tree();
        let payload = fetcher_for(dir.path())
            .fetch(&link("safe://mysite/?v=2"), None)
            .await
            .unwrap();
        assert_eq!(payload.body, Bytes::from("<h1>v2</h1>"));
    }

    #[tokio::test]
    async fn test_missing_content_is_not_found() {
        let dir = site_tree();
        let fetcher = fetcher_for(dir.path());
        for address in [
            "safe://mysite/nope.html",
            "safe://othersite",
            "safe://mysite?v=9",
            "safe://mysite/docs/data.txt/extra",
        ] {
            let err = fetcher.fetch(&link(address), None).await.unwrap_err();
            assert!(matches!(err, FetchError::NotFound(_)), "{address}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_traversal_is_not_found() {
        let dir = site_tree();
        std::fs::write(dir.path().join("secret.txt"), "secret").unwrap();
        let err = fetcher_for(dir.path())
            .fetch(&link("safe://mysite/?v=.."), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_percent_encoded_path_is_decoded() {
        let dir = site_tree();
        let latest = dir.path().join("mysite").join("latest");
        std::fs::write(latest.join("a b.html"), "spaced").unwrap();
        std::fs::write(latest.join("caf\u{e9}.txt"), "accent").unwrap();
        let fetcher = fetcher_for(dir.path());

        let payload = fetcher.fetch(&link("safe://mysite/a%20b.html"), None).await.unwrap();
        assert_eq!(payload.body, Bytes::from("spaced"));
        let payload = fetcher.fetch(&link("safe://mysite/caf%C3%A9.txt"), None).await.unwrap();
        assert_eq!(payload.body, Bytes::from("accent"));
    }

    #[tokio::test]
    async fn test_encoded_traversal_is_not_found() {
        let dir = site_tree();
        std::fs::write(dir.path().join("mysite").join("secret.txt"), "secret").unwrap();
        let fetcher = fetcher_for(dir.path());
        for address in [
            "safe://mysite/%2e%2e/secret.txt",
            "safe://mysite/docs%2F..%2F..%2Fsecret.txt",
            "safe://mysite/%FF.txt",
            "safe://mysite/a%00.txt",
        ] {
            let err = fetcher.fetch(&link(address), None).await.unwrap_err();
            assert!(matches!(err, FetchError::NotFound(_)), "{address}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_single_range_is_sliced() {
        let dir = site_tree();
        let ranges = parse_range_header("bytes=2-5").unwrap();
        let payload = fetcher_for(dir.path())
            .fetch(&link("safe://mysite/docs/data.txt"), Some(&ranges))
            .await
            .unwrap();
        assert_eq!(payload.status, Some(206));
        assert_eq!(payload.body, Bytes::from("2345"));
        assert_eq!(payload.header("Content-Range"), Some("bytes 2-5/10"));
    }

    #[tokio::test]
    async fn test_multi_range_returns_full_body() {
        let dir = site_tree();
        let ranges = parse_range_header("bytes=0-1,8-").unwrap();
        let payload = fetcher_for(dir.path())
            .fetch(&link("safe://mysite/docs/data.txt"), Some(&ranges))
            .await
            .unwrap();
        assert_eq!(payload.body.len(), 10);
        assert_eq!(
            payload.header("Content-Type"),
            Some("multipart/byteranges; boundary=test-boundary")
        );
    }

    #[tokio::test]
    async fn test_range_past_end_not_satisfiable() {
        let dir = site_tree();
        let ranges = parse_range_header("bytes=0-1,50-60").unwrap();
        let err = fetcher_for(dir.path())
            .fetch(&link("safe://mysite/docs/data.txt"), Some(&ranges))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::RangeNotSatisfiable {
                total_len: Some(10)
            }
        );
    }
}
