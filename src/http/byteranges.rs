//! multipart/byteranges body building module
//!
//! Cuts one part per requested range out of a full representation, in the
//! order the ranges were requested (RFC 7233 appendix A layout).

use crate::http::range::{ByteRange, RangeSet};
use hyper::body::Bytes;

const MULTIPART_BYTERANGES: &str = "multipart/byteranges";

/// `Content-Type` value announcing a multipart/byteranges body
pub fn multipart_content_type(boundary: &str) -> String {
    format!("{MULTIPART_BYTERANGES}; boundary={boundary}")
}

/// Extract the boundary token from a `multipart/byteranges` content type
///
/// Returns None for other media types or when no boundary parameter is present.
pub fn boundary_from_content_type(content_type: &str) -> Option<&str> {
    let mut params = content_type.split(';');
    let media_type = params.next()?.trim();
    if !media_type.eq_ignore_ascii_case(MULTIPART_BYTERANGES) {
        return None;
    }

    params.find_map(|param| {
        let (name, value) = param.trim().split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then_some(value)
    })
}

/// Build the multipart body for `ranges` over the full `content`
///
/// Each part is a delimiter line, its `Content-Range` header, a blank line and
/// the slice; the body ends with the closing delimiter. Ranges reaching past
/// the content are clamped to it. Ranges starting at or past the end have no
/// bytes to send and get no part.
pub fn build_multipart_body(content: &Bytes, ranges: &RangeSet, boundary: &str) -> Bytes {
    let total_len = content.len() as u64;
    let mut out = Vec::with_capacity(content.len() + ranges.len() * (boundary.len() + 64));

    for range in ranges.iter().filter(|r| r.start < total_len) {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        out.extend_from_slice(
            format!("Content-Range: {}\r\n\r\n", range.content_range(total_len)).as_bytes(),
        );
        out.extend_from_slice(&slice_range(content, range));
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Bytes::from(out)
}

/// Bytes covered by `range`, clamped to the content
fn slice_range(content: &Bytes, range: &ByteRange) -> Bytes {
    let len = content.len();
    let start = usize::try_from(range.start).unwrap_or(usize::MAX).min(len);
    let end = range
        .end
        .map_or(len, |e| usize::try_from(e).map_or(len, |e| e.saturating_add(1)))
        .min(len);

    if start >= end {
        return Bytes::new();
    }
    content.slice(start..end)
}
