//! HTTP Range request parsing module
//!
//! Parses `bytes=` range headers into an ordered set of byte intervals.
//! Ranges are kept exactly as requested: no merging, no de-duplication and
//! no validation against the content length, which is not known yet.

use std::fmt;
use thiserror::Error;

/// Range header parse failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Header does not match `bytes=<start>-[<end>](,<start>-[<end>])*`
    #[error("malformed range header '{0}'")]
    Malformed(String),
}

/// A single requested byte interval (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Start byte position
    pub start: u64,
    /// End byte position, None means until end of content
    pub end: Option<u64>,
}

impl ByteRange {
    /// Calculate actual end position (considering content length)
    #[inline]
    pub fn end_position(&self, total_len: u64) -> u64 {
        let last = total_len.saturating_sub(1);
        self.end.map_or(last, |end| end.min(last))
    }

    /// `Content-Range` value for this interval against a representation of `total_len` bytes
    pub fn content_range(&self, total_len: u64) -> String {
        format!(
            "bytes {}-{}/{total_len}",
            self.start,
            self.end_position(total_len)
        )
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{end}", self.start),
            None => write!(f, "{}-", self.start),
        }
    }
}

/// Kind of range request, derived from the number of parsed ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequestKind {
    /// No Range header, full body
    None,
    /// Exactly one range
    Single,
    /// More than one range, served as multipart/byteranges
    Multipart,
}

impl RangeRequestKind {
    pub fn of(ranges: Option<&RangeSet>) -> Self {
        match ranges {
            Some(set) if set.is_multipart() => Self::Multipart,
            Some(set) if !set.is_empty() => Self::Single,
            _ => Self::None,
        }
    }
}

/// Ordered, non-empty sequence of requested byte ranges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<ByteRange>,
}

impl RangeSet {
    pub fn ranges(&self) -> &[ByteRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the set holds no ranges
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn is_multipart(&self) -> bool {
        self.ranges.len() > 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ByteRange> {
        self.ranges.iter()
    }
}

impl<'a> IntoIterator for &'a RangeSet {
    type Item = &'a ByteRange;
    type IntoIter = std::slice::Iter<'a, ByteRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes=")?;
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}

/// Parse HTTP Range header (bytes unit, one or more ranges)
///
/// Supported formats:
/// - `bytes=start-end` - Specific range
/// - `bytes=start-` - From start to end of content
/// - `bytes=0-99,200-299` - Several ranges, kept in order
///
/// Suffix ranges (`bytes=-500`) are not part of the accepted grammar.
pub fn parse_range_header(header: &str) -> Result<RangeSet, RangeError> {
    let malformed = || RangeError::Malformed(header.to_string());

    let range_list = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(malformed)?;

    let ranges = range_list
        .split(',')
        .map(|part| parse_single_range(part.trim()).ok_or_else(malformed))
        .collect::<Result<Vec<_>, _>>()?;

    if ranges.is_empty() {
        return Err(malformed());
    }

    Ok(RangeSet { ranges })
}

/// Parse one `start-end` or `start-` element
fn parse_single_range(part: &str) -> Option<ByteRange> {
    let (start_str, end_str) = part.split_once('-')?;
    let start = parse_position(start_str.trim())?;

    let end_str = end_str.trim();
    let end = if end_str.is_empty() {
        None // Open-ended range
    } else {
        let e = parse_position(end_str)?;
        if e < start {
            return None;
        }
        Some(e)
    };

    Some(ByteRange { start, end })
}

/// Digits only: rejects signs and empty strings that `u64::from_str` would let through or mis-report
fn parse_position(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
