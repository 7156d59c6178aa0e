//! Single byte-range requests (`Range: bytes=...`).

use crate::{Result, StorageError};

/// A parsed single byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=a-b`, inclusive.
    FromTo(u64, u64),
    /// `bytes=a-`
    From(u64),
    /// `bytes=-n`, the last n bytes.
    Suffix(u64),
}

impl ByteRange {
    /// Parse a `Range` header value.
    ///
    /// Returns `None` for anything other than one well-formed byte range;
    /// callers then serve the whole file.
    pub fn parse(header: &str) -> Option<Self> {
        let value = header.trim().strip_prefix("bytes=")?.trim();
        if value.contains(',') {
            return None;
        }

        let (start, end) = value.split_once('-')?;
        let (start, end) = (start.trim(), end.trim());

        match (start.is_empty(), end.is_empty()) {
            (true, true) => None,
            (true, false) => end.parse().ok().map(ByteRange::Suffix),
            (false, true) => start.parse().ok().map(ByteRange::From),
            (false, false) => {
                let start: u64 = start.parse().ok()?;
                let end: u64 = end.parse().ok()?;
                (start <= end).then_some(ByteRange::FromTo(start, end))
            }
        }
    }

    /// Resolve against a file length into inclusive `(start, end)` offsets.
    pub fn resolve(&self, len: u64) -> Result<(u64, u64)> {
        let unsatisfiable = StorageError::RangeNotSatisfiable { len };
        if len == 0 {
            return Err(unsatisfiable);
        }

        match *self {
            ByteRange::FromTo(start, _) | ByteRange::From(start) if start >= len => {
                Err(unsatisfiable)
            }
            ByteRange::FromTo(start, end) => Ok((start, end.min(len - 1))),
            ByteRange::From(start) => Ok((start, len - 1)),
            ByteRange::Suffix(0) => Err(unsatisfiable),
            ByteRange::Suffix(n) => Ok((len - n.min(len), len - 1)),
        }
    }
}
