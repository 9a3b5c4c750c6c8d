use bfs_types::status_code::StatusCode;
use bfs_types::{make_error_msg, Result};

/// Inclusive byte range. `end == None` means through the end of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    pub const WHOLE: ByteRange = ByteRange { start: 0, end: None };

    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Parse a `Range` header value: `bytes=<start>-[<end>]`. An empty
    /// header is the whole file.
    pub fn parse(header: &str) -> Result<Self> {
        let header = header.trim();
        if header.is_empty() {
            return Ok(Self::WHOLE);
        }
        let bad = || make_error_msg(StatusCode::INVALID_ARG, format!("invalid range {:?}", header));
        let Some(spec) = header.strip_prefix("bytes=") else {
            return bad();
        };
        let Some((start, end)) = spec.split_once('-') else {
            return bad();
        };
        let Ok(start) = start.trim().parse::<u64>() else {
            return bad();
        };
        let end = match end.trim() {
            "" => None,
            e => match e.parse::<u64>() {
                Ok(e) if e >= start => Some(e),
                _ => return bad(),
            },
        };
        Ok(Self { start, end })
    }

    /// Reject a bounded range that ends before it starts.
    pub fn validate(&self) -> Result<()> {
        match self.end {
            Some(end) if end < self.start => make_error_msg(
                StatusCode::INVALID_ARG,
                format!("range {}-{} ends before it starts", self.start, end),
            ),
            _ => Ok(()),
        }
    }

    /// Number of bytes requested, when bounded. Saturates at `u64::MAX`;
    /// an inverted range counts as empty.
    pub fn requested_len(&self) -> Option<u64> {
        self.end.map(|end| match end.checked_sub(self.start) {
            Some(span) => span.saturating_add(1),
            None => 0,
        })
    }

    /// Bound the range by a file of `size` bytes. Open or past-the-end ends
    /// are pulled in to the last byte. An empty file yields the open range
    /// at 0.
    pub fn clamp(self, size: u64) -> Result<Self> {
        if size == 0 {
            if self.start == 0 {
                return Ok(Self::WHOLE);
            }
            return make_error_msg(StatusCode::INVALID_ARG, "range starts past end of empty file");
        }
        let last = size - 1;
        let end = self.end.map_or(last, |e| e.min(last));
        if self.start > end {
            return make_error_msg(
                StatusCode::INVALID_ARG,
                format!("range starts at {} past end {}", self.start, last),
            );
        }
        Ok(Self::new(self.start, end))
    }

    /// Shift the range down by `offset`.
    pub fn relative_to(self, offset: u64) -> Self {
        Self {
            start: self.start - offset,
            end: self.end.map(|e| e - offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(ByteRange::parse("").unwrap(), ByteRange::WHOLE);
        assert_eq!(ByteRange::parse("bytes=0-99").unwrap(), ByteRange::new(0, 99));
        assert_eq!(
            ByteRange::parse("bytes=100-").unwrap(),
            ByteRange { start: 100, end: None }
        );
        assert!(ByteRange::parse("bytes=5-4").is_err());
        assert!(ByteRange::parse("items=0-1").is_err());
        assert!(ByteRange::parse("bytes=a-1").is_err());
        assert!(ByteRange::parse("bytes=1").is_err());
        assert!(ByteRange::parse("bytes=-5").is_err());
    }

    #[test]
    fn test_len() {
        assert_eq!(ByteRange::new(0, 9).requested_len(), Some(10));
        assert_eq!(ByteRange::WHOLE.requested_len(), None);
        assert_eq!(ByteRange::new(0, u64::MAX).requested_len(), Some(u64::MAX));
        assert_eq!(ByteRange::new(10, 5).requested_len(), Some(0));
    }

    #[test]
    fn test_validate() {
        assert!(ByteRange::new(5, 5).validate().is_ok());
        assert!(ByteRange { start: 9, end: None }.validate().is_ok());
        assert_eq!(
            ByteRange::new(10, 5).validate().unwrap_err().code(),
            StatusCode::INVALID_ARG
        );
        let max = ByteRange::parse("bytes=0-18446744073709551615").unwrap();
        assert_eq!(max, ByteRange::new(0, u64::MAX));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(ByteRange::WHOLE.clamp(10).unwrap(), ByteRange::new(0, 9));
        assert_eq!(ByteRange::new(2, 100).clamp(10).unwrap(), ByteRange::new(2, 9));
        assert_eq!(ByteRange::new(2, 5).clamp(10).unwrap(), ByteRange::new(2, 5));
        assert!(ByteRange::new(10, 12).clamp(10).is_err());
        assert_eq!(ByteRange::WHOLE.clamp(0).unwrap(), ByteRange::WHOLE);
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(ByteRange::new(110, 120).relative_to(100), ByteRange::new(10, 20));
    }
}
