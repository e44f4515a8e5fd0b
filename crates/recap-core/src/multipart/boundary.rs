//! Per-session multipart boundary and an incremental payload scanner.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Boundary token for one multipart body (without the leading `--`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary(String);

impl Boundary {
    /// Timestamp plus 128 random bits; at most 70 chars as RFC 2046 requires.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Self(format!(
            "----recap-{}-{}",
            millis,
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// Use a fixed token (tests, reproducible `recap encode` output).
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `--<token>` marker that opens every part.
    pub fn delimiter(&self) -> String {
        format!("--{}", self.0)
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.0)
    }

    pub fn scanner(&self) -> BoundaryScanner {
        BoundaryScanner::new(self.delimiter().into_bytes())
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Looks for the boundary delimiter in payload bytes fed chunk by chunk,
/// including occurrences split across two chunks.
#[derive(Debug, Clone)]
pub struct BoundaryScanner {
    needle: Vec<u8>,
    tail: Vec<u8>,
    found: bool,
}

impl BoundaryScanner {
    fn new(needle: Vec<u8>) -> Self {
        Self {
            needle,
            tail: Vec::new(),
            found: false,
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        if self.found || chunk.is_empty() || self.needle.is_empty() {
            return;
        }
        let keep = self.needle.len() - 1;

        // Seam: end of the previous chunks + start of this one.
        let mut seam = self.tail.clone();
        seam.extend_from_slice(&chunk[..chunk.len().min(keep)]);
        if contains(&seam, &self.needle) || contains(chunk, &self.needle) {
            self.found = true;
            self.tail.clear();
            return;
        }

        if chunk.len() >= keep {
            self.tail.clear();
            self.tail.extend_from_slice(&chunk[chunk.len() - keep..]);
        } else {
            self.tail.extend_from_slice(chunk);
            let excess = self.tail.len().saturating_sub(keep);
            self.tail.drain(..excess);
        }
    }

    pub fn found(&self) -> bool {
        self.found
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
