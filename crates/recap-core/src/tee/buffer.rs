//! Append-only accumulation buffer for the upload copy of a stream.

use thiserror::Error;

use crate::upload::UploadBody;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("document exceeds upload limit of {limit} bytes")]
    LimitExceeded { limit: u64 },
    #[error("could not allocate {requested} bytes for the upload copy")]
    OutOfMemory { requested: usize },
}

/// Ordered chunks, never read back until the stream completes.
/// Once an append fails, the contents are dropped and every later append is a no-op.
#[derive(Debug)]
pub struct AccumulationBuffer {
    chunks: Vec<Vec<u8>>,
    len: u64,
    limit: u64,
    overflowed: bool,
}

impl AccumulationBuffer {
    pub fn with_limit(limit: u64) -> Self {
        Self {
            chunks: Vec::new(),
            len: 0,
            limit,
            overflowed: false,
        }
    }

    pub fn append(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        if self.overflowed {
            return Ok(());
        }
        if bytes.is_empty() {
            return Ok(());
        }
        if self.len + bytes.len() as u64 > self.limit {
            self.overflow();
            return Err(BufferError::LimitExceeded { limit: self.limit });
        }
        let mut chunk = Vec::new();
        if chunk.try_reserve_exact(bytes.len()).is_err() || self.chunks.try_reserve(1).is_err() {
            self.overflow();
            return Err(BufferError::OutOfMemory {
                requested: bytes.len(),
            });
        }
        chunk.extend_from_slice(bytes);
        self.chunks.push(chunk);
        self.len += bytes.len() as u64;
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Hand the accumulated chunks over as an upload body, leaving the buffer empty.
    pub fn take_body(&mut self) -> UploadBody {
        let chunks = std::mem::take(&mut self.chunks);
        let len = std::mem::replace(&mut self.len, 0);
        UploadBody::from_chunks(chunks, len)
    }

    fn overflow(&mut self) {
        self.overflowed = true;
        self.chunks = Vec::new();
        self.len = 0;
    }
}
