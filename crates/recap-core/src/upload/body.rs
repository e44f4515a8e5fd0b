//! Framed upload body held as the ordered list of chunks the tee accumulated.

use std::io::{self, Read};

/// Complete multipart body: prefix, payload chunks, trailer, suffix, in order.
#[derive(Debug, Clone, Default)]
pub struct UploadBody {
    chunks: Vec<Vec<u8>>,
    len: u64,
}

impl UploadBody {
    pub(crate) fn from_chunks(chunks: Vec<Vec<u8>>, len: u64) -> Self {
        Self { chunks, len }
    }

    /// Exact byte length; sent as `Content-Length`.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sequential reader over all chunks (curl pulls the body through this).
    pub fn reader(&self) -> BodyReader<'_> {
        BodyReader {
            chunks: &self.chunks,
            index: 0,
            pos: 0,
        }
    }

    /// Copy into one contiguous buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len as usize);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }
}

pub struct BodyReader<'a> {
    chunks: &'a [Vec<u8>],
    index: usize,
    pos: usize,
}

impl Read for BodyReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            let Some(chunk) = self.chunks.get(self.index) else {
                break;
            };
            let remaining = &chunk[self.pos..];
            if remaining.is_empty() {
                self.index += 1;
                self.pos = 0;
                continue;
            }
            let n = remaining.len().min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&remaining[..n]);
            written += n;
            self.pos += n;
        }
        Ok(written)
    }
}
