//! multipart/form-data framing around a streamed document.
//!
//! The body is assembled as `prefix + payload + trailer + suffix`:
//! - `prefix` opens the single file part (`name="data"`, `filename=<name>`);
//! - the payload bytes are whatever the host stream delivers;
//! - `trailer` carries every metadata field except `name` as a text part;
//! - `suffix` closes the body.
//!
//! Values are written as plain text without escaping.

mod boundary;

pub use boundary::{Boundary, BoundaryScanner};

use thiserror::Error;

use crate::metadata::DocumentMetadata;

const CRLF: &str = "\r\n";

/// Why a session's metadata could not be framed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("document name is empty")]
    EmptyName,
    /// CR, LF or `"` in a value that lands inside a part header line.
    #[error("{what} contains a character not allowed in a part header: {value:?}")]
    HeaderInjection { what: &'static str, value: String },
    #[error("field {key:?} contains the multipart boundary")]
    BoundaryInField { key: String },
    #[error("payload contains the multipart boundary")]
    BoundaryInPayload,
}

/// Framing segments for one session, built once when the stream starts.
#[derive(Debug, Clone)]
pub struct MultipartFrame {
    boundary: Boundary,
    prefix: Vec<u8>,
    trailer: Vec<u8>,
    suffix: Vec<u8>,
}

impl MultipartFrame {
    pub fn build(meta: &DocumentMetadata, boundary: &Boundary) -> Result<Self, FrameError> {
        if meta.name().is_empty() {
            return Err(FrameError::EmptyName);
        }
        check_header_value("document name", meta.name())?;
        check_header_value("mime type", meta.mime_type())?;

        let delimiter = boundary.delimiter();

        let disposition = format!(
            "Content-Disposition: form-data; name=\"data\"; filename=\"{}\"",
            meta.name()
        );
        let content_type = format!("Content-Type: {}", meta.mime_type());
        let prefix = [delimiter.as_str(), disposition.as_str(), content_type.as_str(), "", ""]
            .join(CRLF);

        let mut trailer = String::new();
        for (key, value) in meta.fields() {
            check_header_value("field name", key)?;
            if value.contains(&delimiter) {
                return Err(FrameError::BoundaryInField {
                    key: key.to_string(),
                });
            }
            trailer.push_str(CRLF);
            trailer.push_str(&delimiter);
            trailer.push_str(CRLF);
            trailer.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"",
                key
            ));
            trailer.push_str(CRLF);
            trailer.push_str(CRLF);
            trailer.push_str(value);
        }

        let suffix = format!("{CRLF}{delimiter}--{CRLF}");

        Ok(Self {
            boundary: boundary.clone(),
            prefix: prefix.into_bytes(),
            trailer: trailer.into_bytes(),
            suffix: suffix.into_bytes(),
        })
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn trailer(&self) -> &[u8] {
        &self.trailer
    }

    pub fn suffix(&self) -> &[u8] {
        &self.suffix
    }

    /// Total body length for a payload of `payload_len` bytes.
    pub fn framed_len(&self, payload_len: u64) -> u64 {
        (self.prefix.len() + self.trailer.len() + self.suffix.len()) as u64 + payload_len
    }
}

/// Frame a complete in-memory payload. The stream tee builds the same body
/// incrementally; this is for callers that already hold the whole document.
pub fn encode(
    meta: &DocumentMetadata,
    boundary: &Boundary,
    payload: &[u8],
) -> Result<Vec<u8>, FrameError> {
    let frame = MultipartFrame::build(meta, boundary)?;
    let mut scanner = boundary.scanner();
    scanner.feed(payload);
    if scanner.found() {
        return Err(FrameError::BoundaryInPayload);
    }
    let mut body = Vec::with_capacity(frame.framed_len(payload.len() as u64) as usize);
    body.extend_from_slice(frame.prefix());
    body.extend_from_slice(payload);
    body.extend_from_slice(frame.trailer());
    body.extend_from_slice(frame.suffix());
    Ok(body)
}

fn check_header_value(what: &'static str, value: &str) -> Result<(), FrameError> {
    if value.contains(['\r', '\n', '"']) {
        return Err(FrameError::HeaderInjection {
            what,
            value: value.to_string(),
        });
    }
    Ok(())
}
