//! Upload client: one POST of the framed body per session, then decode.
//!
//! `Uploader` is the blocking transport seam; the archiver runs it on tokio's
//! blocking pool so a slow archive never holds up the interception path.
//! No retries: uploads are best-effort enrichment.

mod body;
mod client;
mod error;
mod response;

pub use body::{BodyReader, UploadBody};
pub use client::CurlUploader;
pub use error::UploadError;
pub use response::{decode_reply, ArchiveReply, ArchiveResponse, CaseUpdate, UploadResult};

use crate::multipart::Boundary;

/// Everything needed to POST one session's document.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub session: u64,
    pub boundary: Boundary,
    pub body: UploadBody,
}

/// Transport for a framed upload. Blocking; implementations must be shareable across tasks.
pub trait Uploader: Send + Sync {
    fn post(&self, request: &UploadRequest) -> Result<ArchiveReply, UploadError>;
}

/// Post and decode in one step.
pub fn upload(uploader: &dyn Uploader, request: &UploadRequest) -> UploadResult {
    let reply = uploader.post(request)?;
    decode_reply(&reply)
}
