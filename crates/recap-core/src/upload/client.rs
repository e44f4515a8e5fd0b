//! Archive upload over libcurl.

use std::io::Read;
use std::time::Duration;

use crate::config::RecapConfig;

use super::{ArchiveReply, UploadError, UploadRequest, Uploader};

/// Posts framed bodies to a fixed archive endpoint.
#[derive(Debug, Clone)]
pub struct CurlUploader {
    url: String,
    connect_timeout: Duration,
    timeout: Duration,
    user_agent: Option<String>,
}

impl CurlUploader {
    pub fn from_config(cfg: &RecapConfig) -> Self {
        Self {
            url: cfg.upload_url.clone(),
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
            user_agent: cfg.user_agent.clone(),
        }
    }
}

impl Uploader for CurlUploader {
    fn post(&self, request: &UploadRequest) -> Result<ArchiveReply, UploadError> {
        tracing::debug!(
            session = request.session,
            url = %self.url,
            bytes = request.body.len(),
            "archive POST"
        );
        let mut easy = curl::easy::Easy::new();
        easy.url(&self.url)?;
        easy.post(true)?;
        // Sets Content-Length to the exact framed size.
        easy.post_field_size(request.body.len())?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        if let Some(agent) = &self.user_agent {
            easy.useragent(agent)?;
        }

        let mut list = curl::easy::List::new();
        list.append(&format!("Content-Type: {}", request.boundary.content_type()))?;
        // No 100-continue round trip; the body is already complete.
        list.append("Expect:")?;
        easy.http_headers(list)?;

        let mut reader = request.body.reader();
        let mut response = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.read_function(|into| {
                reader
                    .read(into)
                    .map_err(|_| curl::easy::ReadError::Abort)
            })?;
            transfer.write_function(|data| {
                response.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        tracing::debug!(
            session = request.session,
            status,
            bytes = response.len(),
            "archive replied"
        );
        Ok(ArchiveReply {
            status,
            body: response,
        })
    }
}
