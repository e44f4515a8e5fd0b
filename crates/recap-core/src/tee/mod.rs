//! Stream tee: forwards a host stream to its original listener while keeping
//! a framed copy for upload.
//!
//! The tee implements the same listener contract it forwards to. Each event
//! is delivered to the sink no matter what happens to the upload copy; the
//! copy only decides whether an upload is handed off when the stream stops.
//!
//! State machine:
//!
//! ```text
//! Idle --on_start--> Streaming --on_stop--> Completed
//! ```
//!
//! Events that do not fit the state (data before start, a second start or
//! stop) are still forwarded to the sink and logged.

mod buffer;

pub use buffer::{AccumulationBuffer, BufferError};

use std::sync::Arc;

use thiserror::Error;

use crate::control::SessionGuard;
use crate::metadata::DocumentMetadata;
use crate::multipart::{Boundary, BoundaryScanner, FrameError, MultipartFrame};
use crate::upload::UploadBody;

/// Host streaming-listener contract: start, any number of data chunks, stop.
pub trait StreamListener {
    fn on_start(&mut self);
    /// `length` bytes of `chunk` are valid; `offset` is the position in the stream.
    fn on_data(&mut self, chunk: &[u8], offset: u64, length: usize);
    fn on_stop(&mut self, status: u32);
}

impl<T: StreamListener + ?Sized> StreamListener for Box<T> {
    fn on_start(&mut self) {
        (**self).on_start()
    }

    fn on_data(&mut self, chunk: &[u8], offset: u64, length: usize) {
        (**self).on_data(chunk, offset, length)
    }

    fn on_stop(&mut self, status: u32) {
        (**self).on_stop(status)
    }
}

impl<T: StreamListener + ?Sized> StreamListener for &mut T {
    fn on_start(&mut self) {
        (**self).on_start()
    }

    fn on_data(&mut self, chunk: &[u8], offset: u64, length: usize) {
        (**self).on_data(chunk, offset, length)
    }

    fn on_stop(&mut self, status: u32) {
        (**self).on_stop(status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeeState {
    Idle,
    Streaming,
    Completed,
}

/// Why a session passed its stream through without uploading it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error("data arrived before the stream started")]
    DataBeforeStart,
    #[error("stream stopped before it started")]
    StoppedBeforeStart,
}

/// A finished stream whose framed body is ready to upload.
#[derive(Debug)]
pub struct CompletedSession {
    pub id: u64,
    pub meta: Arc<DocumentMetadata>,
    pub boundary: Boundary,
    pub body: UploadBody,
    /// Stop status reported by the host.
    pub status: u32,
    /// Keeps the session counted as in flight until the upload is processed.
    pub guard: Option<SessionGuard>,
}

/// A finished stream that will not be uploaded.
#[derive(Debug)]
pub struct SkippedSession {
    pub id: u64,
    pub meta: Arc<DocumentMetadata>,
    pub reason: SkipReason,
}

/// Receives sessions when their stream stops. `completed` must not block:
/// the sink's `on_stop` is delivered only after it returns.
pub trait SessionHandler: Send + Sync {
    fn completed(self: Arc<Self>, session: CompletedSession);
    fn skipped(&self, session: SkippedSession);
}

pub struct StreamTee<S> {
    id: u64,
    sink: S,
    state: TeeState,
    meta: Arc<DocumentMetadata>,
    frame: Option<MultipartFrame>,
    buffer: AccumulationBuffer,
    scanner: BoundaryScanner,
    skip: Option<SkipReason>,
    handler: Arc<dyn SessionHandler>,
    guard: Option<SessionGuard>,
    bytes_forwarded: u64,
}

impl<S: StreamListener> StreamTee<S> {
    /// Build a tee for one exchange. Framing problems are recorded here and
    /// reported at stop; the sink still receives the whole stream.
    pub fn new(
        sink: S,
        meta: Arc<DocumentMetadata>,
        boundary: Boundary,
        max_upload_bytes: u64,
        handler: Arc<dyn SessionHandler>,
    ) -> Self {
        let scanner = boundary.scanner();
        let (frame, skip) = match MultipartFrame::build(&meta, &boundary) {
            Ok(frame) => (Some(frame), None),
            Err(e) => (None, Some(SkipReason::Frame(e))),
        };
        Self {
            id: 0,
            sink,
            state: TeeState::Idle,
            meta,
            frame,
            buffer: AccumulationBuffer::with_limit(max_upload_bytes),
            scanner,
            skip,
            handler,
            guard: None,
            bytes_forwarded: 0,
        }
    }

    /// Attach the in-flight guard; the session takes the guard's id.
    pub fn with_guard(mut self, guard: SessionGuard) -> Self {
        self.id = guard.id();
        self.guard = Some(guard);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TeeState {
        self.state
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.meta
    }

    /// Bytes delivered to the sink so far.
    pub fn bytes_forwarded(&self) -> u64 {
        self.bytes_forwarded
    }

    /// Bytes held for upload so far (framing included).
    pub fn bytes_buffered(&self) -> u64 {
        self.buffer.len()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn mark_skipped(&mut self, reason: SkipReason) {
        if self.skip.is_none() {
            tracing::debug!(session = self.id, %reason, "upload copy abandoned; passing stream through");
            self.skip = Some(reason);
        }
    }

    fn append(&mut self, bytes: &[u8]) {
        if self.skip.is_some() {
            return;
        }
        if let Err(e) = self.buffer.append(bytes) {
            self.mark_skipped(e.into());
        }
    }

    fn finish(&mut self, status: u32) {
        if status != 200 {
            tracing::warn!(
                session = self.id,
                status,
                "stream ended with non-200 status; uploading what was buffered"
            );
        }
        if self.skip.is_none() && self.scanner.found() {
            self.mark_skipped(SkipReason::Frame(FrameError::BoundaryInPayload));
        }

        if let Some(frame) = self.frame.take() {
            self.append(frame.trailer());
            self.append(frame.suffix());
            if let Some(reason) = self.skip.take() {
                self.report_skipped(reason);
                return;
            }
            let session = CompletedSession {
                id: self.id,
                meta: Arc::clone(&self.meta),
                boundary: frame.boundary().clone(),
                body: self.buffer.take_body(),
                status,
                guard: self.guard.take(),
            };
            Arc::clone(&self.handler).completed(session);
        } else {
            let reason = self
                .skip
                .take()
                .unwrap_or(SkipReason::StoppedBeforeStart);
            self.report_skipped(reason);
        }
    }

    fn report_skipped(&mut self, reason: SkipReason) {
        self.buffer.take_body();
        self.handler.skipped(SkippedSession {
            id: self.id,
            meta: Arc::clone(&self.meta),
            reason,
        });
        self.guard = None;
    }
}

impl<S: StreamListener> StreamListener for StreamTee<S> {
    fn on_start(&mut self) {
        match self.state {
            TeeState::Idle => {
                self.state = TeeState::Streaming;
                if self.skip.is_none() {
                    let result = match &self.frame {
                        Some(frame) => self.buffer.append(frame.prefix()),
                        None => Ok(()),
                    };
                    if let Err(e) = result {
                        self.mark_skipped(e.into());
                    }
                }
                tracing::debug!(
                    session = self.id,
                    name = self.meta.name(),
                    mimetype = self.meta.mime_type(),
                    "intercepted stream started"
                );
            }
            TeeState::Streaming | TeeState::Completed => {
                tracing::warn!(session = self.id, state = ?self.state, "duplicate stream start ignored");
            }
        }
        self.sink.on_start();
    }

    fn on_data(&mut self, chunk: &[u8], offset: u64, length: usize) {
        // Sink first: pass-through never waits on the upload copy.
        self.sink.on_data(chunk, offset, length);
        let bytes = &chunk[..length.min(chunk.len())];
        self.bytes_forwarded += bytes.len() as u64;

        match self.state {
            TeeState::Streaming => {
                if self.skip.is_none() {
                    self.scanner.feed(bytes);
                }
                self.append(bytes);
            }
            TeeState::Idle => self.mark_skipped(SkipReason::DataBeforeStart),
            TeeState::Completed => {
                tracing::warn!(session = self.id, offset, "data after stream stop ignored");
            }
        }
    }

    fn on_stop(&mut self, status: u32) {
        match self.state {
            TeeState::Streaming => {
                self.state = TeeState::Completed;
                self.finish(status);
            }
            TeeState::Idle => {
                self.state = TeeState::Completed;
                self.frame = None;
                self.finish(status);
            }
            TeeState::Completed => {
                tracing::warn!(session = self.id, status, "duplicate stream stop ignored");
            }
        }
        self.sink.on_stop(status);
    }
}

impl<S> Drop for StreamTee<S> {
    fn drop(&mut self) {
        if self.state != TeeState::Completed {
            tracing::debug!(session = self.id, "session dropped before stop; nothing uploaded");
        }
    }
}
