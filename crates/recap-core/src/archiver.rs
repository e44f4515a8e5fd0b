//! Long-lived capture context.
//!
//! The archiver owns what outlives a single intercepted exchange: config,
//! uploader, the shared metadata cache, the notification bridge and session
//! control. `intercept` creates one `StreamTee` per exchange; when that tee's
//! stream stops, the archiver spawns a detached task that uploads the body,
//! merges the reply into the cache and announces success.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::cache::MetadataCache;
use crate::config::RecapConfig;
use crate::control::{InterceptError, SessionControl};
use crate::metadata::DocumentMetadata;
use crate::multipart::Boundary;
use crate::notify::{NotificationBridge, NotificationKind, Notifier};
use crate::tee::{CompletedSession, SessionHandler, SkippedSession, StreamListener, StreamTee};
use crate::upload::{upload, CurlUploader, UploadError, UploadRequest, UploadResult, Uploader};

/// Outcome counters across all sessions.
#[derive(Debug, Default)]
struct ArchiveStats {
    uploads_started: AtomicU64,
    uploads_succeeded: AtomicU64,
    uploads_failed: AtomicU64,
    sessions_skipped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uploads_started: u64,
    pub uploads_succeeded: u64,
    pub uploads_failed: u64,
    pub sessions_skipped: u64,
}

#[derive(Clone)]
pub struct Archiver {
    inner: Arc<ArchiverInner>,
}

struct ArchiverInner {
    config: RecapConfig,
    uploader: Arc<dyn Uploader>,
    cache: Arc<MetadataCache>,
    notifications: NotificationBridge,
    control: Arc<SessionControl>,
    stats: ArchiveStats,
    runtime: Handle,
}

impl Archiver {
    /// Archiver posting to `config.upload_url` with curl.
    pub fn new(
        config: RecapConfig,
        cache: Arc<MetadataCache>,
        notifier: Arc<dyn Notifier>,
        runtime: Handle,
    ) -> Self {
        let uploader = Arc::new(CurlUploader::from_config(&config));
        Self::with_uploader(config, uploader, cache, notifier, runtime)
    }

    pub fn with_uploader(
        config: RecapConfig,
        uploader: Arc<dyn Uploader>,
        cache: Arc<MetadataCache>,
        notifier: Arc<dyn Notifier>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(ArchiverInner {
                config,
                uploader,
                cache,
                notifications: NotificationBridge::new(notifier),
                control: Arc::new(SessionControl::new()),
                stats: ArchiveStats::default(),
                runtime,
            }),
        }
    }

    /// Start a capture session for one exchange. The returned tee replaces
    /// `sink` as the host's listener. Refused after `shutdown`; the host then
    /// keeps using its original listener.
    pub fn intercept<S: StreamListener>(
        &self,
        meta: DocumentMetadata,
        sink: S,
    ) -> Result<StreamTee<S>, InterceptError> {
        let guard = self.inner.control.register()?;
        tracing::debug!(
            session = guard.id(),
            name = meta.name(),
            court = meta.court().unwrap_or(""),
            "intercepting stream"
        );
        let handler: Arc<dyn SessionHandler> = self.inner.clone();
        let tee = StreamTee::new(
            sink,
            Arc::new(meta),
            Boundary::generate(),
            self.inner.config.max_upload_bytes,
            handler,
        )
        .with_guard(guard);
        Ok(tee)
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.inner.cache
    }

    pub fn config(&self) -> &RecapConfig {
        &self.inner.config
    }

    pub fn in_flight(&self) -> usize {
        self.inner.control.in_flight()
    }

    pub fn stats(&self) -> StatsSnapshot {
        let s = &self.inner.stats;
        StatsSnapshot {
            uploads_started: s.uploads_started.load(Ordering::Relaxed),
            uploads_succeeded: s.uploads_succeeded.load(Ordering::Relaxed),
            uploads_failed: s.uploads_failed.load(Ordering::Relaxed),
            sessions_skipped: s.sessions_skipped.load(Ordering::Relaxed),
        }
    }

    /// Refuse new sessions; in-flight uploads continue.
    pub fn shutdown(&self) {
        self.inner.control.shutdown();
    }

    /// Wait for in-flight sessions to finish. Returns false on timeout.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.inner.control.drain(timeout).await
    }
}

impl ArchiverInner {
    fn process(&self, session: u64, meta: &DocumentMetadata, result: UploadResult) {
        match result {
            Ok(response) => {
                self.stats.uploads_succeeded.fetch_add(1, Ordering::Relaxed);
                let merged = self.cache.merge(meta.kind(), &response);
                tracing::info!(
                    session,
                    name = meta.name(),
                    message = response.message.as_deref().unwrap_or(""),
                    cases = merged.cases,
                    documents = merged.documents,
                    "upload accepted by archive"
                );
                self.notifications
                    .announce(NotificationKind::for_document(meta.kind()));
            }
            Err(err) => {
                self.stats.uploads_failed.fetch_add(1, Ordering::Relaxed);
                match err.raw_response() {
                    Some(raw) => {
                        tracing::warn!(session, name = meta.name(), response = %raw, "upload reply not usable: {}", err);
                    }
                    None => {
                        tracing::warn!(session, name = meta.name(), "upload failed: {}", err);
                    }
                }
            }
        }
    }
}

impl SessionHandler for ArchiverInner {
    fn completed(self: Arc<Self>, session: CompletedSession) {
        let CompletedSession {
            id,
            meta,
            boundary,
            body,
            status: _,
            guard,
        } = session;

        tracing::info!(
            session = id,
            name = meta.name(),
            court = meta.court().unwrap_or(""),
            mimetype = meta.mime_type(),
            bytes = body.len(),
            "posting file"
        );
        self.stats.uploads_started.fetch_add(1, Ordering::Relaxed);

        let runtime = self.runtime.clone();
        runtime.spawn(async move {
            let uploader = Arc::clone(&self.uploader);
            let request = UploadRequest {
                session: id,
                boundary,
                body,
            };
            let result = tokio::task::spawn_blocking(move || upload(uploader.as_ref(), &request))
                .await
                .unwrap_or_else(|join| Err(UploadError::Task(join.to_string())));
            self.process(id, &meta, result);
            drop(guard);
        });
    }

    fn skipped(&self, session: SkippedSession) {
        self.stats.sessions_skipped.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            session = session.id,
            name = session.meta.name(),
            reason = %session.reason,
            "upload skipped; stream passed through unchanged"
        );
    }
}
