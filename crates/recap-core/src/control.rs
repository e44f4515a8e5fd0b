//! Session control: in-flight tracking and shutdown.
//!
//! Every capture session registers here when interception starts and holds a
//! `SessionGuard` until its upload result has been processed (or the session
//! is dropped). After `shutdown`, new sessions are refused while in-flight
//! uploads are allowed to finish; `drain` waits for them with a timeout.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterceptError {
    #[error("capture is shutting down; not intercepting new streams")]
    ShuttingDown,
}

#[derive(Debug)]
pub struct SessionControl {
    accepting: AtomicBool,
    next_id: AtomicU64,
    in_flight: watch::Sender<usize>,
}

impl Default for SessionControl {
    fn default() -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            accepting: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            in_flight,
        }
    }
}

impl SessionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session; returns its guard (which carries the session id).
    pub fn register(self: &Arc<Self>) -> Result<SessionGuard, InterceptError> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(InterceptError::ShuttingDown);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.in_flight.send_modify(|n| *n += 1);
        Ok(SessionGuard {
            control: Arc::clone(self),
            id,
        })
    }

    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Stop accepting new sessions. In-flight sessions keep running.
    pub fn shutdown(&self) {
        if self.accepting.swap(false, Ordering::AcqRel) {
            tracing::info!(in_flight = self.in_flight(), "capture shutting down");
        }
    }

    /// Wait until no session is in flight. Returns false on timeout.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let mut rx = self.in_flight.subscribe();
        let drained = tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0)).await;
        matches!(drained, Ok(Ok(_)))
    }

    fn release(&self) {
        self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Marks one session as in flight until dropped.
#[derive(Debug)]
pub struct SessionGuard {
    control: Arc<SessionControl>,
    id: u64,
}

impl SessionGuard {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.control.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_counts_and_guard_releases() {
        let control = Arc::new(SessionControl::new());
        let a = control.register().unwrap();
        let b = control.register().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(control.in_flight(), 2);
        drop(a);
        assert_eq!(control.in_flight(), 1);
        drop(b);
        assert_eq!(control.in_flight(), 0);
    }

    #[test]
    fn shutdown_refuses_new_sessions_but_keeps_existing() {
        let control = Arc::new(SessionControl::new());
        let guard = control.register().unwrap();
        control.shutdown();
        assert!(!control.is_accepting());
        assert_eq!(control.register().unwrap_err(), InterceptError::ShuttingDown);
        assert_eq!(control.in_flight(), 1);
        drop(guard);
        assert_eq!(control.in_flight(), 0);
    }

    #[tokio::test]
    async fn drain_waits_for_in_flight_sessions() {
        let control = Arc::new(SessionControl::new());
        let guard = control.register().unwrap();
        assert!(!control.drain(Duration::from_millis(20)).await);

        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(guard);
        });
        assert!(control.drain(Duration::from_secs(5)).await);
        release.await.unwrap();
    }

    #[tokio::test]
    async fn drain_returns_immediately_when_idle() {
        let control = SessionControl::new();
        assert!(control.drain(Duration::from_millis(1)).await);
    }
}
