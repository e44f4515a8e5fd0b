//! Notification bridge: one short message per successful upload.

use std::sync::Arc;

use crate::metadata::DocumentKind;

pub const NOTIFICATION_TITLE: &str = "RECAP File Upload";

/// Icon shown with a notification by the UI surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    LoggedIn,
}

/// UI surface that displays notifications. Implemented by the host.
pub trait Notifier: Send + Sync {
    fn notify(&self, icon: IconKind, title: &str, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    DocumentUploaded,
    DocketUploaded,
}

impl NotificationKind {
    pub fn for_document(kind: DocumentKind) -> Self {
        if kind.is_html() {
            NotificationKind::DocketUploaded
        } else {
            NotificationKind::DocumentUploaded
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            NotificationKind::DocumentUploaded => "PDF uploaded to the public archive.",
            NotificationKind::DocketUploaded => "Docket uploaded to the public archive.",
        }
    }
}

#[derive(Clone)]
pub struct NotificationBridge {
    notifier: Arc<dyn Notifier>,
}

impl NotificationBridge {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn announce(&self, kind: NotificationKind) {
        self.notifier
            .notify(IconKind::LoggedIn, NOTIFICATION_TITLE, kind.message());
    }
}

/// Writes notifications to the log. Default when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, icon: IconKind, title: &str, message: &str) {
        tracing::info!(?icon, title, "{}", message);
    }
}
