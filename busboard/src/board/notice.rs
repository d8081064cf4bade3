//! User-visible notices
//!
//! A notification surface is optional. Without one, notices are simply
//! not shown.

use std::time::Duration;

/// How long the "restored" notice stays up.
pub static RESTORED_DISMISS_AFTER: Duration = Duration::from_millis(2000);

/// How long an application error stays up.
pub static ERROR_DISMISS_AFTER: Duration = Duration::from_millis(8000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    Disconnected,
    /// Replaces a shown `Disconnected` notice.
    Restored,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    /// `None` keeps the notice up until it is replaced.
    pub dismiss_after: Option<Duration>,
}

impl Notice {
    pub fn disconnected() -> Notice {
        Notice {
            kind: NoticeKind::Disconnected,
            text: "Disconnected from the bus server. Reconnecting...".to_string(),
            dismiss_after: None,
        }
    }

    pub fn restored() -> Notice {
        Notice {
            kind: NoticeKind::Restored,
            text: "Connection restored.".to_string(),
            dismiss_after: Some(RESTORED_DISMISS_AFTER),
        }
    }

    pub fn error(text: &str) -> Notice {
        Notice {
            kind: NoticeKind::Error,
            text: text.to_string(),
            dismiss_after: Some(ERROR_DISMISS_AFTER),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.dismiss_after.is_none()
    }
}

pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}
