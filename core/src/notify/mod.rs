//! User-facing notifications and session progress events.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::pipeline::Stage;
use crate::remote::OperationKind;

pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub duration: Duration,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            duration: DEFAULT_NOTIFICATION_DURATION,
        }
    }
}

/// Status of a stage as seen by the event consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Entered,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Notification {
        notification: Notification,
        timestamp: DateTime<Utc>,
    },
    Progress {
        stage: Stage,
        message: String,
        timestamp: DateTime<Utc>,
    },
    StageChanged {
        stage: Stage,
        status: StageStatus,
        timestamp: DateTime<Utc>,
    },
    RetryScheduled {
        operation: OperationKind,
        attempt: u32,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    ItemSettled {
        stage: Stage,
        index: usize,
        total: usize,
        success: bool,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Notification { timestamp, .. } => *timestamp,
            Self::Progress { timestamp, .. } => *timestamp,
            Self::StageChanged { timestamp, .. } => *timestamp,
            Self::RetryScheduled { timestamp, .. } => *timestamp,
            Self::ItemSettled { timestamp, .. } => *timestamp,
        }
    }

    pub fn as_notification(&self) -> Option<&Notification> {
        match self {
            Self::Notification { notification, .. } => Some(notification),
            _ => None,
        }
    }
}

/// Fan-out of session events. Sending never blocks and never fails when
/// nobody is listening.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        let notification = Notification::new(kind, message);
        tracing::debug!(
            target: "castforge.notify",
            kind = %notification.kind,
            message = %notification.message
        );
        self.emit(SessionEvent::Notification {
            notification,
            timestamp: Utc::now(),
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NotificationKind::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NotificationKind::Error, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(NotificationKind::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.notify(NotificationKind::Warning, message);
    }

    pub fn progress(&self, stage: Stage, message: impl Into<String>) {
        self.emit(SessionEvent::Progress {
            stage,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn stage(&self, stage: Stage, status: StageStatus) {
        self.emit(SessionEvent::StageChanged {
            stage,
            status,
            timestamp: Utc::now(),
        });
    }

    pub fn retry(&self, operation: OperationKind, attempt: u32, reason: impl Into<String>) {
        self.emit(SessionEvent::RetryScheduled {
            operation,
            attempt,
            reason: reason.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn item_settled(&self, stage: Stage, index: usize, total: usize, success: bool) {
        self.emit(SessionEvent::ItemSettled {
            stage,
            index,
            total,
            success,
            timestamp: Utc::now(),
        });
    }
}
