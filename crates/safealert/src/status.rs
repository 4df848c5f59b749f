//! The transient status line.
//!
//! A message stays up for a fixed time and then clears itself, unless a newer
//! message replaced it in the meantime. Watchers get every change through a
//! `tokio::sync::watch` channel.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info};

/// Tone of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Progress or neutral information.
    Info,
    /// An action completed.
    Success,
    /// An action failed.
    Error,
}

/// One status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    /// Tone.
    pub kind: StatusKind,
    /// Text shown to the user.
    pub text: String,
    /// Sequence number; later messages have larger ids.
    pub id: u64,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.kind {
            StatusKind::Info => "..",
            StatusKind::Success => "ok",
            StatusKind::Error => "!!",
        };
        write!(f, "[{marker}] {}", self.text)
    }
}

/// Shared handle to the status line.
#[derive(Debug, Clone)]
pub struct StatusLine {
    tx: Arc<watch::Sender<Option<Status>>>,
    next_id: Arc<AtomicU64>,
    clear_after: Duration,
}

impl StatusLine {
    /// Create a status line whose messages clear after `clear_after`.
    #[must_use]
    pub fn new(clear_after: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            next_id: Arc::new(AtomicU64::new(1)),
            clear_after,
        }
    }

    /// Watch for changes. `None` means the line is empty.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Status>> {
        self.tx.subscribe()
    }

    /// What is showing right now.
    #[must_use]
    pub fn current(&self) -> Option<Status> {
        self.tx.borrow().clone()
    }

    /// Show an informational message.
    pub fn info(&self, text: impl Into<String>) -> u64 {
        self.set(StatusKind::Info, text)
    }

    /// Show a success message.
    pub fn success(&self, text: impl Into<String>) -> u64 {
        self.set(StatusKind::Success, text)
    }

    /// Show an error message.
    pub fn error(&self, text: impl Into<String>) -> u64 {
        self.set(StatusKind::Error, text)
    }

    /// Show a message and schedule it to clear. Returns its id.
    ///
    /// Outside a tokio runtime the message stays until replaced.
    pub fn set(&self, kind: StatusKind, text: impl Into<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let status = Status {
            kind,
            text: text.into(),
            id,
        };
        match kind {
            StatusKind::Error => error!("{}", status.text),
            StatusKind::Info | StatusKind::Success => info!("{}", status.text),
        }
        self.tx.send_replace(Some(status));

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let tx = Arc::clone(&self.tx);
            let clear_after = self.clear_after;
            runtime.spawn(async move {
                tokio::time::sleep(clear_after).await;
                tx.send_if_modified(|current| {
                    if current.as_ref().is_some_and(|s| s.id == id) {
                        *current = None;
                        true
                    } else {
                        false
                    }
                });
            });
        }
        id
    }

    /// Empty the line now.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}
