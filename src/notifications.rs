use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::AbortHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub created: DateTime<Local>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Notification>,
    expiries: HashMap<u64, AbortHandle>,
    next_id: u64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for (_, handle) in self.expiries.drain() {
            handle.abort();
        }
    }
}

/// Toast list whose expiry timers are owned by the center.
///
/// Expiry tasks only hold a weak reference, so dropping the last clone of
/// the center aborts every pending timer.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    inner: Arc<Mutex<Inner>>,
    duration: Duration,
}

impl NotificationCenter {
    pub fn new(duration: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            duration,
        }
    }

    pub fn push(&self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        self.push_for(kind, message, Some(self.duration))
    }

    /// Adds a notification that expires after `duration`, or stays until
    /// dismissed when `duration` is `None`.
    pub fn push_for(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        duration: Option<Duration>,
    ) -> u64 {
        let message = message.into();
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        tracing::info!(id, ?kind, "{message}");
        inner.entries.push(Notification {
            id,
            kind,
            message,
            created: Local::now(),
        });

        if let Some(duration) = duration {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let weak = Arc::downgrade(&self.inner);
                    let task = runtime.spawn(expire(weak, id, duration));
                    inner.expiries.insert(id, task.abort_handle());
                }
                Err(_) => tracing::warn!(id, "no async runtime, notification will not expire"),
            }
        }
        id
    }

    pub fn dismiss(&self, id: u64) -> bool {
        let mut inner = self.lock();
        if let Some(handle) = inner.expiries.remove(&id) {
            handle.abort();
        }
        let before = inner.entries.len();
        inner.entries.retain(|n| n.id != id);
        inner.entries.len() != before
    }

    pub fn list(&self) -> Vec<Notification> {
        self.lock().entries.clone()
    }

    pub fn pending_expiries(&self) -> usize {
        self.lock().expiries.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancels every pending expiry and clears the list.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        for (_, handle) in inner.expiries.drain() {
            handle.abort();
        }
        inner.entries.clear();
    }
}

async fn expire(inner: Weak<Mutex<Inner>>, id: u64, after: Duration) {
    tokio::time::sleep(after).await;
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
    inner.expiries.remove(&id);
    inner.entries.retain(|n| n.id != id);
    tracing::trace!(id, "notification expired");
}
