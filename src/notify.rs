//! User-visible outcome messages ("toasts").
//!
//! The sink keeps the currently visible notifications newest-first and
//! broadcasts `Posted`/`Expired`/`Dismissed` events, so render layers and
//! tests observe the same contract without polling.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Instant,
}

impl Notification {
    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    Posted(Notification),
    Expired(u64),
    Dismissed(u64),
}

struct Inner {
    next_id: u64,
    /// Newest first
    active: VecDeque<Notification>,
}

#[derive(Clone)]
pub struct NotificationSink {
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<NotificationEvent>,
    ttl: Duration,
}

impl Default for NotificationSink {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl NotificationSink {
    pub fn new(ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 1,
                active: VecDeque::new(),
            })),
            events,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.events.subscribe()
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) -> NotificationHandle {
        let notification = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            let notification = Notification {
                id,
                level,
                message: message.into(),
                created_at: Utc::now(),
                expires_at: Instant::now() + self.ttl,
            };
            inner.active.push_front(notification.clone());
            notification
        };

        match level {
            NotificationLevel::Success => tracing::info!("notify: {}", notification.message),
            NotificationLevel::Error => tracing::warn!("notify: {}", notification.message),
        }

        let id = notification.id;
        let _ = self.events.send(NotificationEvent::Posted(notification));

        // Outside a runtime, expiry still happens lazily in `active()`
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let sink = self.clone();
            let ttl = self.ttl;
            runtime.spawn(async move {
                tokio::time::sleep(ttl).await;
                sink.prune_expired();
            });
        }

        NotificationHandle {
            id,
            sink: self.clone(),
        }
    }

    pub fn success(&self, message: impl Into<String>) -> NotificationHandle {
        self.notify(NotificationLevel::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> NotificationHandle {
        self.notify(NotificationLevel::Error, message)
    }

    /// Visible notifications, newest first
    pub fn active(&self) -> Vec<Notification> {
        self.prune_expired();
        self.lock().active.iter().cloned().collect()
    }

    /// Remove early. Returns false if it already expired or was dismissed.
    pub fn dismiss(&self, id: u64) -> bool {
        let removed = {
            let mut inner = self.lock();
            let before = inner.active.len();
            inner.active.retain(|n| n.id != id);
            inner.active.len() != before
        };
        if removed {
            let _ = self.events.send(NotificationEvent::Dismissed(id));
        }
        removed
    }

    fn prune_expired(&self) {
        let now = Instant::now();
        let expired: Vec<u64> = {
            let mut inner = self.lock();
            let expired = inner
                .active
                .iter()
                .filter(|n| n.expires_at <= now)
                .map(|n| n.id)
                .collect();
            inner.active.retain(|n| n.expires_at > now);
            expired
        };
        for id in expired {
            let _ = self.events.send(NotificationEvent::Expired(id));
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic elsewhere must not take the toast list down with it
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Returned by [`NotificationSink::notify`]
#[derive(Clone)]
pub struct NotificationHandle {
    id: u64,
    sink: NotificationSink,
}

impl NotificationHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_visible(&self) -> bool {
        self.sink.active().iter().any(|n| n.id == self.id)
    }

    pub fn dismiss(&self) -> bool {
        self.sink.dismiss(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_newest_first() {
        let sink = NotificationSink::default();
        sink.success("first");
        sink.error("second");

        let active = sink.active();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].message, "second");
        assert!(active[0].is_error());
        assert_eq!(active[1].message, "first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_ttl() {
        let sink = NotificationSink::new(Duration::from_millis(3000));
        let mut events = sink.subscribe();

        let handle = sink.success("Species deleted successfully!");
        assert!(matches!(events.recv().await.unwrap(), NotificationEvent::Posted(_)));

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(handle.is_visible());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!handle.is_visible());
        assert_eq!(events.recv().await.unwrap(), NotificationEvent::Expired(handle.id()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_before_expiry() {
        let sink = NotificationSink::default();
        let mut events = sink.subscribe();

        let handle = sink.error("Deletion failed");
        let _ = events.recv().await;

        assert!(handle.dismiss());
        assert!(!handle.dismiss());
        assert_eq!(events.recv().await.unwrap(), NotificationEvent::Dismissed(handle.id()));

        tokio::time::sleep(DEFAULT_TTL * 2).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_staggered_expiry() {
        let sink = NotificationSink::new(Duration::from_millis(1000));
        sink.success("a");
        tokio::time::sleep(Duration::from_millis(600)).await;
        sink.success("b");

        tokio::time::sleep(Duration::from_millis(500)).await;
        let active = sink.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, "b");
    }

    #[test]
    fn test_notify_without_runtime() {
        let sink = NotificationSink::new(Duration::ZERO);
        let handle = sink.success("saved");
        // Zero TTL: already expired when read
        assert!(!handle.is_visible());
        assert!(sink.active().is_empty());
    }
}
