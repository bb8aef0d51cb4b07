//! User-visible notices.
//!
//! Transient notices disappear after the board's lifetime elapses; persistent
//! ones stay until dismissed or cleared by the operation that resolves them.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoticeId(u64);

impl NoticeId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct Notice {
    pub id: NoticeId,
    pub message: String,
    pub persistent: bool,
    #[serde(skip)]
    created_at: Instant,
}

impl Notice {
    fn expired(&self, now: Instant, lifetime: Duration) -> bool {
        !self.persistent && now.duration_since(self.created_at) >= lifetime
    }
}

#[derive(Debug)]
pub struct NoticeBoard {
    notices: VecDeque<Notice>,
    lifetime: Duration,
}

impl NoticeBoard {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            notices: VecDeque::new(),
            lifetime,
        }
    }

    pub fn push_transient(&mut self, message: impl Into<String>) -> NoticeId {
        self.push(message.into(), false)
    }

    /// A persistent notice with the same text is reused rather than stacked.
    pub fn push_persistent(&mut self, message: impl Into<String>) -> NoticeId {
        let message = message.into();
        if let Some(existing) = self
            .notices
            .iter()
            .find(|n| n.persistent && n.message == message)
        {
            return existing.id;
        }
        self.push(message, true)
    }

    fn push(&mut self, message: String, persistent: bool) -> NoticeId {
        let notice = Notice {
            id: NoticeId::next(),
            message,
            persistent,
            created_at: Instant::now(),
        };
        let id = notice.id;
        self.notices.push_back(notice);
        id
    }

    /// Returns `true` if the notice was still showing.
    pub fn dismiss(&mut self, id: NoticeId) -> bool {
        match self.notices.iter().position(|n| n.id == id) {
            Some(pos) => {
                self.notices.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn clear_persistent(&mut self) {
        self.notices.retain(|n| !n.persistent);
    }

    pub fn expire(&mut self) {
        let now = Instant::now();
        let lifetime = self.lifetime;
        self.notices.retain(|n| !n.expired(now, lifetime));
    }

    /// Oldest first, expired entries dropped.
    pub fn visible(&mut self) -> Vec<Notice> {
        self.expire();
        self.notices.iter().cloned().collect()
    }
}
