//! Bot statistics — message counters and hourly activity buckets.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::channels::{ChatKind, UserEvent};

#[derive(Default)]
struct StatsInner {
    total_messages: u64,
    users: HashSet<String>,
    groups: HashSet<String>,
    private_chats: HashSet<String>,
    activity: BTreeMap<String, u64>,
}

/// In-memory counters, reset on restart.
pub struct Stats {
    started_at: DateTime<Utc>,
    inner: RwLock<StatsInner>,
}

/// Read-only view served by the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_messages: u64,
    pub unique_users: usize,
    pub unique_groups: usize,
    pub unique_private_chats: usize,
    pub uptime_secs: i64,
    /// Messages per hour, keyed "YYYY-MM-DD HH:00".
    pub activity: BTreeMap<String, u64>,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            inner: RwLock::new(StatsInner::default()),
        }
    }

    /// Count one inbound event.
    pub async fn record(&self, event: &UserEvent) {
        let mut inner = self.inner.write().await;
        inner.total_messages += 1;
        inner.users.insert(event.user.id.clone());
        match event.chat_kind {
            ChatKind::Group => inner.groups.insert(event.chat.clone()),
            ChatKind::Private => inner.private_chats.insert(event.chat.clone()),
        };

        let bucket = Utc::now().format("%Y-%m-%d %H:00").to_string();
        *inner.activity.entry(bucket).or_insert(0) += 1;
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.read().await;
        StatsSnapshot {
            total_messages: inner.total_messages,
            unique_users: inner.users.len(),
            unique_groups: inner.groups.len(),
            unique_private_chats: inner.private_chats.len(),
            uptime_secs: (Utc::now() - self.started_at).num_seconds(),
            activity: inner.activity.clone(),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{EventPayload, UserRef};

    fn event(chat: &str, kind: ChatKind, user: &str) -> UserEvent {
        UserEvent {
            channel: "test".into(),
            chat: chat.into(),
            chat_kind: kind,
            user: UserRef::new(user, user),
            payload: EventPayload::Text("hi".into()),
        }
    }

    #[tokio::test]
    async fn counts_messages_and_uniques() {
        let stats = Stats::new();
        stats.record(&event("g1", ChatKind::Group, "u1")).await;
        stats.record(&event("g1", ChatKind::Group, "u2")).await;
        stats.record(&event("p1", ChatKind::Private, "u1")).await;

        let snap = stats.snapshot().await;
        assert_eq!(snap.total_messages, 3);
        assert_eq!(snap.unique_users, 2);
        assert_eq!(snap.unique_groups, 1);
        assert_eq!(snap.unique_private_chats, 1);
        assert_eq!(snap.activity.values().sum::<u64>(), 3);
    }

    #[tokio::test]
    async fn repeat_users_count_once() {
        let stats = Stats::new();
        for _ in 0..5 {
            stats.record(&event("g1", ChatKind::Group, "u1")).await;
        }
        let snap = stats.snapshot().await;
        assert_eq!(snap.total_messages, 5);
        assert_eq!(snap.unique_users, 1);
    }
}
