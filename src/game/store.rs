//! Session store — one serialized session slot per conversation.
//!
//! Each conversation owns a single `Mutex<Option<Session>>` slot. Every
//! read-modify-write of a session happens inside that lock, so two users
//! pressing controls at the same moment cannot observe a stale phase or
//! lose each other's join. Different conversations use different slots
//! and never contend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::channels::{ChatId, UserId};
use crate::error::GameError;
use crate::game::session::Session;

type SessionSlot = Arc<Mutex<Option<Session>>>;

/// Owns the per-conversation session slots.
#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<ChatId, SessionSlot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for a conversation, created on first use.
    async fn slot(&self, chat: &ChatId) -> SessionSlot {
        if let Some(slot) = self.slots.read().await.get(chat) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(chat.clone()).or_default())
    }

    /// Create a session for a conversation.
    ///
    /// Fails with `SessionAlreadyActive` while a non-ended session exists;
    /// an ended leftover is replaced. Returns the new session's id.
    pub async fn create(&self, chat: &ChatId, starter: &UserId) -> Result<Uuid, GameError> {
        let slot = self.slot(chat).await;
        let mut guard = slot.lock().await;

        if let Some(existing) = guard.as_ref() {
            if existing.phase.is_active() {
                return Err(GameError::SessionAlreadyActive);
            }
        }

        let session = Session::new(starter.clone());
        let id = session.id;
        *guard = Some(session);

        info!(chat = %chat, session_id = %id, "Session created");
        Ok(id)
    }

    /// Run a closure against the conversation's session, under its lock.
    ///
    /// The closure should only decide and mutate; anything that talks to
    /// the outside world belongs after the lock is released.
    pub async fn with_session<F, T>(&self, chat: &ChatId, f: F) -> Result<T, GameError>
    where
        F: FnOnce(&mut Session) -> Result<T, GameError>,
    {
        let slot = match self.slots.read().await.get(chat) {
            Some(slot) => Arc::clone(slot),
            None => return Err(GameError::NoActiveSession),
        };
        let mut guard = slot.lock().await;
        match guard.as_mut() {
            Some(session) => f(session),
            None => Err(GameError::NoActiveSession),
        }
    }

    /// Drop a conversation's session, if any.
    pub async fn clear(&self, chat: &ChatId) {
        if let Some(slot) = self.slots.read().await.get(chat) {
            let mut guard = slot.lock().await;
            if guard.take().is_some() {
                debug!(chat = %chat, "Session cleared");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::Phase;

    fn chat() -> ChatId {
        "chat-1".to_string()
    }

    #[tokio::test]
    async fn create_get_clear() {
        let store = SessionStore::new();
        let id = store.create(&chat(), &"u1".into()).await.unwrap();

        let seen = store
            .with_session(&chat(), |s| Ok(s.id))
            .await
            .unwrap();
        assert_eq!(seen, id);

        store.clear(&chat()).await;
        assert_eq!(
            store.with_session(&chat(), |_| Ok(())).await,
            Err(GameError::NoActiveSession)
        );
    }

    #[tokio::test]
    async fn second_create_rejected_while_active() {
        let store = SessionStore::new();
        store.create(&chat(), &"u1".into()).await.unwrap();
        assert_eq!(
            store.create(&chat(), &"u2".into()).await,
            Err(GameError::SessionAlreadyActive)
        );
    }

    #[tokio::test]
    async fn ended_session_is_replaced() {
        let store = SessionStore::new();
        let first = store.create(&chat(), &"u1".into()).await.unwrap();
        store
            .with_session(&chat(), |s| {
                s.phase = Phase::Ended;
                Ok(())
            })
            .await
            .unwrap();

        let second = store.create(&chat(), &"u2".into()).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn conversations_are_independent() {
        let store = SessionStore::new();
        store.create(&"a".into(), &"u1".into()).await.unwrap();
        store.create(&"b".into(), &"u1".into()).await.unwrap();

        store.clear(&"a".into()).await;
        assert!(store.with_session(&"b".into(), |_| Ok(())).await.is_ok());
    }

    #[tokio::test]
    async fn missing_session_yields_no_active_session() {
        let store = SessionStore::new();
        assert_eq!(
            store.with_session(&chat(), |_| Ok(())).await,
            Err(GameError::NoActiveSession)
        );
    }

    #[tokio::test]
    async fn racing_mutations_are_serialized() {
        let store = Arc::new(SessionStore::new());
        store.create(&chat(), &"u0".into()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .with_session(&chat(), |s| {
                        // Read-modify-write that would lose updates
                        // without the per-conversation lock.
                        let user = format!("u{i}");
                        s.participants.insert(
                            user.clone(),
                            crate::game::session::Player {
                                id: user,
                                display_name: format!("User {i}"),
                                handle: None,
                            },
                        );
                        Ok(())
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let count = store
            .with_session(&chat(), |s| Ok(s.participants.len()))
            .await
            .unwrap();
        assert_eq!(count, 32);
    }
}
