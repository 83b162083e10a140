//! In-memory session store.

use async_trait::async_trait;
use dashmap::DashMap;

use snowball_domain::{ConnectionId, Session};

use crate::infrastructure::ports::{SessionError, SessionMutation, SessionStore};

/// Sessions keyed by `(namespace, connection)`.
///
/// `mutate` runs while the map shard is write-locked, so concurrent edits to
/// the same session never lose updates.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<(String, ConnectionId), Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn key(connection_id: ConnectionId, namespace: &str) -> (String, ConnectionId) {
        (namespace.to_string(), connection_id)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
    ) -> Result<Option<Session>, SessionError> {
        Ok(self
            .sessions
            .get(&Self::key(connection_id, namespace))
            .map(|s| s.clone()))
    }

    async fn save(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
        session: Session,
    ) -> Result<(), SessionError> {
        self.sessions
            .insert(Self::key(connection_id, namespace), session);
        Ok(())
    }

    async fn mutate(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
        mutation: SessionMutation,
    ) -> Result<Session, SessionError> {
        let mut entry = self
            .sessions
            .get_mut(&Self::key(connection_id, namespace))
            .ok_or(SessionError::NotFound(connection_id))?;
        mutation(entry.value_mut());
        Ok(entry.clone())
    }

    async fn remove(
        &self,
        connection_id: ConnectionId,
        namespace: &str,
    ) -> Result<Option<Session>, SessionError> {
        Ok(self
            .sessions
            .remove(&Self::key(connection_id, namespace))
            .map(|(_, s)| s))
    }
}
