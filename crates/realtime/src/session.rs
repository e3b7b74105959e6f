//! Session registry: the single source of truth for who can receive a
//! room's events.
//!
//! One session per live connection. The registry keys the per-user index by
//! user id with last-connect-wins semantics: a second connection for the
//! same user displaces the first, which from then on is unknown to the
//! registry (its remaining operations become no-ops). Multi-device support
//! would require keying by (user, connection) and aggregating presence and
//! typing across a user's connection set.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;

use parley_store::UserIdentity;

use crate::events::ServerEvent;

pub type SessionId = u64;

/// One live, authenticated connection and its room memberships.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub user_id: String,
    pub username: String,
    pub avatar: Option<String>,
    pub rooms: HashSet<String>,
    sender: mpsc::Sender<ServerEvent>,
}

impl Session {
    pub fn sender(&self) -> mpsc::Sender<ServerEvent> {
        self.sender.clone()
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    next_id: SessionId,
    sessions: HashMap<SessionId, Session>,
    by_user: HashMap<String, SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. An existing session for the same user id is
    /// displaced (last-connect-wins) and returned so the caller can account
    /// for it.
    pub fn connect(
        &mut self,
        identity: UserIdentity,
        sender: mpsc::Sender<ServerEvent>,
    ) -> (SessionId, Option<Session>) {
        let displaced = self
            .by_user
            .get(&identity.user_id)
            .copied()
            .and_then(|old_id| self.sessions.remove(&old_id));

        self.next_id += 1;
        let id = self.next_id;

        self.by_user.insert(identity.user_id.clone(), id);
        self.sessions.insert(
            id,
            Session {
                id,
                user_id: identity.user_id,
                username: identity.username,
                avatar: identity.avatar,
                rooms: HashSet::new(),
                sender,
            },
        );

        (id, displaced)
    }

    /// Add rooms to a session's joined set. Already-joined ids and unknown
    /// sessions are no-ops.
    pub fn join_rooms(&mut self, session_id: SessionId, rooms: impl IntoIterator<Item = String>) {
        if let Some(session) = self.sessions.get_mut(&session_id) {
            session.rooms.extend(rooms);
        }
    }

    /// Remove a session. Unknown ids are no-ops: the session either already
    /// disconnected or was displaced by a newer connection.
    pub fn disconnect(&mut self, session_id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&session_id)?;
        if self.by_user.get(&session.user_id) == Some(&session_id) {
            self.by_user.remove(&session.user_id);
        }
        Some(session)
    }

    pub fn session(&self, session_id: SessionId) -> Option<&Session> {
        self.sessions.get(&session_id)
    }

    /// Delivery handles for every session currently joined to the room,
    /// evaluated at call time.
    pub fn sessions_in_room(&self, room_id: &str) -> Vec<mpsc::Sender<ServerEvent>> {
        self.sessions
            .values()
            .filter(|session| session.rooms.contains(room_id))
            .map(Session::sender)
            .collect()
    }

    /// Delivery handles for every live session.
    pub fn all_sessions(&self) -> Vec<mpsc::Sender<ServerEvent>> {
        self.sessions.values().map(Session::sender).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
