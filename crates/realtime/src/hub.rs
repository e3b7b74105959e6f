//! The hub ties the registry, presence and typing tracker together and owns
//! the two store-backed pipelines: message ingest (persist-then-broadcast)
//! and reaction toggling.
//!
//! Locking discipline: one mutex guards the registry and the typing tracker
//! as a unit, and the guard is NEVER held across a store await. Store-backed
//! operations read what they need under the lock, release it for the write,
//! then re-acquire it to snapshot recipients. Delivery itself happens after
//! the guard is dropped, via `try_send`, so one slow session can never stall
//! the core or the other recipients.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use parley_config::RealtimeConfig;
use parley_store::{
    FileInfo, MessageStore, MessageType, NewMessage, Reaction, StoredMessage, UserIdentity,
};

use crate::error::{RealtimeError, RealtimeResult};
use crate::events::ServerEvent;
use crate::presence::{self, OnlineUser};
use crate::session::{SessionId, SessionRegistry};
use crate::typing::TypingTracker;
use crate::validate;

struct CoreState {
    registry: SessionRegistry,
    typing: TypingTracker,
}

pub struct Hub<S> {
    store: Arc<S>,
    config: RealtimeConfig,
    state: Mutex<CoreState>,
}

impl<S: MessageStore> Hub<S> {
    pub fn new(store: Arc<S>, config: RealtimeConfig) -> Self {
        let typing_ttl = Duration::from_secs(config.typing_ttl_seconds);
        Self {
            store,
            config,
            state: Mutex::new(CoreState {
                registry: SessionRegistry::new(),
                typing: TypingTracker::new(typing_ttl),
            }),
        }
    }

    /// Register a connection and hand back its event stream. The first event
    /// on the stream is the online-user snapshot, which is also rebroadcast
    /// to every other session.
    pub async fn connect(
        &self,
        identity: UserIdentity,
    ) -> (SessionId, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(self.config.session_buffer);
        let user_id = identity.user_id.clone();

        let (session_id, everyone, snapshot, displaced) = {
            let mut state = self.state.lock().await;
            let (session_id, displaced) = state.registry.connect(identity, tx);
            (
                session_id,
                state.registry.all_sessions(),
                presence::snapshot(&state.registry),
                displaced.is_some(),
            )
        };

        if displaced {
            tracing::debug!(%user_id, session_id, "new connection displaced an existing session");
        }
        tracing::info!(%user_id, session_id, online = snapshot.len(), "session connected");

        deliver(&everyone, &ServerEvent::UsersOnline { users: snapshot });
        (session_id, rx)
    }

    /// Subscribe a session to rooms. The caller has already authorized the
    /// ids; unknown sessions and repeated joins are no-ops.
    pub async fn join_rooms(&self, session_id: SessionId, rooms: Vec<String>) {
        let mut state = self.state.lock().await;
        state.registry.join_rooms(session_id, rooms);
    }

    /// Tear down a session: clear its typing entries (broadcasting the
    /// stops), then rebroadcast the presence snapshot. A session displaced
    /// by a newer connection for the same user is already gone, so its late
    /// disconnect changes nothing.
    pub async fn disconnect(&self, session_id: SessionId) {
        let (user_id, typing_stops, everyone, snapshot) = {
            let mut state = self.state.lock().await;
            let Some(session) = state.registry.disconnect(session_id) else {
                return;
            };

            let rooms = state.typing.stop_all_for_user(&session.user_id);
            let typing_stops: Vec<_> = rooms
                .into_iter()
                .map(|room_id| {
                    let recipients = room_recipients(&state.registry, &room_id, None);
                    let event = ServerEvent::TypingStop {
                        room_id,
                        user_id: session.user_id.clone(),
                    };
                    (recipients, event)
                })
                .collect();

            (
                session.user_id,
                typing_stops,
                state.registry.all_sessions(),
                presence::snapshot(&state.registry),
            )
        };

        tracing::info!(%user_id, session_id, online = snapshot.len(), "session disconnected");

        for (recipients, event) in &typing_stops {
            deliver(recipients, event);
        }
        deliver(&everyone, &ServerEvent::UsersOnline { users: snapshot });
    }

    /// Mark the session's user as typing in a room. Broadcasts
    /// `typing:start` to the other room members only on the absent → active
    /// transition; repeated calls just refresh the TTL.
    pub async fn typing_start(&self, session_id: SessionId, room_id: &str) -> RealtimeResult<()> {
        validate::room_id(room_id)?;

        let broadcast = {
            let mut state = self.state.lock().await;
            let Some(session) = state.registry.session(session_id) else {
                return Ok(());
            };
            // Typing in a room the session never joined is dropped rather
            // than rejected: the indicator is ephemeral and racing a
            // join:rooms is normal during startup.
            if !session.rooms.contains(room_id) {
                return Ok(());
            }

            let user_id = session.user_id.clone();
            let username = session.username.clone();
            let newly_active = state
                .typing
                .start(room_id, &user_id, &username, Instant::now());

            newly_active.then(|| {
                let recipients =
                    room_recipients(&state.registry, room_id, Some(session_id));
                let event = ServerEvent::TypingStart {
                    room_id: room_id.to_string(),
                    user_id,
                    username,
                };
                (recipients, event)
            })
        };

        if let Some((recipients, event)) = broadcast {
            deliver(&recipients, &event);
        }
        Ok(())
    }

    /// Clear the session's typing state in a room. Broadcasts `typing:stop`
    /// only if an entry was actually active.
    pub async fn typing_stop(&self, session_id: SessionId, room_id: &str) -> RealtimeResult<()> {
        validate::room_id(room_id)?;

        let broadcast = {
            let mut state = self.state.lock().await;
            let Some(session) = state.registry.session(session_id) else {
                return Ok(());
            };
            let user_id = session.user_id.clone();

            state.typing.stop(room_id, &user_id).then(|| {
                let recipients =
                    room_recipients(&state.registry, room_id, Some(session_id));
                let event = ServerEvent::TypingStop {
                    room_id: room_id.to_string(),
                    user_id,
                };
                (recipients, event)
            })
        };

        if let Some((recipients, event)) = broadcast {
            deliver(&recipients, &event);
        }
        Ok(())
    }

    /// Ingest a text message: validate, persist, then broadcast `message:new`
    /// to the room (sender included). Persistence failure means nothing is
    /// broadcast. Sending also clears the sender's typing indicator in that
    /// room.
    pub async fn send_message(
        &self,
        session_id: SessionId,
        room_id: String,
        content: String,
        message_type: MessageType,
        reply_to: Option<String>,
    ) -> RealtimeResult<StoredMessage> {
        self.ingest(session_id, room_id, content, message_type, reply_to, None)
            .await
    }

    /// Ingest a file announcement. The stored message carries the file name
    /// as its content and the metadata alongside; the blob itself lives
    /// outside this system.
    pub async fn send_file(
        &self,
        session_id: SessionId,
        room_id: String,
        file: FileInfo,
    ) -> RealtimeResult<StoredMessage> {
        if file.size < 0 {
            return Err(RealtimeError::invalid_payload("file size cannot be negative"));
        }
        let content = file.name.clone();
        self.ingest(
            session_id,
            room_id,
            content,
            MessageType::File,
            None,
            Some(file),
        )
        .await
    }

    async fn ingest(
        &self,
        session_id: SessionId,
        room_id: String,
        content: String,
        message_type: MessageType,
        reply_to: Option<String>,
        file: Option<FileInfo>,
    ) -> RealtimeResult<StoredMessage> {
        validate::room_id(&room_id)?;
        validate::message_content(&content, self.config.max_content_length)?;

        let (sender_id, sender_username, sender_avatar) = {
            let state = self.state.lock().await;
            let session = state
                .registry
                .session(session_id)
                .ok_or_else(|| RealtimeError::unauthenticated("unknown session"))?;
            if !session.rooms.contains(&room_id) {
                return Err(RealtimeError::unauthorized(format!(
                    "not joined to room {room_id}"
                )));
            }
            (
                session.user_id.clone(),
                session.username.clone(),
                session.avatar.clone(),
            )
        };

        // Durability point. No recipient sees the message unless this
        // succeeds.
        let message = self
            .store
            .create_message(NewMessage {
                room_id: room_id.clone(),
                sender_id: sender_id.clone(),
                sender_username,
                sender_avatar,
                content,
                message_type,
                reply_to,
                file,
            })
            .await?;

        let (recipients, typing_stop) = {
            let mut state = self.state.lock().await;
            let recipients = room_recipients(&state.registry, &room_id, None);
            let typing_stop = state.typing.stop(&room_id, &sender_id).then(|| {
                let recipients = room_recipients(&state.registry, &room_id, Some(session_id));
                let event = ServerEvent::TypingStop {
                    room_id: room_id.clone(),
                    user_id: sender_id.clone(),
                };
                (recipients, event)
            });
            (recipients, typing_stop)
        };

        tracing::debug!(
            message_id = %message.id,
            %room_id,
            user_id = %sender_id,
            recipients = recipients.len(),
            "message ingested"
        );

        deliver(
            &recipients,
            &ServerEvent::MessageNew {
                message: message.clone(),
            },
        );
        if let Some((recipients, event)) = typing_stop {
            deliver(&recipients, &event);
        }

        Ok(message)
    }

    /// Toggle one (user, emoji) reaction on a stored message and broadcast
    /// the complete resulting list to the message's room.
    ///
    /// Read-modify-write without a transaction: two simultaneous toggles on
    /// the same message can lose one of the updates, and every client still
    /// converges on whichever full list was written last.
    pub async fn toggle_reaction(
        &self,
        session_id: SessionId,
        message_id: &str,
        emoji: &str,
    ) -> RealtimeResult<Vec<Reaction>> {
        validate::emoji(emoji)?;

        let user_id = {
            let state = self.state.lock().await;
            state
                .registry
                .session(session_id)
                .map(|session| session.user_id.clone())
                .ok_or_else(|| RealtimeError::unauthenticated("unknown session"))?
        };

        let message = self
            .store
            .get_message(message_id)
            .await?
            .ok_or_else(|| RealtimeError::not_found(format!("message {message_id}")))?;

        {
            let state = self.state.lock().await;
            let session = state
                .registry
                .session(session_id)
                .ok_or_else(|| RealtimeError::unauthenticated("unknown session"))?;
            if !session.rooms.contains(&message.room_id) {
                return Err(RealtimeError::unauthorized(format!(
                    "not joined to room {}",
                    message.room_id
                )));
            }
        }

        let mut reactions = message.reactions;
        let existing = reactions
            .iter()
            .position(|r| r.user_id == user_id && r.emoji == emoji);
        match existing {
            Some(index) => {
                reactions.remove(index);
            }
            None => reactions.push(Reaction {
                user_id: user_id.clone(),
                emoji: emoji.to_string(),
                reacted_at: chrono::Utc::now().to_rfc3339(),
            }),
        }

        self.store.update_reactions(message_id, &reactions).await?;

        let recipients = {
            let state = self.state.lock().await;
            room_recipients(&state.registry, &message.room_id, None)
        };

        tracing::debug!(
            %message_id,
            %user_id,
            %emoji,
            added = existing.is_none(),
            "reaction toggled"
        );

        deliver(
            &recipients,
            &ServerEvent::MessageReaction {
                message_id: message_id.to_string(),
                reactions: reactions.clone(),
            },
        );

        Ok(reactions)
    }

    /// Evict typing entries past their TTL and broadcast the corresponding
    /// `typing:stop` events. Returns the number of entries evicted.
    pub async fn sweep_typing(&self) -> usize {
        let stops = {
            let mut state = self.state.lock().await;
            let expired = state.typing.sweep(Instant::now());
            expired
                .into_iter()
                .map(|(room_id, user_id)| {
                    let recipients = room_recipients(&state.registry, &room_id, None);
                    (recipients, ServerEvent::TypingStop { room_id, user_id })
                })
                .collect::<Vec<_>>()
        };

        for (recipients, event) in &stops {
            deliver(recipients, event);
        }
        stops.len()
    }

    /// Run the TTL sweep on the configured interval until the task is
    /// aborted.
    pub fn spawn_typing_sweeper(self: Arc<Self>) -> JoinHandle<()>
    where
        S: Send + Sync + 'static,
    {
        let period = Duration::from_secs(self.config.typing_sweep_interval_seconds);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let evicted = self.sweep_typing().await;
                if evicted > 0 {
                    tracing::debug!(evicted, "typing entries expired");
                }
            }
        })
    }

    /// Deliver an event to a single session. Used for feedback that must
    /// never reach the rest of the room, like error events.
    pub async fn notify(&self, session_id: SessionId, event: ServerEvent) {
        let sender = {
            let state = self.state.lock().await;
            state.registry.session(session_id).map(|s| s.sender())
        };
        if let Some(sender) = sender {
            deliver(&[sender], &event);
        }
    }

    /// Current presence snapshot, for surfaces outside the event stream.
    pub async fn online_users(&self) -> Vec<OnlineUser> {
        let state = self.state.lock().await;
        presence::snapshot(&state.registry)
    }
}

/// Delivery handles for a room, optionally excluding the originating
/// session (typing events skip their own author).
fn room_recipients(
    registry: &SessionRegistry,
    room_id: &str,
    except: Option<SessionId>,
) -> Vec<mpsc::Sender<ServerEvent>> {
    registry
        .iter()
        .filter(|session| session.rooms.contains(room_id) && Some(session.id) != except)
        .map(|session| session.sender())
        .collect()
}

/// Fire-and-forget fan-out. A full or closed channel means the session is
/// slow or already gone; it misses the event and the disconnect path reaps
/// it. Nothing here blocks.
fn deliver(recipients: &[mpsc::Sender<ServerEvent>], event: &ServerEvent) {
    for tx in recipients {
        if let Err(err) = tx.try_send(event.clone()) {
            tracing::debug!(
                event = event.event_name(),
                error = %err,
                "dropping event for unreachable session"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryMessageStore;

    fn hub() -> Hub<MemoryMessageStore> {
        Hub::new(Arc::new(MemoryMessageStore::new()), RealtimeConfig::default())
    }

    fn identity(user: &str) -> UserIdentity {
        UserIdentity {
            user_id: user.to_string(),
            username: user.to_string(),
            avatar: None,
        }
    }

    #[tokio::test]
    async fn connect_delivers_presence_snapshot_first() {
        let hub = hub();
        let (_, mut rx) = hub.connect(identity("u1")).await;

        match rx.try_recv().unwrap() {
            ServerEvent::UsersOnline { users } => {
                assert_eq!(users.len(), 1);
                assert_eq!(users[0].user_id, "u1");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_from_unknown_session_is_unauthenticated() {
        let hub = hub();
        let err = hub
            .send_message(99, "general".into(), "hi".into(), MessageType::Text, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RealtimeError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn send_to_unjoined_room_is_unauthorized() {
        let hub = hub();
        let (id, _rx) = hub.connect(identity("u1")).await;

        let err = hub
            .send_message(id, "general".into(), "hi".into(), MessageType::Text, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RealtimeError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn negative_file_size_is_rejected() {
        let hub = hub();
        let (id, _rx) = hub.connect(identity("u1")).await;
        hub.join_rooms(id, vec!["general".into()]).await;

        let err = hub
            .send_file(
                id,
                "general".into(),
                FileInfo {
                    name: "a.txt".into(),
                    mime_type: "text/plain".into(),
                    size: -1,
                    url: "https://files/a.txt".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RealtimeError::InvalidPayload { .. }));
    }
}
