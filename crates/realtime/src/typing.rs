//! Typing tracker: ephemeral per-(room, user) composing state.
//!
//! State machine per key: absent → active → absent. Entries leave on
//! explicit stop, on message send by that user in that room, on disconnect,
//! or by TTL sweep. The sweep is the only reclamation path for clients that
//! crash without sending a stop.
//!
//! All transitions take an explicit `now` so refresh and eviction agree on
//! one clock source.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct TypingEntry {
    username: String,
    last_activity: Instant,
}

#[derive(Debug)]
pub struct TypingTracker {
    ttl: Duration,
    entries: HashMap<(String, String), TypingEntry>,
}

impl TypingTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Record typing activity. Returns `true` when the entry is newly
    /// active (caller broadcasts `typing:start`); a refresh of an already
    /// active entry returns `false` since the client-visible state did not
    /// change.
    pub fn start(&mut self, room_id: &str, user_id: &str, username: &str, now: Instant) -> bool {
        let key = (room_id.to_string(), user_id.to_string());
        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.last_activity = now;
                false
            }
            None => {
                self.entries.insert(
                    key,
                    TypingEntry {
                        username: username.to_string(),
                        last_activity: now,
                    },
                );
                true
            }
        }
    }

    /// Remove an entry. Returns `true` if it was active (caller broadcasts
    /// `typing:stop`); stopping an absent entry is a no-op.
    pub fn stop(&mut self, room_id: &str, user_id: &str) -> bool {
        self.entries
            .remove(&(room_id.to_string(), user_id.to_string()))
            .is_some()
    }

    /// Evict every entry older than the TTL, returning the removed
    /// (room, user) pairs so the caller can broadcast stop events.
    pub fn sweep(&mut self, now: Instant) -> Vec<(String, String)> {
        let ttl = self.ttl;
        let expired: Vec<(String, String)> = self
            .entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_activity) > ttl)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
        }
        expired
    }

    /// Force-stop every entry belonging to a user, across all rooms.
    /// Returns the affected room ids. Used by the disconnect cascade.
    pub fn stop_all_for_user(&mut self, user_id: &str) -> Vec<String> {
        let rooms: Vec<String> = self
            .entries
            .keys()
            .filter(|(_, uid)| uid == user_id)
            .map(|(room, _)| room.clone())
            .collect();

        for room in &rooms {
            self.entries.remove(&(room.clone(), user_id.to_string()));
        }
        rooms
    }

    pub fn username(&self, room_id: &str, user_id: &str) -> Option<&str> {
        self.entries
            .get(&(room_id.to_string(), user_id.to_string()))
            .map(|entry| entry.username.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(10);

    #[test]
    fn start_is_active_once_then_refreshes() {
        let mut tracker = TypingTracker::new(TTL);
        let now = Instant::now();

        assert!(tracker.start("general", "u1", "alice", now));
        assert!(!tracker.start("general", "u1", "alice", now + Duration::from_secs(1)));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn stop_removes_active_entry_only_once() {
        let mut tracker = TypingTracker::new(TTL);
        tracker.start("general", "u1", "alice", Instant::now());

        assert!(tracker.stop("general", "u1"));
        assert!(!tracker.stop("general", "u1"));
    }

    #[test]
    fn sweep_evicts_entries_older_than_ttl() {
        let mut tracker = TypingTracker::new(TTL);
        let now = Instant::now();
        tracker.start("general", "u1", "alice", now);
        tracker.start("general", "u2", "bob", now + Duration::from_secs(8));

        // u1 is 11s stale, u2 only 3s.
        let expired = tracker.sweep(now + Duration::from_secs(11));
        assert_eq!(
            expired,
            vec![("general".to_string(), "u1".to_string())]
        );
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn refresh_defers_eviction() {
        let mut tracker = TypingTracker::new(TTL);
        let now = Instant::now();
        tracker.start("general", "u1", "alice", now);
        tracker.start("general", "u1", "alice", now + Duration::from_secs(9));

        assert!(tracker.sweep(now + Duration::from_secs(15)).is_empty());
        assert_eq!(
            tracker.sweep(now + Duration::from_secs(20)),
            vec![("general".to_string(), "u1".to_string())]
        );
    }

    #[test]
    fn entry_exactly_at_ttl_survives() {
        let mut tracker = TypingTracker::new(TTL);
        let now = Instant::now();
        tracker.start("general", "u1", "alice", now);

        assert!(tracker.sweep(now + TTL).is_empty());
        assert_eq!(tracker.sweep(now + TTL + Duration::from_millis(1)).len(), 1);
    }

    #[test]
    fn stop_all_for_user_spans_rooms() {
        let mut tracker = TypingTracker::new(TTL);
        let now = Instant::now();
        tracker.start("a", "u1", "alice", now);
        tracker.start("b", "u1", "alice", now);
        tracker.start("a", "u2", "bob", now);

        let mut rooms = tracker.stop_all_for_user("u1");
        rooms.sort();
        assert_eq!(rooms, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.username("a", "u2").is_some());
    }
}
