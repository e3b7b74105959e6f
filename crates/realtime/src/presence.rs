//! Presence: the derived set of users with a live session.
//!
//! Full-snapshot, not delta. Clients replace their local list wholesale on
//! every `users:online`, so they never reconcile partial updates. The cost
//! is O(online users) per connect/disconnect, which is far lower frequency
//! than message traffic.

use serde::{Deserialize, Serialize};

use crate::session::SessionRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub user_id: String,
    pub username: String,
    pub avatar: Option<String>,
}

/// Recompute the online-user snapshot from the registry. One entry per
/// distinct user id (the registry keeps at most one session per user).
/// Sorted by user id so consecutive snapshots are comparable.
pub fn snapshot(registry: &SessionRegistry) -> Vec<OnlineUser> {
    let mut users: Vec<OnlineUser> = registry
        .iter()
        .map(|session| OnlineUser {
            user_id: session.user_id.clone(),
            username: session.username.clone(),
            avatar: session.avatar.clone(),
        })
        .collect();
    users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    users
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_store::UserIdentity;
    use tokio::sync::mpsc;

    fn connect(registry: &mut SessionRegistry, user: &str) -> crate::session::SessionId {
        let (tx, rx) = mpsc::channel(8);
        std::mem::forget(rx);
        let (id, _) = registry.connect(
            UserIdentity {
                user_id: user.to_string(),
                username: user.to_string(),
                avatar: None,
            },
            tx,
        );
        id
    }

    #[test]
    fn snapshot_tracks_connects_and_disconnects() {
        let mut registry = SessionRegistry::new();
        let a = connect(&mut registry, "u1");
        connect(&mut registry, "u2");
        connect(&mut registry, "u3");

        assert_eq!(snapshot(&registry).len(), 3);

        registry.disconnect(a);
        let users = snapshot(&registry);
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.user_id != "u1"));
    }

    #[test]
    fn snapshot_counts_users_not_connections() {
        let mut registry = SessionRegistry::new();
        connect(&mut registry, "u1");
        connect(&mut registry, "u1");

        let users = snapshot(&registry);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].user_id, "u1");
    }

    #[test]
    fn snapshot_is_sorted_by_user_id() {
        let mut registry = SessionRegistry::new();
        connect(&mut registry, "zeta");
        connect(&mut registry, "alpha");

        let users = snapshot(&registry);
        assert_eq!(users[0].user_id, "alpha");
        assert_eq!(users[1].user_id, "zeta");
    }
}
