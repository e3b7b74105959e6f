//! Shared state handed to every gateway handler.

use std::sync::Arc;

use parley_realtime::Hub;
use parley_store::{IdentityDirectory, MemberDirectory, SqliteMessageStore};

#[derive(Clone)]
pub struct GatewayState {
    /// The realtime coordination core.
    pub hub: Arc<Hub<SqliteMessageStore>>,
    /// Token → user resolution for connection auth.
    pub identity: IdentityDirectory,
    /// Room membership lookups for join authorization.
    pub members: MemberDirectory,
}

impl GatewayState {
    pub fn new(
        hub: Arc<Hub<SqliteMessageStore>>,
        identity: IdentityDirectory,
        members: MemberDirectory,
    ) -> Self {
        Self {
            hub,
            identity,
            members,
        }
    }
}
