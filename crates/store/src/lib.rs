//! # Parley Store Crate
//!
//! Durable storage for the Parley realtime backend. The realtime core only
//! ever touches messages through the [`MessageStore`] trait; the SQLite
//! implementation here is the default collaborator. The crate also exposes
//! the two directory lookups the gateway consumes before events reach the
//! core: token-to-identity resolution and room membership.

pub mod connection;
pub mod entities;
pub mod error;
pub mod identity;
pub mod members;
pub mod messages;

pub use connection::prepare_database;
pub use entities::{FileInfo, MessageType, NewMessage, Reaction, StoredMessage};
pub use error::{StoreError, StoreResult};
pub use identity::{IdentityDirectory, UserIdentity};
pub use members::MemberDirectory;
pub use messages::{MessageStore, SqliteMessageStore};
