//! # Parley Realtime Crate
//!
//! The coordination core of the chat system. It turns a pool of live
//! connections into room-scoped publish/subscribe channels:
//!
//! - **Session registry**: connection → identity + joined rooms
//! - **Presence**: full-snapshot `users:online` derivation
//! - **Typing tracker**: ephemeral per-(room, user) state with TTL sweep
//! - **Hub**: the room broadcast router, message ingest pipeline
//!   (persist-then-broadcast) and reaction toggler
//!
//! The core owns no sockets and no storage. Delivery happens through the
//! `mpsc` sender registered per session, durability through the
//! [`parley_store::MessageStore`] trait.

pub mod error;
pub mod events;
pub mod hub;
pub mod presence;
pub mod session;
pub mod testing;
pub mod typing;
pub mod validate;

pub use error::{ErrorKind, RealtimeError, RealtimeResult};
pub use events::{ClientEvent, ServerEvent};
pub use hub::Hub;
pub use presence::OnlineUser;
pub use session::{SessionId, SessionRegistry};
pub use typing::TypingTracker;
