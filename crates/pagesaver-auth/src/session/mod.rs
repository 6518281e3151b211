//! Cookie-backed server sessions.

pub mod bridge;
pub mod cookies;
pub mod store;

pub use bridge::{SessionBridge, SessionProbe};
pub use store::{InMemorySessionStore, SessionRecord, SessionStore, generate_session_id};
