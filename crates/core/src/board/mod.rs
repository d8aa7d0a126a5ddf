//! Team message board backed by SQLite.
//!
//! Messages and collaborators are stored per project in one database opened
//! through tokio-rusqlite:
//!
//! - WAL mode so concurrent tool calls never corrupt shared state
//! - Versioned schema migrations
//! - Per-project message ids that are never reused

pub mod collaborators;
pub mod connection;
pub mod listing;
pub mod messages;
pub mod migrations;
pub mod roles;

pub use collaborators::Collaborator;
pub use connection::BoardDb;
pub use listing::{MessageGroup, MessageSummary, Viewer, group_messages};
pub use messages::{Author, Message, MessageEdit, MessageFilter, MessageType, NewMessage};
pub use roles::{EVERYONE, mentions_me, normalize_role};

/// Board timestamp: UTC RFC 3339 with fixed millisecond precision, so that
/// string order is chronological order.
pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
