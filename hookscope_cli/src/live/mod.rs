//! Live-update channel: push connection, frame decoding and view reconciliation

pub mod connection;
pub mod decoder;
pub mod reconciler;
pub mod scope;
pub mod session;
pub mod snapshot;
pub mod sse;
pub mod transport;

pub use connection::ConnectionState;
pub use reconciler::Reconciler;
pub use session::{LiveSession, SessionUpdate};
pub use snapshot::ApiSnapshotSource;
pub use transport::SseTransport;

use thiserror::Error;

/// Transport-level failures. None of these are fatal: the connection
/// manager turns every one of them into a reconnect.
#[derive(Debug, Error)]
pub enum LiveError {
    #[error("Failed to connect to live stream: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("Live stream rejected with status {0}")]
    Status(reqwest::StatusCode),

    #[error("Live stream read error: {0}")]
    Read(#[source] reqwest::Error),

    #[error("Failed to build live stream client: {0}")]
    Client(#[source] reqwest::Error),

    #[cfg(test)]
    #[error("Live stream dropped: {0}")]
    Dropped(String),
}
