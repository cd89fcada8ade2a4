use thiserror::Error;

/// Errors that can occur on the peer side of a download.
///
/// All of these are transient from the engine's point of view: the download
/// slot is released and the piece becomes schedulable again.
#[derive(Debug, Error)]
pub enum PeerError {
    /// The connection to the peer is gone.
    #[error("connection closed")]
    ConnectionClosed,

    /// The peer stopped sending data.
    #[error("timeout")]
    Timeout,

    /// Protocol violation by the peer.
    #[error("protocol error: {0}")]
    Protocol(String),
}
