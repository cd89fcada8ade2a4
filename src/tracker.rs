//! Tracker interface.
//!
//! Trackers are servers that help peers find each other. The transport
//! (HTTP, UDP) lives with the embedding client; the engine only needs the
//! announce contract below. During a torrent's lifetime a tracker sees
//! `Started` once, periodic plain announces, and `Completed` and/or
//! `Stopped` at most once each.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::peer::PeerId;

/// Progress snapshot reported on each announce.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub info_hash: [u8; 20],
    pub peer_id: PeerId,
    /// The TCP port we accept peers on.
    pub port: u16,
    /// Bytes uploaded so far.
    pub uploaded: u64,
    /// Bytes downloaded and verified so far.
    pub downloaded: u64,
    /// Bytes still missing.
    pub left: u64,
}

/// Lifecycle event attached to an announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerEvent {
    None,
    Started,
    Stopped,
    Completed,
}

impl TrackerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerEvent::None => "",
            TrackerEvent::Started => "started",
            TrackerEvent::Stopped => "stopped",
            TrackerEvent::Completed => "completed",
        }
    }
}

/// A successful announce.
#[derive(Debug, Clone)]
pub struct AnnounceResponse {
    /// How long to wait before the next plain announce.
    pub interval: Duration,
    /// Peers the tracker knows about.
    pub peers: Vec<SocketAddr>,
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tracker returned error: {0}")]
    Failure(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timeout")]
    Timeout,
}

/// A tracker client for one announce URL.
///
/// Announces are infallible from the engine's point of view: errors are
/// retried under backoff by the [`Announcer`](crate::announcer::Announcer)
/// and never become fatal.
#[async_trait]
pub trait Tracker: Send + Sync + 'static {
    async fn announce(
        &self,
        transfer: Transfer,
        event: TrackerEvent,
    ) -> Result<AnnounceResponse, TrackerError>;

    /// Releases any transport resources. Called once, after the last announce.
    async fn close(&self) {}
}
