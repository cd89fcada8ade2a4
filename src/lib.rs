//! downpour - BitTorrent download coordination
//!
//! This library implements the decision-making core of a BitTorrent client:
//! which piece to fetch from which peer, how to throttle peers through
//! choke/unchoke, how to verify and persist incoming pieces, and how to keep
//! trackers informed. Peer transport, on-disk layout, and tracker transport
//! are collaborators supplied by the embedding client.
//!
//! # Modules
//!
//! - [`peer`] - Peer transport interface: handles, commands, events, bitfields
//! - [`storage`] - Piece store interface and piece verification
//! - [`torrent`] - Static torrent description consumed by the engine
//! - [`downloader`] - The orchestrator event loop, selection, and choking
//! - [`tracker`] - Tracker interface and announce types
//! - [`announcer`] - Periodic tracker announces with backoff
//! - [`config`] - Tuning parameters
//! - [`shutdown`] - Cooperative stop signalling
//! - [`worker`] - Background task supervision

pub mod announcer;
pub mod config;
pub mod downloader;
pub mod peer;
pub mod shutdown;
pub mod storage;
pub mod torrent;
pub mod tracker;
pub mod worker;

pub use announcer::{Announcer, ExponentialBackoff, TransferRequest};
pub use config::{AnnounceConfig, Config};
pub use downloader::{DownloadError, Downloader};
pub use peer::{Bitfield, PeerCommand, PeerError, PeerEvent, PeerHandle, PeerId};
pub use storage::{MemoryStore, PieceInfo, PieceStore, StorageError};
pub use torrent::Torrent;
pub use tracker::{AnnounceResponse, Tracker, TrackerError, TrackerEvent, Transfer};
pub use worker::Workers;
