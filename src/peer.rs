//! Peer transport interface.
//!
//! The engine never talks to sockets. Each connected peer is represented by
//! a [`PeerHandle`] whose send primitives feed a bounded [`PeerCommand`]
//! channel owned by the external transport, and every inbound message
//! arrives on one merged [`PeerEvent`] stream. Events from the same peer
//! keep their transport order; no ordering holds across peers.

mod bitfield;
mod error;
mod event;
mod handle;
mod peer_id;

pub use bitfield::Bitfield;
pub use error::PeerError;
pub use event::PeerEvent;
pub use handle::{PeerCommand, PeerHandle};
pub use peer_id::PeerId;

#[cfg(test)]
mod tests;
