use bytes::Bytes;

use super::bitfield::Bitfield;
use super::handle::PeerHandle;
use super::peer_id::PeerId;

/// An inbound event from the peer layer.
///
/// Transports for all connected peers merge into one stream of these. The
/// engine relies on per-peer ordering only: a transport must emit `Connect`
/// before any message from that peer and `Disconnect` after the last one.
#[derive(Debug)]
pub enum PeerEvent {
    /// A peer finished its handshake.
    Connect(PeerHandle),
    /// A peer went away; all state for it must be dropped.
    Disconnect(PeerId),
    /// The peer announced a single piece.
    Have { peer: PeerId, piece: u32 },
    /// The peer announced its full piece map.
    Bitfield { peer: PeerId, bitfield: Bitfield },
    /// Fast-extension shorthand for a complete bitfield.
    HaveAll { peer: PeerId },
    /// Fast-extension grant: we may request this piece while choked.
    AllowedFast { peer: PeerId, piece: u32 },
    Choke(PeerId),
    Unchoke(PeerId),
    /// A block of piece data.
    Piece {
        peer: PeerId,
        piece: u32,
        begin: u32,
        data: Bytes,
    },
    /// The peer requested a block from us.
    Request {
        peer: PeerId,
        piece: u32,
        begin: u32,
        length: u32,
    },
}
