use std::collections::HashSet;

use crate::peer::{Bitfield, PeerId};
use crate::storage::PieceInfo;

/// Scheduling state for one piece.
///
/// Peer membership is tracked by id, never by reference; disconnect removes
/// the id from every set in one pass.
#[derive(Debug)]
pub(crate) struct PieceEntry {
    pub(crate) info: PieceInfo,
    /// Peers advertising this piece.
    pub(crate) having_peers: HashSet<PeerId>,
    /// Peers that granted allowed-fast for this piece.
    pub(crate) allowed_fast_peers: HashSet<PeerId>,
    /// The peer currently downloading this piece, if any.
    pub(crate) requested_peer: Option<PeerId>,
    /// A writer task is flushing this piece.
    pub(crate) writing: bool,
}

impl PieceEntry {
    pub(crate) fn new(info: PieceInfo) -> Self {
        Self {
            info,
            having_peers: HashSet::new(),
            allowed_fast_peers: HashSet::new(),
            requested_peer: None,
            writing: false,
        }
    }

    pub(crate) fn availability(&self) -> usize {
        self.having_peers.len()
    }

    /// Whether the selector may schedule this piece.
    pub(crate) fn eligible(&self, bitfield: &Bitfield) -> bool {
        !bitfield.has(self.info.index as usize)
            && self.requested_peer.is_none()
            && !self.writing
            && !self.having_peers.is_empty()
    }

    /// Removes a disconnected peer from every membership slot.
    pub(crate) fn forget_peer(&mut self, peer: &PeerId) {
        self.having_peers.remove(peer);
        self.allowed_fast_peers.remove(peer);
        if self.requested_peer == Some(*peer) {
            self.requested_peer = None;
        }
    }
}
