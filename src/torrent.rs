//! Static description of the torrent being downloaded.

use crate::peer::PeerId;
use crate::storage::PieceInfo;

/// Everything the engine needs to know about a torrent up front: the swarm
/// identity reported to trackers and the piece table.
#[derive(Debug, Clone)]
pub struct Torrent {
    /// The torrent's 20-byte info hash.
    pub info_hash: [u8; 20],
    /// Our own peer id.
    pub peer_id: PeerId,
    /// The TCP port we accept peers on, as reported to trackers.
    pub port: u16,
    /// Piece metadata, indexed by piece index.
    pub pieces: Vec<PieceInfo>,
}

impl Torrent {
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Total payload size in bytes.
    pub fn total_length(&self) -> u64 {
        self.pieces.iter().map(|p| p.length as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_length_sums_pieces() {
        let torrent = Torrent {
            info_hash: [0; 20],
            peer_id: PeerId::generate(),
            port: 6881,
            pieces: vec![
                PieceInfo::new(0, 16384, [0; 20]),
                PieceInfo::new(1, 16384, [0; 20]),
                PieceInfo::new(2, 1000, [0; 20]),
            ],
        };
        assert_eq!(torrent.piece_count(), 3);
        assert_eq!(torrent.total_length(), 33768);
    }
}
