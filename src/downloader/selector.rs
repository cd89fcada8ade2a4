use std::collections::HashMap;

use crate::peer::{Bitfield, PeerId};

use super::peers::ConnectedPeer;
use super::piece::PieceEntry;
use super::piece_downloader::DownloadHandle;

/// Picks the next `(piece, peer)` pair to download, or `None`.
///
/// Pieces are scanned rarest first (availability ascending, piece index
/// breaking ties) over the eligible set. Within a piece, peers that granted
/// allowed-fast are preferred regardless of their choke state; otherwise
/// only peers that have unchoked us qualify. A peer already hosting a
/// download is never picked again, so downloads spread across peers.
pub(crate) fn next_download(
    pieces: &[PieceEntry],
    bitfield: &Bitfield,
    peers: &HashMap<PeerId, ConnectedPeer>,
    downloads: &HashMap<PeerId, DownloadHandle>,
) -> Option<(u32, PeerId)> {
    let mut order: Vec<&PieceEntry> = pieces.iter().collect();
    order.sort_by_key(|piece| (piece.availability(), piece.info.index));

    for piece in order {
        if !piece.eligible(bitfield) {
            continue;
        }
        for id in &piece.having_peers {
            if !piece.allowed_fast_peers.contains(id) {
                continue;
            }
            if downloads.contains_key(id) || !peers.contains_key(id) {
                continue;
            }
            return Some((piece.info.index, *id));
        }
        for id in &piece.having_peers {
            let Some(peer) = peers.get(id) else {
                continue;
            };
            if peer.peer_choking {
                continue;
            }
            if downloads.contains_key(id) {
                continue;
            }
            return Some((piece.info.index, *id));
        }
    }
    None
}
