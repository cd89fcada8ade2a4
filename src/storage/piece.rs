use sha1::{Digest, Sha1};

/// Metadata for a single torrent piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceInfo {
    /// The piece index.
    pub index: u32,
    /// Length of the piece in bytes (the last piece may be shorter).
    pub length: u32,
    /// Expected SHA-1 hash of the piece payload.
    pub hash: [u8; 20],
}

impl PieceInfo {
    pub fn new(index: u32, length: u32, hash: [u8; 20]) -> Self {
        Self {
            index,
            length,
            hash,
        }
    }

    /// Checks a candidate payload against the expected hash.
    pub fn verify(&self, data: &[u8]) -> bool {
        if data.len() != self.length as usize {
            return false;
        }
        let mut hasher = Sha1::new();
        hasher.update(data);
        hasher.finalize().as_slice() == self.hash
    }
}
