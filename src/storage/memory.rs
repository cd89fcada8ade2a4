use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::error::StorageError;
use super::store::PieceStore;

/// An in-memory piece store.
///
/// Holds complete piece payloads in a map. Useful for tests and for
/// embedders that stream pieces elsewhere instead of spooling to disk.
pub struct MemoryStore {
    lengths: Vec<u32>,
    pieces: RwLock<HashMap<u32, Bytes>>,
}

impl MemoryStore {
    /// Creates a store for pieces with the given lengths, indexed by position.
    pub fn new(lengths: Vec<u32>) -> Self {
        Self {
            lengths,
            pieces: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the stored payload of a piece, if written.
    pub fn piece(&self, index: u32) -> Option<Bytes> {
        self.pieces.read().get(&index).cloned()
    }

    /// Number of pieces written so far.
    pub fn written_count(&self) -> usize {
        self.pieces.read().len()
    }

    fn piece_length(&self, index: u32) -> Result<u32, StorageError> {
        self.lengths
            .get(index as usize)
            .copied()
            .ok_or(StorageError::InvalidPieceIndex(index))
    }
}

#[async_trait]
impl PieceStore for MemoryStore {
    async fn read_block(
        &self,
        index: u32,
        begin: u32,
        length: u32,
    ) -> Result<Bytes, StorageError> {
        let piece_length = self.piece_length(index)?;
        let end = begin as u64 + length as u64;
        if end > piece_length as u64 {
            return Err(StorageError::BlockOutOfBounds {
                piece: index,
                begin,
                length,
            });
        }

        let pieces = self.pieces.read();
        let data = pieces
            .get(&index)
            .ok_or(StorageError::MissingPiece { piece: index })?;
        Ok(data.slice(begin as usize..end as usize))
    }

    async fn write_piece(&self, index: u32, data: &[u8]) -> Result<(), StorageError> {
        let piece_length = self.piece_length(index)?;
        if data.len() != piece_length as usize {
            return Err(StorageError::ShortWrite {
                piece: index,
                expected: piece_length,
                actual: data.len(),
            });
        }
        self.pieces
            .write()
            .insert(index, Bytes::copy_from_slice(data));
        Ok(())
    }
}
