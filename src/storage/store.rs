use async_trait::async_trait;
use bytes::Bytes;

use super::error::StorageError;

/// Random-access piece storage.
///
/// Reads and writes may run concurrently from different tasks; the engine
/// serialises writes per piece, so implementations only need whole-piece
/// write atomicity with respect to block reads of that same piece.
#[async_trait]
pub trait PieceStore: Send + Sync + 'static {
    /// Reads `length` bytes at offset `begin` within piece `index`.
    async fn read_block(&self, index: u32, begin: u32, length: u32)
        -> Result<Bytes, StorageError>;

    /// Writes the complete payload of piece `index`.
    async fn write_piece(&self, index: u32, data: &[u8]) -> Result<(), StorageError>;
}
