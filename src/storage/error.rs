use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid piece index: {0}")]
    InvalidPieceIndex(u32),

    #[error("piece {piece} has no data")]
    MissingPiece { piece: u32 },

    #[error("block out of bounds: piece {piece}, begin {begin}, length {length}")]
    BlockOutOfBounds { piece: u32, begin: u32, length: u32 },

    #[error("short write: piece {piece}, expected {expected} bytes, got {actual}")]
    ShortWrite {
        piece: u32,
        expected: u32,
        actual: usize,
    },
}
