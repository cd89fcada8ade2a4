use thiserror::Error;

use crate::storage::StorageError;

/// Fatal download errors, surfaced on the engine's error channel.
///
/// Peer-side failures never show up here; they release the download slot
/// and the piece is rescheduled.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// A piece writer failed. The piece data is lost and the engine makes
    /// no attempt to recover.
    #[error("piece write failed: {0}")]
    Write(#[from] StorageError),
}
