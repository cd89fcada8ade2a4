use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use crate::shutdown;
use crate::storage::{PieceStore, StorageError};

/// A verified piece waiting to be persisted.
#[derive(Debug)]
pub(crate) struct WriteRequest {
    pub(crate) piece_index: u32,
    pub(crate) data: Bytes,
}

#[derive(Debug)]
pub(crate) struct WriteResponse {
    pub(crate) piece_index: u32,
    pub(crate) error: Option<StorageError>,
}

/// One worker of the piece-writer pool.
///
/// All workers drain the same capacity-1 request queue, so the engine
/// blocks on submit once every worker is busy. Writes for distinct pieces
/// may complete out of order; the engine never submits the same piece
/// twice concurrently.
pub(crate) struct PieceWriter {
    requests: Arc<Mutex<mpsc::Receiver<WriteRequest>>>,
    responses: mpsc::Sender<WriteResponse>,
    store: Arc<dyn PieceStore>,
}

impl PieceWriter {
    pub(crate) fn new(
        requests: Arc<Mutex<mpsc::Receiver<WriteRequest>>>,
        responses: mpsc::Sender<WriteResponse>,
        store: Arc<dyn PieceStore>,
    ) -> Self {
        Self {
            requests,
            responses,
            store,
        }
    }

    pub(crate) async fn run(self, mut stop: shutdown::Receiver) {
        loop {
            let request = {
                let mut requests = self.requests.lock().await;
                tokio::select! {
                    _ = stop.recv() => return,
                    request = requests.recv() => request,
                }
            };
            let Some(request) = request else {
                return;
            };

            let error = self
                .store
                .write_piece(request.piece_index, &request.data)
                .await
                .err();
            let response = WriteResponse {
                piece_index: request.piece_index,
                error,
            };
            tokio::select! {
                _ = stop.recv() => return,
                _ = self.responses.send(response) => {}
            }
        }
    }
}
