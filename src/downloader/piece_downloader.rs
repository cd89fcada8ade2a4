use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::peer::{PeerError, PeerHandle, PeerId};
use crate::shutdown;
use crate::storage::PieceInfo;

/// Standard block size (16 KiB).
pub(crate) const BLOCK_SIZE: u32 = 16384;

/// A signal forwarded into a running piece download.
#[derive(Debug)]
pub(crate) enum DownloaderMessage {
    Block { begin: u32, data: Bytes },
    Choke,
    Unchoke,
}

/// The engine's grip on a running piece download.
///
/// Dropping the handle closes the channel, which the task observes as a
/// disconnect.
#[derive(Debug)]
pub(crate) struct DownloadHandle {
    pub(crate) piece_index: u32,
    pub(crate) peer_id: PeerId,
    tx: mpsc::UnboundedSender<DownloaderMessage>,
}

impl DownloadHandle {
    pub(crate) fn deliver(&self, message: DownloaderMessage) {
        let _ = self.tx.send(message);
    }
}

/// Terminal report of a piece download.
#[derive(Debug)]
pub(crate) struct DownloadOutcome {
    pub(crate) piece_index: u32,
    pub(crate) peer_id: PeerId,
    pub(crate) result: Result<Bytes, PeerError>,
}

/// Downloads one piece from one peer.
///
/// Requests blocks with a bounded pipeline, suspends on `Choke` (returning
/// outstanding blocks to the queue), resumes on `Unchoke`, and accumulates
/// payloads until the piece is complete. Terminates exactly once, with the
/// assembled bytes or a transient error.
pub(crate) struct PieceDownloader {
    piece: PieceInfo,
    peer: PeerHandle,
    rx: mpsc::UnboundedReceiver<DownloaderMessage>,
    buffer: Vec<u8>,
    received: HashSet<u32>,
    queued: VecDeque<u32>,
    in_flight: HashSet<u32>,
    choked: bool,
    pipeline_depth: usize,
    timeout: Duration,
}

impl PieceDownloader {
    pub(crate) fn new(
        piece: PieceInfo,
        peer: PeerHandle,
        pipeline_depth: usize,
        timeout: Duration,
    ) -> (Self, DownloadHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = DownloadHandle {
            piece_index: piece.index,
            peer_id: peer.id(),
            tx,
        };
        let queued = (0..piece.length.div_ceil(BLOCK_SIZE))
            .map(|block| block * BLOCK_SIZE)
            .collect();
        let downloader = Self {
            buffer: vec![0; piece.length as usize],
            received: HashSet::new(),
            queued,
            in_flight: HashSet::new(),
            choked: false,
            pipeline_depth,
            timeout,
            piece,
            peer,
            rx,
        };
        (downloader, handle)
    }

    /// Runs to completion. Returns `None` when cancelled by the stop signal.
    pub(crate) async fn run(mut self, mut stop: shutdown::Receiver) -> Option<DownloadOutcome> {
        let piece_index = self.piece.index;
        let peer_id = self.peer.id();
        let result = tokio::select! {
            _ = stop.recv() => return None,
            result = self.download() => result,
        };
        Some(DownloadOutcome {
            piece_index,
            peer_id,
            result,
        })
    }

    async fn download(&mut self) -> Result<Bytes, PeerError> {
        self.peer.send_interested().await?;
        self.request_more().await?;

        loop {
            if self.received.len() == self.block_count() {
                return Ok(Bytes::from(std::mem::take(&mut self.buffer)));
            }
            let message = match tokio::time::timeout(self.timeout, self.rx.recv()).await {
                Err(_) => return Err(PeerError::Timeout),
                Ok(None) => return Err(PeerError::ConnectionClosed),
                Ok(Some(message)) => message,
            };
            match message {
                DownloaderMessage::Block { begin, data } => {
                    self.accept_block(begin, data)?;
                    self.request_more().await?;
                }
                DownloaderMessage::Choke => {
                    self.choked = true;
                    // outstanding requests are likely dropped by the peer
                    self.queued.extend(self.in_flight.drain());
                }
                DownloaderMessage::Unchoke => {
                    self.choked = false;
                    self.request_more().await?;
                }
            }
        }
    }

    fn block_count(&self) -> usize {
        self.piece.length.div_ceil(BLOCK_SIZE) as usize
    }

    fn block_length(&self, begin: u32) -> u32 {
        BLOCK_SIZE.min(self.piece.length - begin)
    }

    fn accept_block(&mut self, begin: u32, data: Bytes) -> Result<(), PeerError> {
        if begin % BLOCK_SIZE != 0 || begin >= self.piece.length {
            return Err(PeerError::Protocol(format!("bad block offset {begin}")));
        }
        if data.len() != self.block_length(begin) as usize {
            return Err(PeerError::Protocol(format!(
                "bad block length {} at offset {begin}",
                data.len()
            )));
        }
        if !self.received.insert(begin) {
            // duplicate, e.g. re-requested across a choke
            return Ok(());
        }
        self.in_flight.remove(&begin);
        let begin = begin as usize;
        self.buffer[begin..begin + data.len()].copy_from_slice(&data);
        Ok(())
    }

    async fn request_more(&mut self) -> Result<(), PeerError> {
        while !self.choked && self.in_flight.len() < self.pipeline_depth {
            let Some(begin) = self.queued.pop_front() else {
                break;
            };
            if self.received.contains(&begin) {
                continue;
            }
            self.in_flight.insert(begin);
            self.peer
                .send_request(self.piece.index, begin, self.block_length(begin))
                .await?;
        }
        Ok(())
    }
}
