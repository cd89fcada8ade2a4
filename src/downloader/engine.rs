use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use rand::Rng as _;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info, warn};

use crate::announcer::TransferRequest;
use crate::config::Config;
use crate::peer::{Bitfield, PeerEvent, PeerId};
use crate::shutdown;
use crate::storage::PieceStore;
use crate::torrent::Torrent;
use crate::tracker::Transfer;
use crate::worker::Workers;

use super::error::DownloadError;
use super::peers::ConnectedPeer;
use super::piece::PieceEntry;
use super::piece_downloader::{DownloadHandle, DownloadOutcome, DownloaderMessage, PieceDownloader};
use super::selector;
use super::slots::DownloadSlots;
use super::writer::{PieceWriter, WriteRequest, WriteResponse};

/// The download orchestrator for one torrent.
///
/// Owns every piece of mutable swarm state and processes events strictly
/// one at a time. Outbound peer traffic is fired from detached tasks that
/// capture immutable data only, so the loop itself never waits on a peer.
pub struct Downloader {
    info_hash: [u8; 20],
    peer_id: PeerId,
    port: u16,
    store: Arc<dyn PieceStore>,
    config: Config,

    bitfield: Bitfield,
    pieces: Vec<PieceEntry>,
    peers: HashMap<PeerId, ConnectedPeer>,
    downloads: HashMap<PeerId, DownloadHandle>,
    slots: DownloadSlots,
    optimistic_unchoked: Option<PeerId>,
    uploaded: u64,
    downloaded: u64,

    events_rx: mpsc::Receiver<PeerEvent>,
    download_done_tx: mpsc::Sender<DownloadOutcome>,
    download_done_rx: mpsc::Receiver<DownloadOutcome>,
    write_requests_tx: mpsc::Sender<WriteRequest>,
    write_requests_rx: Option<mpsc::Receiver<WriteRequest>>,
    write_responses_tx: mpsc::Sender<WriteResponse>,
    write_responses_rx: mpsc::Receiver<WriteResponse>,
    transfers_tx: mpsc::Sender<TransferRequest>,
    transfers_rx: mpsc::Receiver<TransferRequest>,
    completed_tx: broadcast::Sender<()>,
    error_tx: mpsc::Sender<DownloadError>,
    workers: Workers,
}

impl Downloader {
    pub fn new(
        torrent: Torrent,
        store: Arc<dyn PieceStore>,
        events: mpsc::Receiver<PeerEvent>,
        error_tx: mpsc::Sender<DownloadError>,
        config: Config,
    ) -> Self {
        let piece_count = torrent.pieces.len();
        let pieces = torrent.pieces.into_iter().map(PieceEntry::new).collect();

        let parallel_downloads = config.parallel_piece_downloads.max(1);
        let parallel_writes = config.parallel_piece_writes.max(1);
        let (download_done_tx, download_done_rx) = mpsc::channel(parallel_downloads);
        // capacity 1: the loop blocks once every writer is busy
        let (write_requests_tx, write_requests_rx) = mpsc::channel(1);
        let (write_responses_tx, write_responses_rx) = mpsc::channel(parallel_writes);
        let (transfers_tx, transfers_rx) = mpsc::channel(1);
        let (completed_tx, _) = broadcast::channel(1);

        Self {
            info_hash: torrent.info_hash,
            peer_id: torrent.peer_id,
            port: torrent.port,
            store,
            bitfield: Bitfield::new(piece_count),
            pieces,
            peers: HashMap::new(),
            downloads: HashMap::new(),
            slots: DownloadSlots::new(parallel_downloads),
            optimistic_unchoked: None,
            uploaded: 0,
            downloaded: 0,
            events_rx: events,
            download_done_tx,
            download_done_rx,
            write_requests_tx,
            write_requests_rx: Some(write_requests_rx),
            write_responses_tx,
            write_responses_rx,
            transfers_tx,
            transfers_rx,
            completed_tx,
            error_tx,
            workers: Workers::new(),
            config,
        }
    }

    /// Endpoint for announcers requesting progress snapshots.
    pub fn transfer_requests(&self) -> mpsc::Sender<TransferRequest> {
        self.transfers_tx.clone()
    }

    /// Fires once when the last piece hits storage.
    pub fn completed(&self) -> broadcast::Receiver<()> {
        self.completed_tx.subscribe()
    }

    /// The local piece bitfield.
    pub fn bitfield(&self) -> &Bitfield {
        &self.bitfield
    }

    /// Runs the event loop until the stop signal.
    pub async fn run(mut self, mut stop: shutdown::Receiver) {
        if let Some(write_requests) = self.write_requests_rx.take() {
            let write_requests = Arc::new(Mutex::new(write_requests));
            for _ in 0..self.config.parallel_piece_writes.max(1) {
                let writer = PieceWriter::new(
                    write_requests.clone(),
                    self.write_responses_tx.clone(),
                    self.store.clone(),
                );
                self.workers.start(writer.run(stop.clone()));
            }
        }

        let mut unchoke_timer = interval_at(
            Instant::now() + self.config.unchoke_interval,
            self.config.unchoke_interval,
        );
        let mut optimistic_timer = interval_at(
            Instant::now() + self.config.optimistic_unchoke_interval,
            self.config.optimistic_unchoke_interval,
        );

        loop {
            let can_schedule = self.slots.ready(self.downloads.len());
            tokio::select! {
                _ = stop.recv() => break,
                _ = std::future::ready(()), if can_schedule => {
                    self.launch_next(&stop);
                }
                Some(outcome) = self.download_done_rx.recv() => {
                    if self.handle_download_done(outcome, &mut stop).await.is_break() {
                        break;
                    }
                }
                Some(response) = self.write_responses_rx.recv() => {
                    if self.handle_write_response(response, &mut stop).await.is_break() {
                        break;
                    }
                }
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event);
                }
                Some(request) = self.transfers_rx.recv() => {
                    self.handle_transfer_request(request);
                }
                _ = unchoke_timer.tick() => self.regular_unchoke(),
                _ = optimistic_timer.tick() => self.optimistic_unchoke(),
            }
        }

        self.workers.stop().await;
    }

    /// Asks the selector for work and launches a piece download.
    fn launch_next(&mut self, stop: &shutdown::Receiver) {
        let picked = selector::next_download(&self.pieces, &self.bitfield, &self.peers, &self.downloads);
        let Some((piece_index, peer_id)) = picked else {
            self.slots.block();
            return;
        };
        let Some(peer) = self.peers.get(&peer_id) else {
            self.slots.block();
            return;
        };

        debug!(piece = piece_index, peer = %peer_id, "downloading piece");
        let (task, handle) = PieceDownloader::new(
            self.pieces[piece_index as usize].info.clone(),
            peer.handle.clone(),
            self.config.request_pipeline_depth,
            self.config.block_request_timeout,
        );
        self.downloads.insert(peer_id, handle);
        self.pieces[piece_index as usize].requested_peer = Some(peer_id);
        self.slots.take();

        let done_tx = self.download_done_tx.clone();
        let mut task_stop = stop.clone();
        self.workers.start(async move {
            if let Some(outcome) = task.run(task_stop.clone()).await {
                tokio::select! {
                    _ = task_stop.recv() => {}
                    _ = done_tx.send(outcome) => {}
                }
            }
        });
    }

    async fn handle_download_done(
        &mut self,
        outcome: DownloadOutcome,
        stop: &mut shutdown::Receiver,
    ) -> ControlFlow<()> {
        let index = outcome.piece_index as usize;
        self.downloads.remove(&outcome.peer_id);
        if self.pieces[index].requested_peer == Some(outcome.peer_id) {
            self.pieces[index].requested_peer = None;
        }
        self.slots.signal(1);

        match outcome.result {
            Ok(data) => {
                if !self.pieces[index].info.verify(&data) {
                    debug!(
                        piece = outcome.piece_index,
                        peer = %outcome.peer_id,
                        "piece failed hash check, dropping"
                    );
                    return ControlFlow::Continue(());
                }
                let request = WriteRequest {
                    piece_index: outcome.piece_index,
                    data,
                };
                tokio::select! {
                    _ = stop.recv() => return ControlFlow::Break(()),
                    result = self.write_requests_tx.send(request) => {
                        if result.is_err() {
                            return ControlFlow::Break(());
                        }
                        self.pieces[index].writing = true;
                    }
                }
            }
            Err(error) => {
                warn!(
                    piece = outcome.piece_index,
                    peer = %outcome.peer_id,
                    %error,
                    "could not download piece"
                );
            }
        }
        ControlFlow::Continue(())
    }

    async fn handle_write_response(
        &mut self,
        response: WriteResponse,
        stop: &mut shutdown::Receiver,
    ) -> ControlFlow<()> {
        let index = response.piece_index as usize;
        self.pieces[index].writing = false;

        if let Some(storage_error) = response.error {
            error!(piece = response.piece_index, error = %storage_error, "piece write failed");
            let fatal = DownloadError::Write(storage_error);
            tokio::select! {
                _ = stop.recv() => return ControlFlow::Break(()),
                _ = self.error_tx.send(fatal) => {}
            }
            return ControlFlow::Continue(());
        }

        self.bitfield.set(index);
        self.downloaded += self.pieces[index].info.length as u64;
        if self.bitfield.is_complete() {
            info!("download complete");
            let _ = self.completed_tx.send(());
        }

        // tell everyone that we have this piece
        let piece = response.piece_index;
        let ids: Vec<PeerId> = self.peers.keys().copied().collect();
        for id in ids {
            if let Some(peer) = self.peers.get(&id) {
                let handle = peer.handle.clone();
                tokio::spawn(async move {
                    let _ = handle.send_have(piece).await;
                });
            }
            self.update_interest(id);
        }
        ControlFlow::Continue(())
    }

    fn handle_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::Connect(handle) => {
                let id = handle.id();
                debug!(peer = %id, addr = %handle.addr(), "peer connected");
                self.peers.insert(id, ConnectedPeer::new(handle));
                if self.peers.len() <= self.config.initial_unchoke_connected_threshold {
                    self.unchoke_peer(id);
                }
            }
            PeerEvent::Disconnect(id) => {
                debug!(peer = %id, "peer disconnected");
                self.peers.remove(&id);
                self.downloads.remove(&id);
                for piece in &mut self.pieces {
                    piece.forget_peer(&id);
                }
                if self.optimistic_unchoked == Some(id) {
                    self.optimistic_unchoked = None;
                }
            }
            PeerEvent::Have { peer, piece } => {
                if !self.peers.contains_key(&peer) {
                    return;
                }
                let Some(entry) = self.pieces.get_mut(piece as usize) else {
                    warn!(peer = %peer, piece, "have for unknown piece");
                    return;
                };
                entry.having_peers.insert(peer);
                self.slots.signal(1);
                self.update_interest(peer);
            }
            PeerEvent::Bitfield { peer, bitfield } => {
                if !self.peers.contains_key(&peer) {
                    return;
                }
                for index in 0..bitfield.len().min(self.pieces.len()) {
                    if bitfield.has(index) {
                        self.pieces[index].having_peers.insert(peer);
                    }
                }
                self.slots.signal(bitfield.count());
                self.update_interest(peer);
            }
            PeerEvent::HaveAll { peer } => {
                if !self.peers.contains_key(&peer) {
                    return;
                }
                for piece in &mut self.pieces {
                    piece.having_peers.insert(peer);
                }
                self.slots.signal(self.pieces.len());
                self.update_interest(peer);
            }
            PeerEvent::AllowedFast { peer, piece } => {
                if !self.peers.contains_key(&peer) {
                    return;
                }
                if let Some(entry) = self.pieces.get_mut(piece as usize) {
                    entry.allowed_fast_peers.insert(peer);
                }
            }
            PeerEvent::Unchoke(peer) => {
                if let Some(state) = self.peers.get_mut(&peer) {
                    state.peer_choking = false;
                }
                if let Some(handle) = self.downloads.get(&peer) {
                    handle.deliver(DownloaderMessage::Unchoke);
                }
                self.slots.signal(1);
            }
            PeerEvent::Choke(peer) => {
                if let Some(state) = self.peers.get_mut(&peer) {
                    state.peer_choking = true;
                }
                if let Some(handle) = self.downloads.get(&peer) {
                    handle.deliver(DownloaderMessage::Choke);
                }
            }
            PeerEvent::Piece {
                peer,
                piece,
                begin,
                data,
            } => {
                if let Some(state) = self.peers.get_mut(&peer) {
                    state.bytes_downloaded += data.len() as u64;
                }
                if let Some(handle) = self.downloads.get(&peer) {
                    if handle.piece_index == piece {
                        handle.deliver(DownloaderMessage::Block { begin, data });
                    }
                }
            }
            PeerEvent::Request {
                peer,
                piece,
                begin,
                length,
            } => {
                self.handle_request(peer, piece, begin, length);
            }
        }
    }

    /// Serves (or rejects) a block request from a peer.
    fn handle_request(&mut self, peer: PeerId, piece: u32, begin: u32, length: u32) {
        let Some(state) = self.peers.get(&peer) else {
            return;
        };
        let handle = state.handle.clone();
        if state.am_choking {
            if handle.supports_fast() {
                tokio::spawn(async move {
                    let _ = handle.send_reject(piece, begin, length).await;
                });
            }
            return;
        }
        if self.pieces.get(piece as usize).is_none() {
            warn!(peer = %peer, piece, "request for unknown piece");
            return;
        }
        let store = self.store.clone();
        tokio::spawn(async move {
            match store.read_block(piece, begin, length).await {
                Ok(data) => {
                    let _ = handle.send_piece(piece, begin, data).await;
                }
                Err(error) => {
                    warn!(piece, begin, %error, "could not read block for upload");
                }
            }
        });
        self.uploaded += length as u64;
    }

    fn handle_transfer_request(&mut self, request: TransferRequest) {
        let left = self
            .pieces
            .iter()
            .filter(|piece| !self.bitfield.has(piece.info.index as usize))
            .map(|piece| piece.info.length as u64)
            .sum();
        let _ = request.reply.send(Transfer {
            info_hash: self.info_hash,
            peer_id: self.peer_id,
            port: self.port,
            uploaded: self.uploaded,
            downloaded: self.downloaded,
            left,
        });
    }

    /// Regular unchoke pass: keep the top downloaders unchoked, choke the
    /// rest. The optimistic peer keeps its slot regardless.
    fn regular_unchoke(&mut self) {
        let mut ranked: Vec<(PeerId, u64)> = self
            .peers
            .iter()
            .filter(|(_, state)| !state.optimistic_unchoked)
            .map(|(id, state)| (*id, state.bytes_downloaded))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        for state in self.peers.values_mut() {
            state.bytes_downloaded = 0;
        }

        let slots = self.config.regular_unchoke_slots;
        let ids: Vec<PeerId> = ranked.iter().map(|(id, _)| *id).collect();
        for (rank, id) in ids.into_iter().enumerate() {
            if rank < slots {
                self.unchoke_peer(id);
            } else {
                self.choke_peer(id);
            }
        }
    }

    /// Rotates the optimistic unchoke slot to a random choked peer.
    fn optimistic_unchoke(&mut self) {
        let candidates: Vec<PeerId> = self
            .peers
            .iter()
            .filter(|(_, state)| state.am_choking && !state.optimistic_unchoked)
            .map(|(id, _)| *id)
            .collect();
        if candidates.is_empty() {
            return;
        }

        if let Some(previous) = self.optimistic_unchoked.take() {
            if let Some(state) = self.peers.get_mut(&previous) {
                state.optimistic_unchoked = false;
            }
            self.choke_peer(previous);
        }

        let picked = candidates[rand::rng().random_range(0..candidates.len())];
        if let Some(state) = self.peers.get_mut(&picked) {
            state.optimistic_unchoked = true;
        }
        debug!(peer = %picked, "optimistic unchoke");
        self.unchoke_peer(picked);
        self.optimistic_unchoked = Some(picked);
    }

    /// Recomputes interest in a peer and notifies it on change.
    fn update_interest(&mut self, id: PeerId) {
        let interested = self.pieces.iter().any(|piece| {
            !self.bitfield.has(piece.info.index as usize) && piece.having_peers.contains(&id)
        });
        let Some(state) = self.peers.get_mut(&id) else {
            return;
        };
        if state.am_interested == interested {
            return;
        }
        state.am_interested = interested;
        let handle = state.handle.clone();
        tokio::spawn(async move {
            let _ = if interested {
                handle.send_interested().await
            } else {
                handle.send_not_interested().await
            };
        });
    }

    fn choke_peer(&mut self, id: PeerId) {
        if let Some(state) = self.peers.get_mut(&id) {
            if !state.am_choking {
                state.am_choking = true;
                let handle = state.handle.clone();
                tokio::spawn(async move {
                    let _ = handle.send_choke().await;
                });
            }
        }
    }

    fn unchoke_peer(&mut self, id: PeerId) {
        if let Some(state) = self.peers.get_mut(&id) {
            if state.am_choking {
                state.am_choking = false;
                let handle = state.handle.clone();
                tokio::spawn(async move {
                    let _ = handle.send_unchoke().await;
                });
            }
        }
    }
}
