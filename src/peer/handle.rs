use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc;

use super::error::PeerError;
use super::peer_id::PeerId;

/// Capacity of the outbound command channel per peer.
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// An outbound message for a remote peer.
///
/// The transport behind the handle owns framing and the socket; the engine
/// only ever produces these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerCommand {
    Choke,
    Unchoke,
    Interested,
    NotInterested,
    Have {
        piece: u32,
    },
    Piece {
        piece: u32,
        begin: u32,
        data: Bytes,
    },
    Reject {
        piece: u32,
        begin: u32,
        length: u32,
    },
    Request {
        piece: u32,
        begin: u32,
        length: u32,
    },
}

/// Send side of a connected peer.
///
/// Cheap to clone; every clone feeds the same transport. Sends fail with
/// [`PeerError::ConnectionClosed`] once the transport is gone, which callers
/// are free to ignore because a `Disconnect` event follows anyway.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    id: PeerId,
    addr: SocketAddr,
    fast_extension: bool,
    commands: mpsc::Sender<PeerCommand>,
}

impl PeerHandle {
    /// Creates a handle and the command receiver its transport drains.
    pub fn channel(
        id: PeerId,
        addr: SocketAddr,
        fast_extension: bool,
    ) -> (Self, mpsc::Receiver<PeerCommand>) {
        let (commands, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        (
            Self {
                id,
                addr,
                fast_extension,
                commands,
            },
            rx,
        )
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether the peer negotiated the fast extension.
    pub fn supports_fast(&self) -> bool {
        self.fast_extension
    }

    pub async fn send_choke(&self) -> Result<(), PeerError> {
        self.send(PeerCommand::Choke).await
    }

    pub async fn send_unchoke(&self) -> Result<(), PeerError> {
        self.send(PeerCommand::Unchoke).await
    }

    pub async fn send_interested(&self) -> Result<(), PeerError> {
        self.send(PeerCommand::Interested).await
    }

    pub async fn send_not_interested(&self) -> Result<(), PeerError> {
        self.send(PeerCommand::NotInterested).await
    }

    pub async fn send_have(&self, piece: u32) -> Result<(), PeerError> {
        self.send(PeerCommand::Have { piece }).await
    }

    pub async fn send_piece(&self, piece: u32, begin: u32, data: Bytes) -> Result<(), PeerError> {
        self.send(PeerCommand::Piece { piece, begin, data }).await
    }

    pub async fn send_reject(&self, piece: u32, begin: u32, length: u32) -> Result<(), PeerError> {
        self.send(PeerCommand::Reject {
            piece,
            begin,
            length,
        })
        .await
    }

    pub async fn send_request(&self, piece: u32, begin: u32, length: u32) -> Result<(), PeerError> {
        self.send(PeerCommand::Request {
            piece,
            begin,
            length,
        })
        .await
    }

    async fn send(&self, command: PeerCommand) -> Result<(), PeerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PeerError::ConnectionClosed)
    }
}
