use crate::peer::PeerHandle;

/// Choke and interest state for one connected peer.
#[derive(Debug)]
pub(crate) struct ConnectedPeer {
    pub(crate) handle: PeerHandle,
    /// We are choking them.
    pub(crate) am_choking: bool,
    /// They are choking us.
    pub(crate) peer_choking: bool,
    /// We have told them we want data.
    pub(crate) am_interested: bool,
    pub(crate) optimistic_unchoked: bool,
    /// Payload bytes received this choke period; reset on every regular
    /// unchoke pass.
    pub(crate) bytes_downloaded: u64,
}

impl ConnectedPeer {
    pub(crate) fn new(handle: PeerHandle) -> Self {
        Self {
            handle,
            am_choking: true,
            peer_choking: true,
            am_interested: false,
            optimistic_unchoked: false,
            bytes_downloaded: 0,
        }
    }
}
