use super::*;
use bytes::Bytes;

#[test]
fn test_peer_id_generate() {
    let id1 = PeerId::generate();
    let id2 = PeerId::generate();
    assert_ne!(id1.0, id2.0);
    assert_eq!(id1.client_id(), Some("DP0001"));
}

#[test]
fn test_peer_id_from_bytes() {
    assert!(PeerId::from_bytes(&[0u8; 19]).is_none());
    let id = PeerId::from_bytes(&[7u8; 20]).unwrap();
    assert_eq!(id.as_bytes(), &[7u8; 20]);
}

#[test]
fn test_bitfield() {
    let mut bf = Bitfield::new(100);
    assert!(!bf.has(0));

    bf.set(0);
    assert!(bf.has(0));

    bf.set(99);
    assert!(bf.has(99));

    assert_eq!(bf.count(), 2);
    assert_eq!(bf.len(), 100);
    assert!(!bf.is_complete());
}

#[test]
fn test_bitfield_out_of_range() {
    let mut bf = Bitfield::new(8);
    bf.set(8);
    assert!(!bf.has(8));
    assert_eq!(bf.count(), 0);
}

#[test]
fn test_bitfield_from_bytes() {
    let bytes = Bytes::from_static(&[0x80, 0x00]);
    let bf = Bitfield::from_bytes(bytes, 16);

    assert!(bf.has(0));
    assert!(!bf.has(1));
}

#[test]
fn test_bitfield_from_bytes_masks_spare_bits() {
    // 10 pieces: the low 6 bits of the second byte are spare.
    let bytes = Bytes::from_static(&[0xFF, 0xFF]);
    let bf = Bitfield::from_bytes(bytes, 10);

    assert_eq!(bf.count(), 10);
    assert_eq!(bf.as_bytes(), &[0xFF, 0xC0]);
}

#[test]
fn test_bitfield_full() {
    let bf = Bitfield::full(9);
    assert!(bf.is_complete());
    assert_eq!(bf.count(), 9);
}

#[tokio::test]
async fn test_handle_delivers_commands() {
    let addr = "127.0.0.1:6881".parse().unwrap();
    let (handle, mut rx) = PeerHandle::channel(PeerId::generate(), addr, true);

    handle.send_have(3).await.unwrap();
    handle.send_request(1, 0, 16384).await.unwrap();

    assert_eq!(rx.recv().await.unwrap(), PeerCommand::Have { piece: 3 });
    assert_eq!(
        rx.recv().await.unwrap(),
        PeerCommand::Request {
            piece: 1,
            begin: 0,
            length: 16384
        }
    );
    assert!(handle.supports_fast());
}

#[tokio::test]
async fn test_handle_send_after_transport_gone() {
    let addr = "127.0.0.1:6881".parse().unwrap();
    let (handle, rx) = PeerHandle::channel(PeerId::generate(), addr, false);
    drop(rx);

    assert!(matches!(
        handle.send_unchoke().await,
        Err(PeerError::ConnectionClosed)
    ));
}
