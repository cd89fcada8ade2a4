use super::*;
use sha1::{Digest, Sha1};

fn hash_of(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[test]
fn test_piece_verify() {
    let data = vec![0xABu8; 512];
    let info = PieceInfo::new(0, 512, hash_of(&data));

    assert!(info.verify(&data));
    assert!(!info.verify(&vec![0xACu8; 512]));
}

#[test]
fn test_piece_verify_rejects_wrong_length() {
    let data = vec![1u8; 100];
    let info = PieceInfo::new(0, 100, hash_of(&data));

    assert!(!info.verify(&data[..99]));
}

#[tokio::test]
async fn test_memory_store_roundtrip() {
    let store = MemoryStore::new(vec![8, 4]);
    store.write_piece(0, &[1, 2, 3, 4, 5, 6, 7, 8]).await.unwrap();

    let block = store.read_block(0, 2, 4).await.unwrap();
    assert_eq!(block.as_ref(), &[3, 4, 5, 6]);
    assert_eq!(store.written_count(), 1);
}

#[tokio::test]
async fn test_memory_store_read_unwritten_piece() {
    let store = MemoryStore::new(vec![8]);
    assert!(matches!(
        store.read_block(0, 0, 4).await,
        Err(StorageError::MissingPiece { piece: 0 })
    ));
}

#[tokio::test]
async fn test_memory_store_bounds() {
    let store = MemoryStore::new(vec![8]);
    store.write_piece(0, &[0u8; 8]).await.unwrap();

    assert!(matches!(
        store.read_block(0, 6, 4).await,
        Err(StorageError::BlockOutOfBounds { .. })
    ));
    assert!(matches!(
        store.read_block(1, 0, 1).await,
        Err(StorageError::InvalidPieceIndex(1))
    ));
}

#[tokio::test]
async fn test_memory_store_rejects_partial_piece() {
    let store = MemoryStore::new(vec![8]);
    assert!(matches!(
        store.write_piece(0, &[0u8; 4]).await,
        Err(StorageError::ShortWrite { .. })
    ));
}
