//! Queue durability tests against the file store

use crate::assert_queue_titles;
use crate::common::*;
use assert_matches::assert_matches;
use geoinfo::citizen_app::offline::{AttachmentError, AttachmentSource, QueueStore, QUEUE_STORAGE_KEY};
use geoinfo::citizen_app::storage::{FileStore, KeyValueStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn test_queue_survives_restart() {
    let (dir, storage) = file_storage();
    let queue = QueueStore::initialize(storage);

    let first = queue
        .enqueue(incident("Pothole near the mosque"), Some(photo(4096).into()))
        .await;
    queue.enqueue(incident("Street light out"), None).await;
    assert!(first.attachment_error.is_none());
    drop(queue);

    let reopened = Arc::new(FileStore::open(dir.path()).unwrap());
    let queue = QueueStore::initialize(reopened);

    assert_eq!(queue.len().await, 2);
    assert_queue_titles!(queue, ["Pothole near the mosque", "Street light out"]);

    let restored = queue.get(&first.item.id).await.unwrap();
    assert_eq!(restored, first.item);
    let attachment = restored.attachment.unwrap().decode().await.unwrap();
    assert_eq!(attachment, photo(4096));
}

#[tokio::test]
async fn test_clear_erases_persisted_queue() {
    let (dir, storage) = file_storage();
    let queue = QueueStore::initialize(storage.clone());
    queue.enqueue(incident("Fallen tree on road"), None).await;

    queue.clear().await;

    assert!(queue.is_empty().await);
    assert_eq!(storage.get(QUEUE_STORAGE_KEY).unwrap(), None);

    let reopened = QueueStore::initialize(Arc::new(FileStore::open(dir.path()).unwrap()));
    assert!(reopened.is_empty().await);
}

#[tokio::test]
async fn test_corrupt_queue_starts_empty() {
    let storage = memory_storage();
    storage.set(QUEUE_STORAGE_KEY, "{\"not\": \"a queue\"").unwrap();

    let queue = QueueStore::initialize(storage.clone());
    assert!(queue.is_empty().await);

    queue.enqueue(incident("Broken water pipe"), None).await;
    let raw = storage.get(QUEUE_STORAGE_KEY).unwrap().unwrap();
    assert!(raw.contains("Broken water pipe"));
}

#[tokio::test]
async fn test_unreadable_photo_still_queues_report() {
    let (dir, storage) = file_storage();
    let queue = QueueStore::initialize(storage);

    let missing = dir.path().join("deleted.jpg");
    let enqueued = queue
        .enqueue(incident("Abandoned car"), Some(AttachmentSource::File(missing)))
        .await;

    assert_matches!(enqueued.attachment_error, Some(AttachmentError::Io { .. }));
    assert!(enqueued.item.attachment.is_none());
    assert_eq!(queue.len().await, 1);
}

#[tokio::test]
async fn test_photo_from_file_is_kept() {
    let (dir, storage) = file_storage();
    let path = dir.path().join("capture.png");
    std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

    let queue = QueueStore::initialize(storage);
    let enqueued = queue
        .enqueue(incident("Graffiti on school"), Some(AttachmentSource::File(path)))
        .await;

    let attachment = enqueued.item.attachment.unwrap().decode().await.unwrap();
    assert_eq!(attachment.file_name, "capture.png");
    assert_eq!(attachment.data, vec![0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn test_length_is_published() {
    let queue = QueueStore::initialize(memory_storage());
    let mut length = queue.subscribe();
    assert_eq!(*length.borrow_and_update(), 0);

    let item = queue.enqueue(incident("Noise complaint"), None).await.item;
    assert!(length.has_changed().unwrap());
    assert_eq!(*length.borrow_and_update(), 1);

    queue.remove(&item.id).await;
    assert_eq!(*length.borrow_and_update(), 0);
}
