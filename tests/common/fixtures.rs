//! Incident and storage fixtures

use geoinfo::citizen_app::offline::Attachment;
use geoinfo::citizen_app::storage::{FileStore, MemoryStore};
use geoinfo::shared::IncidentPayload;
use std::sync::Arc;
use tempfile::TempDir;

/// A valid report with the given title
pub fn incident(title: &str) -> IncidentPayload {
    IncidentPayload::new(
        title,
        "Reported from the street, see the attached photo for details.",
        "VOIRIE",
        33.5731,
        -7.5898,
        4,
        "3f2b8c1e-8d4b-4a55-9d0e-1b2c3d4e5f60",
    )
}

pub fn photo(len: usize) -> Attachment {
    let data = (0..len).map(|i| (i % 251) as u8).collect();
    Attachment::new("street.jpg", "image/jpeg", data)
}

pub fn memory_storage() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// File store in a fresh directory, removed when the `TempDir` drops
pub fn file_storage() -> (TempDir, Arc<FileStore>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = FileStore::open(dir.path()).expect("file store");
    (dir, Arc::new(store))
}
