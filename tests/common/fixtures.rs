//! Test fixtures and constants.

use axum::body::Bytes;
use std::path::Path;

use rserve::services::InMemoryBlobStore;

/// Remote every test app serves
pub const REMOTE: &str = "files";

/// A small PDF-ish object
pub const REPORT_PATH: &str = "docs/report.pdf";
pub const REPORT_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n%%EOF\n";

/// A directory holding two files
pub const PAIR_DIR: &str = "pair";

/// A larger binary object, spans several stream chunks on disk
pub fn large_bytes() -> Vec<u8> {
    (0..200_000u32).map(|i| (i % 251) as u8).collect()
}

pub const LARGE_PATH: &str = "media/large.bin";

/// Seed an in-memory store with the standard objects
pub async fn seed(store: &InMemoryBlobStore) {
    store
        .insert(REMOTE, REPORT_PATH, Bytes::from_static(REPORT_BYTES))
        .await;
    store
        .insert(REMOTE, &format!("{PAIR_DIR}/a.txt"), Bytes::from_static(b"a"))
        .await;
    store
        .insert(REMOTE, &format!("{PAIR_DIR}/b.txt"), Bytes::from_static(b"b"))
        .await;
    store.insert(REMOTE, LARGE_PATH, large_bytes()).await;
}

/// Lay out the same objects under `root/<REMOTE>/`
pub fn seed_dir(root: &Path) {
    let remote = root.join(REMOTE);
    std::fs::create_dir_all(remote.join("docs")).unwrap();
    std::fs::create_dir_all(remote.join(PAIR_DIR)).unwrap();
    std::fs::create_dir_all(remote.join("media")).unwrap();
    std::fs::write(remote.join(REPORT_PATH), REPORT_BYTES).unwrap();
    std::fs::write(remote.join(PAIR_DIR).join("a.txt"), b"a").unwrap();
    std::fs::write(remote.join(PAIR_DIR).join("b.txt"), b"b").unwrap();
    std::fs::write(remote.join(LARGE_PATH), large_bytes()).unwrap();
}
