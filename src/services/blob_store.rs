//! Storage backends that signed links resolve against.
//!
//! Every call takes a [`Selection`] built for that request alone. Stores keep
//! no per-request state between calls.

use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::io::ReaderStream;

use crate::error::StoreError;

pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// What a request asks for: a path on one remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub remote: String,
    pub path: String,
}

impl Selection {
    pub fn new(remote: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            path: path.into(),
        }
    }
}

/// A single stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
    pub remote: String,
    /// Location within the remote, starting with `/`.
    pub key: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NotFound,
    Single(BlobObject),
    /// The path denotes more than one object, e.g. a directory.
    Multiple,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Resolve a selection to at most one object.
    async fn resolve(&self, selection: &Selection) -> Result<Resolution, StoreError>;

    /// Stream the bytes of a resolved object.
    async fn open(&self, object: &BlobObject) -> Result<ByteStream, StoreError>;
}

/// Split a request path into safe relative segments.
///
/// Returns `None` for anything that could leave the remote's root.
fn segments(path: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if parts.is_empty()
        || parts
            .iter()
            .any(|s| *s == "." || *s == ".." || s.contains('\\') || s.contains('\0'))
    {
        return None;
    }
    Some(parts)
}

/// Lookup failures that mean the path names nothing, e.g. `file.pdf/extra`.
fn is_missing(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory | io::ErrorKind::InvalidFilename
    )
}

/// Serves `root/<remote>/<path>` from the local filesystem.
///
/// A directory resolves to its only file when it holds exactly one, and is
/// ambiguous when it holds more.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn remote_root(&self, remote: &str) -> Result<PathBuf, StoreError> {
        let unknown = || StoreError::UnknownRemote(remote.to_string());
        if remote.is_empty() || remote.contains('/') {
            return Err(unknown());
        }
        let dir = self.root.join(remote);
        match tokio::fs::metadata(&dir).await {
            Ok(m) if m.is_dir() => Ok(dir),
            Ok(_) => Err(unknown()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(unknown()),
            Err(e) => Err(e.into()),
        }
    }

    /// Find up to two regular files below `dir`.
    async fn first_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let mut found = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    found.push(entry.path());
                    if found.len() > 1 {
                        return Ok(found);
                    }
                }
            }
        }

        Ok(found)
    }

    fn key_for(remote_root: &Path, file: &Path) -> String {
        let relative = file.strip_prefix(remote_root).unwrap_or(file);
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("/{}", parts.join("/"))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn resolve(&self, selection: &Selection) -> Result<Resolution, StoreError> {
        let remote_root = self.remote_root(&selection.remote).await?;
        let Some(parts) = segments(&selection.path) else {
            return Ok(Resolution::NotFound);
        };
        let target = parts.iter().fold(remote_root.clone(), |p, s| p.join(s));

        let metadata = match tokio::fs::metadata(&target).await {
            Ok(m) => m,
            Err(e) if is_missing(&e) => return Ok(Resolution::NotFound),
            Err(e) => return Err(e.into()),
        };

        if metadata.is_file() {
            return Ok(Resolution::Single(BlobObject {
                remote: selection.remote.clone(),
                key: format!("/{}", parts.join("/")),
                size: metadata.len(),
            }));
        }
        if !metadata.is_dir() {
            return Ok(Resolution::NotFound);
        }

        let files = Self::first_files(&target).await?;
        match files.as_slice() {
            [] => Ok(Resolution::NotFound),
            [file] => {
                let size = tokio::fs::metadata(file).await?.len();
                Ok(Resolution::Single(BlobObject {
                    remote: selection.remote.clone(),
                    key: Self::key_for(&remote_root, file),
                    size,
                }))
            }
            _ => Ok(Resolution::Multiple),
        }
    }

    async fn open(&self, object: &BlobObject) -> Result<ByteStream, StoreError> {
        let remote_root = self.remote_root(&object.remote).await?;
        let parts = segments(&object.key)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, object.key.clone()))?;
        let path = parts.iter().fold(remote_root, |p, s| p.join(s));

        let file = tokio::fs::File::open(&path).await?;
        Ok(ReaderStream::new(file).boxed())
    }
}

/// Keeps objects in memory, keyed by remote then path.
#[derive(Default)]
pub struct InMemoryBlobStore {
    remotes: Arc<RwLock<HashMap<String, BTreeMap<String, Bytes>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` at `path`, creating the remote if needed.
    pub async fn insert(&self, remote: &str, path: &str, data: impl Into<Bytes>) {
        let key = format!("/{}", path.trim_start_matches('/'));
        let mut remotes = self.remotes.write().await;
        remotes
            .entry(remote.to_string())
            .or_default()
            .insert(key, data.into());
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn resolve(&self, selection: &Selection) -> Result<Resolution, StoreError> {
        let remotes = self.remotes.read().await;
        let objects = remotes
            .get(&selection.remote)
            .ok_or_else(|| StoreError::UnknownRemote(selection.remote.clone()))?;

        let Some(parts) = segments(&selection.path) else {
            return Ok(Resolution::NotFound);
        };
        let key = format!("/{}", parts.join("/"));

        let single = |key: &String, data: &Bytes| {
            Resolution::Single(BlobObject {
                remote: selection.remote.clone(),
                key: key.clone(),
                size: data.len() as u64,
            })
        };

        if let Some(data) = objects.get(&key) {
            return Ok(single(&key, data));
        }

        let prefix = format!("{key}/");
        let mut below = objects
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix));

        match (below.next(), below.next()) {
            (None, _) => Ok(Resolution::NotFound),
            (Some((k, data)), None) => Ok(single(k, data)),
            (Some(_), Some(_)) => Ok(Resolution::Multiple),
        }
    }

    async fn open(&self, object: &BlobObject) -> Result<ByteStream, StoreError> {
        let remotes = self.remotes.read().await;
        let data = remotes
            .get(&object.remote)
            .and_then(|objects| objects.get(&object.key))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, object.key.clone()))?;

        Ok(stream::once(async move { Ok(data) }).boxed())
    }
}
