//! Object storage capability and its local filesystem backend.
//!
//! [`ObjectStore`] is the only I/O boundary of the gateway: every read, write,
//! stat, delete and directory walk goes through it. Nothing is cached between
//! calls, so metadata always reflects the disk.
//!
//! [`LocalFsStore`] maps each object to a regular file at
//! `root/bucket/key`. Directories are implied by keys and created on write;
//! they are never reported as objects.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, trace, warn};

use crate::checksums;
use crate::error::{GatewayError, GatewayResult};
use crate::keypath::{BucketPath, KeyPathCodec, ObjectPath, key_from_relative};

/// Readable object body.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Writable object body. Dropping it closes the underlying handle.
pub type ObjectWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Lazy sequence of object keys under a bucket, in no particular order.
pub type KeyStream = BoxStream<'static, GatewayResult<String>>;

/// Size and modification time of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectStat {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
}

/// Hierarchical byte storage addressed by resolved object paths.
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// The codec that produced the paths this store accepts.
    fn codec(&self) -> &KeyPathCodec;

    /// Whether an object exists at `object`.
    async fn exists(&self, object: &ObjectPath) -> GatewayResult<bool>;

    /// Size and mtime of `object`. Fails with `NoSuchKey` if absent.
    async fn stat(&self, object: &ObjectPath) -> GatewayResult<ObjectStat>;

    /// Open `object` for reading.
    async fn open_read(&self, object: &ObjectPath) -> GatewayResult<ObjectReader>;

    /// Open `object` for writing, truncating any previous content and
    /// creating the directories its key implies.
    async fn open_write(&self, object: &ObjectPath) -> GatewayResult<ObjectWriter>;

    /// Remove `object`. Fails with `NoSuchKey` if absent.
    async fn delete(&self, object: &ObjectPath) -> GatewayResult<()>;

    /// Enumerate every object key under `bucket`.
    ///
    /// Each call starts a fresh walk. A bucket that does not exist yields an
    /// empty stream.
    async fn enumerate_all(&self, bucket: &BucketPath) -> GatewayResult<KeyStream>;

    /// Hex MD5 of the stored bytes, streamed from disk.
    async fn content_hash(&self, object: &ObjectPath) -> GatewayResult<String> {
        let mut reader = self.open_read(object).await?;
        checksums::hash_reader(&mut reader)
            .await
            .map_err(|e| GatewayError::from_io(e, object.key(), "hash"))
    }
}

// ---------------------------------------------------------------------------
// LocalFsStore
// ---------------------------------------------------------------------------

/// [`ObjectStore`] backed by a directory tree.
#[derive(Debug, Clone)]
pub struct LocalFsStore {
    codec: KeyPathCodec,
}

impl LocalFsStore {
    /// Open a store at `root`, creating the directory if needed.
    ///
    /// The root is canonicalized once here; every later containment check
    /// compares against the canonical form.
    pub async fn open(root: impl AsRef<Path>) -> GatewayResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).await.map_err(|e| {
            GatewayError::Internal(anyhow::anyhow!(
                "failed to create storage root {}: {e}",
                root.display()
            ))
        })?;
        let canonical = fs::canonicalize(root).await.map_err(|e| {
            GatewayError::Internal(anyhow::anyhow!(
                "failed to canonicalize storage root {}: {e}",
                root.display()
            ))
        })?;
        info!(root = %canonical.display(), "opened local storage");
        Ok(Self {
            codec: KeyPathCodec::new(canonical),
        })
    }

    /// Verify that `path`, with symlinks resolved, stays under the root.
    ///
    /// Only the deepest existing ancestor can be canonicalized; the missing
    /// tail was already checked lexically by the codec.
    async fn confine(&self, path: &Path) -> GatewayResult<()> {
        let root = self.codec.root();
        let mut candidate = path.to_path_buf();
        loop {
            match fs::canonicalize(&candidate).await {
                Ok(real) => {
                    if real.starts_with(root) {
                        return Ok(());
                    }
                    warn!(
                        path = %path.display(),
                        resolved = %real.display(),
                        "rejecting path that escapes the storage root"
                    );
                    return Err(GatewayError::invalid_request(
                        "Path resolves outside the storage root",
                    ));
                }
                Err(e) if is_missing(&e) => {
                    // a dangling link would be followed by a later create
                    if is_symlink(&candidate).await {
                        warn!(
                            path = %path.display(),
                            link = %candidate.display(),
                            "rejecting path through a dangling symlink"
                        );
                        return Err(GatewayError::invalid_request(
                            "Path resolves outside the storage root",
                        ));
                    }
                    if !candidate.pop() || !candidate.starts_with(root) {
                        return Err(GatewayError::invalid_request(
                            "Path resolves outside the storage root",
                        ));
                    }
                }
                Err(e) => {
                    return Err(GatewayError::Internal(anyhow::anyhow!(
                        "failed to canonicalize {}: {e}",
                        candidate.display()
                    )));
                }
            }
        }
    }

    async fn file_metadata(&self, object: &ObjectPath) -> GatewayResult<std::fs::Metadata> {
        self.confine(object.path()).await?;
        let meta = fs::metadata(object.path())
            .await
            .map_err(|e| GatewayError::from_io(e, object.key(), "stat"))?;
        if meta.is_file() {
            Ok(meta)
        } else {
            Err(GatewayError::NoSuchKey {
                key: object.key().to_owned(),
            })
        }
    }
}

#[async_trait]
impl ObjectStore for LocalFsStore {
    fn codec(&self) -> &KeyPathCodec {
        &self.codec
    }

    async fn exists(&self, object: &ObjectPath) -> GatewayResult<bool> {
        match self.file_metadata(object).await {
            Ok(_) => Ok(true),
            Err(GatewayError::NoSuchKey { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn stat(&self, object: &ObjectPath) -> GatewayResult<ObjectStat> {
        let meta = self.file_metadata(object).await?;
        let modified = meta
            .modified()
            .map_err(|e| GatewayError::from_io(e, object.key(), "read mtime of"))?;
        Ok(ObjectStat {
            size: meta.len(),
            last_modified: DateTime::<Utc>::from(modified),
        })
    }

    async fn open_read(&self, object: &ObjectPath) -> GatewayResult<ObjectReader> {
        self.confine(object.path()).await?;
        let file = fs::File::open(object.path())
            .await
            .map_err(|e| GatewayError::from_io(e, object.key(), "open"))?;
        let meta = file
            .metadata()
            .await
            .map_err(|e| GatewayError::from_io(e, object.key(), "stat"))?;
        if !meta.is_file() {
            return Err(GatewayError::NoSuchKey {
                key: object.key().to_owned(),
            });
        }
        trace!(key = %object.key(), size = meta.len(), "opened object for read");
        Ok(Box::pin(file))
    }

    async fn open_write(&self, object: &ObjectPath) -> GatewayResult<ObjectWriter> {
        let path = object.path();
        self.confine(path).await?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                GatewayError::Internal(anyhow::anyhow!(
                    "failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let file = fs::File::create(path).await.map_err(|e| {
            GatewayError::Internal(anyhow::anyhow!(
                "failed to create {}: {e}",
                path.display()
            ))
        })?;
        trace!(key = %object.key(), "opened object for write");
        Ok(Box::pin(file))
    }

    async fn delete(&self, object: &ObjectPath) -> GatewayResult<()> {
        self.file_metadata(object).await?;
        fs::remove_file(object.path())
            .await
            .map_err(|e| GatewayError::from_io(e, object.key(), "delete"))?;
        debug!(bucket = %object.bucket().name(), key = %object.key(), "deleted object");
        Ok(())
    }

    async fn enumerate_all(&self, bucket: &BucketPath) -> GatewayResult<KeyStream> {
        let root = bucket.path().to_path_buf();
        self.confine(&root).await?;
        let walk = DirWalk {
            stack: vec![root.clone()],
            base: root,
            current: None,
        };
        let stream = futures::stream::unfold(walk, |mut walk| async move {
            walk.next_key().await.map(|item| (item, walk))
        });
        Ok(Box::pin(stream))
    }
}

// ---------------------------------------------------------------------------
// DirWalk
// ---------------------------------------------------------------------------

/// Depth-first walk that yields regular files as keys relative to `base`.
///
/// Symlinks are neither followed nor reported. Directories that disappear
/// mid-walk are skipped.
struct DirWalk {
    base: PathBuf,
    stack: Vec<PathBuf>,
    current: Option<fs::ReadDir>,
}

impl DirWalk {
    async fn next_key(&mut self) -> Option<GatewayResult<String>> {
        loop {
            let entries = match self.current.as_mut() {
                Some(entries) => entries,
                None => {
                    let dir = self.stack.pop()?;
                    match fs::read_dir(&dir).await {
                        Ok(entries) => self.current = Some(entries),
                        Err(e) if is_missing(&e) => {}
                        Err(e) => return Some(Err(walk_error(&dir, &e))),
                    }
                    continue;
                }
            };

            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    self.current = None;
                    continue;
                }
                Err(e) => {
                    self.current = None;
                    return Some(Err(walk_error(&self.base, &e)));
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) if is_missing(&e) => continue,
                Err(e) => return Some(Err(walk_error(&path, &e))),
            };

            if file_type.is_dir() {
                self.stack.push(path);
            } else if file_type.is_file() {
                match path.strip_prefix(&self.base).ok().and_then(key_from_relative) {
                    Some(key) => return Some(Ok(key)),
                    None => warn!(path = %path.display(), "skipping file with unaddressable name"),
                }
            }
        }
    }
}

fn walk_error(path: &Path, e: &io::Error) -> GatewayError {
    GatewayError::Internal(anyhow::anyhow!(
        "failed to read directory {}: {e}",
        path.display()
    ))
}

async fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .await
        .is_ok_and(|meta| meta.file_type().is_symlink())
}

fn is_missing(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}
