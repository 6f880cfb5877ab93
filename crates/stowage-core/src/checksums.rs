//! Content hashing for ETags.
//!
//! The ETag of an object is the quoted hex MD5 of its bytes. It is a change
//! detector, not a security primitive, and is recomputed from the stored bytes
//! whenever it is needed.
//!
//! # Streaming Hashing
//!
//! Uploads are hashed as they are written with [`StreamingHasher`]; stored
//! files are hashed with [`hash_reader`], which reads in fixed-size chunks so
//! memory use does not depend on object size.

use digest::Digest;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Chunk size used when hashing from a reader.
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Compute the hex-encoded MD5 digest of `data`.
///
/// # Examples
///
/// ```
/// use stowage_core::checksums::compute_md5;
///
/// assert_eq!(compute_md5(b""), "d41d8cd98f00b204e9800998ecf8427e");
/// ```
#[must_use]
pub fn compute_md5(data: &[u8]) -> String {
    let hash = md5::Md5::digest(data);
    hex::encode(hash)
}

/// Compute the quoted MD5 ETag of `data`.
#[must_use]
pub fn compute_etag(data: &[u8]) -> String {
    quote_etag(&compute_md5(data))
}

/// Wrap a hex digest in double quotes.
#[must_use]
pub fn quote_etag(md5_hex: &str) -> String {
    format!("\"{md5_hex}\"")
}

/// Incremental MD5 over a sequence of chunks.
///
/// ```
/// use stowage_core::checksums::{StreamingHasher, compute_md5};
///
/// let mut hasher = StreamingHasher::new();
/// hasher.update(b"hello ");
/// hasher.update(b"world");
/// assert_eq!(hasher.finish(), compute_md5(b"hello world"));
/// ```
#[derive(Debug, Default)]
pub struct StreamingHasher {
    md5: md5::Md5,
    bytes: u64,
}

impl StreamingHasher {
    /// Create an empty hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk.
    pub fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.md5, data);
        self.bytes += data.len() as u64;
    }

    /// Number of bytes fed so far.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Consume the hasher and return the hex digest.
    #[must_use]
    pub fn finish(self) -> String {
        hex::encode(self.md5.finalize())
    }
}

/// Hash everything readable from `reader`, returning the hex MD5.
pub async fn hash_reader<R>(reader: &mut R) -> std::io::Result<String>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut hasher = StreamingHasher::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finish())
}
