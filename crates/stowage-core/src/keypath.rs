//! Mapping between `(bucket, key)` pairs and filesystem paths.
//!
//! A key is a `/`-delimited string. Leading and trailing slashes are stripped,
//! and every remaining segment must be a plain file name: `.`, `..`, empty
//! segments and NUL bytes are rejected before any path is built. The lexical
//! check here is the first of two fences; [`crate::storage::LocalFsStore`]
//! additionally canonicalizes the deepest existing ancestor of each path and
//! verifies it is still under the storage root, which catches symlinks.
//!
//! # Examples
//!
//! ```
//! use stowage_core::keypath::KeyPathCodec;
//!
//! let codec = KeyPathCodec::new("/srv/objects");
//! let object = codec.resolve("photos", "/2024/cat.jpg/").unwrap();
//! assert_eq!(object.key(), "2024/cat.jpg");
//! assert!(object.path().ends_with("photos/2024/cat.jpg"));
//!
//! assert!(codec.resolve("photos", "../../etc/passwd").is_err());
//! ```

use std::path::{Component, Path, PathBuf};

use crate::error::{GatewayError, GatewayResult};

/// Strip leading and trailing `/` from a key, prefix or marker.
#[must_use]
pub fn trim_slashes(value: &str) -> &str {
    value.trim_matches('/')
}

/// Resolved location of a bucket directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPath {
    name: String,
    path: PathBuf,
}

impl BucketPath {
    /// Bucket name as given by the client.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the bucket's objects.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolved location of a single object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    bucket: BucketPath,
    key: String,
    path: PathBuf,
}

impl ObjectPath {
    /// The bucket this object belongs to.
    #[must_use]
    pub fn bucket(&self) -> &BucketPath {
        &self.bucket
    }

    /// Normalized object key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// File backing the object.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Translates bucket and key names into paths under a storage root.
#[derive(Debug, Clone)]
pub struct KeyPathCodec {
    root: PathBuf,
}

impl KeyPathCodec {
    /// Create a codec rooted at `root`. The root should already be canonical.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a bucket name to its directory.
    pub fn resolve_bucket(&self, bucket: &str) -> GatewayResult<BucketPath> {
        if bucket.is_empty() || bucket.contains('/') || !is_plain_segment(bucket) {
            return Err(GatewayError::invalid_request(format!(
                "Invalid bucket name: {bucket}"
            )));
        }
        Ok(BucketPath {
            name: bucket.to_owned(),
            path: self.root.join(bucket),
        })
    }

    /// Resolve a bucket and key to the object's file.
    ///
    /// Fails with `InvalidRequest` when the key is empty after trimming or
    /// contains a segment that could step outside the bucket.
    pub fn resolve(&self, bucket: &str, key: &str) -> GatewayResult<ObjectPath> {
        let bucket = self.resolve_bucket(bucket)?;
        let key = trim_slashes(key);
        if key.is_empty() {
            return Err(GatewayError::invalid_request("Path cannot be empty"));
        }

        let mut path = bucket.path.clone();
        for segment in key.split('/') {
            if !is_plain_segment(segment) {
                return Err(GatewayError::invalid_request(format!(
                    "Invalid object key: {key}"
                )));
            }
            path.push(segment);
        }

        Ok(ObjectPath {
            bucket,
            key: key.to_owned(),
            path,
        })
    }
}

/// Rebuild an object key from a path relative to the bucket directory.
///
/// Returns `None` for paths that are not UTF-8 or that contain anything other
/// than normal components; such entries cannot be addressed by a key.
#[must_use]
pub fn key_from_relative(relative: &Path) -> Option<String> {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_str()?),
            _ => return None,
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

fn is_plain_segment(segment: &str) -> bool {
    if segment.contains('\0') {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == segment
    )
}
