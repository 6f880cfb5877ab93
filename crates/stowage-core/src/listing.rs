//! S3-style bucket listing over a flat key enumeration.
//!
//! The store yields every key under a bucket in arbitrary order. Each key is
//! classified against the request in a single pass:
//!
//! 1. keys outside `prefix` are skipped;
//! 2. keys `<= marker` are skipped (the marker itself is excluded);
//! 3. keys under a common prefix already reported are skipped;
//! 4. if `delimiter` occurs after the prefix offset, everything up to and
//!    including its first occurrence becomes a common prefix;
//! 5. otherwise the key is a leaf and is stat'ed and hashed.
//!
//! The walk stops once objects plus common prefixes reach `max_keys`, and the
//! page is then flagged as truncated. This flag is approximate: a bucket
//! holding exactly `max_keys` matches is reported as truncated even though
//! nothing remains.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use tracing::{debug, trace};

use crate::checksums::quote_etag;
use crate::error::{GatewayError, GatewayResult};
use crate::keypath::BucketPath;
use crate::storage::ObjectStore;

/// Upper bound for `max-keys`, also its default.
pub const MAX_KEYS_LIMIT: usize = 1000;

/// Delimiter used when the request does not name one.
pub const DEFAULT_DELIMITER: &str = "/";

/// Storage class reported for every object.
pub const STORAGE_CLASS: &str = "STANDARD";

// ---------------------------------------------------------------------------
// ListRequest
// ---------------------------------------------------------------------------

/// Normalized listing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Only keys starting with this string are listed. Leading slashes are
    /// stripped; a trailing delimiter is kept so `logs/` lists inside `logs`.
    pub prefix: String,
    /// Rollup delimiter. Empty disables rollup.
    pub delimiter: String,
    /// Keys less than or equal to this are skipped.
    pub marker: String,
    /// Ceiling on objects plus common prefixes, in `[0, 1000]`.
    pub max_keys: usize,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            delimiter: DEFAULT_DELIMITER.to_owned(),
            marker: String::new(),
            max_keys: MAX_KEYS_LIMIT,
        }
    }
}

impl ListRequest {
    /// Build a request from decoded query parameters.
    ///
    /// Never fails: an unparsable `max-keys` falls back to the default and
    /// out-of-range values are clamped.
    ///
    /// ```
    /// use stowage_core::listing::ListRequest;
    ///
    /// let req = ListRequest::from_query([("prefix", "/logs/"), ("max-keys", "5000")]);
    /// assert_eq!(req.prefix, "logs/");
    /// assert_eq!(req.delimiter, "/");
    /// assert_eq!(req.max_keys, 1000);
    /// ```
    pub fn from_query<'a, I>(params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut req = Self::default();
        for (name, value) in params {
            match name {
                "prefix" => req.prefix = value.trim_start_matches('/').to_owned(),
                "delimiter" => value.clone_into(&mut req.delimiter),
                "marker" => req.marker = value.trim_matches('/').to_owned(),
                "max-keys" => req.max_keys = parse_max_keys(value),
                _ => {}
            }
        }
        req
    }
}

/// Parse `max-keys`, clamping to `[0, 1000]`.
#[must_use]
pub fn parse_max_keys(raw: &str) -> usize {
    match raw.trim().parse::<i64>() {
        Ok(n) if n <= 0 => 0,
        Ok(n) => usize::try_from(n).map_or(MAX_KEYS_LIMIT, |n| n.min(MAX_KEYS_LIMIT)),
        Err(_) => MAX_KEYS_LIMIT,
    }
}

// ---------------------------------------------------------------------------
// ListingPage
// ---------------------------------------------------------------------------

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Object key.
    pub key: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Quoted content hash.
    pub etag: String,
    /// Size in bytes.
    pub size: u64,
    /// Always [`STORAGE_CLASS`].
    pub storage_class: &'static str,
}

/// Result of one listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// Bucket name.
    pub bucket: String,
    /// Echoed prefix.
    pub prefix: String,
    /// Echoed delimiter.
    pub delimiter: String,
    /// Echoed marker.
    pub marker: String,
    /// Echoed max-keys.
    pub max_keys: usize,
    /// Whether the ceiling was reached.
    pub is_truncated: bool,
    /// Leaf objects, sorted by key.
    pub contents: Vec<ObjectSummary>,
    /// Common prefixes, sorted.
    pub common_prefixes: Vec<String>,
}

impl ListingPage {
    /// Objects plus common prefixes.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.contents.len() + self.common_prefixes.len()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// What a single key contributes to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'k> {
    /// Filtered out.
    Skip,
    /// Rolled up into this common prefix.
    CommonPrefix(&'k str),
    /// Listed as an object.
    Leaf,
}

/// Classify `key` against `request`, given the common prefixes found so far.
///
/// ```
/// use std::collections::BTreeSet;
/// use stowage_core::listing::{Classification, ListRequest, classify};
///
/// let req = ListRequest::default();
/// let seen = BTreeSet::new();
/// assert_eq!(classify("a/b/c", &req, &seen), Classification::CommonPrefix("a/"));
/// assert_eq!(classify("top.txt", &req, &seen), Classification::Leaf);
/// ```
#[must_use]
pub fn classify<'k>(
    key: &'k str,
    request: &ListRequest,
    seen: &BTreeSet<String>,
) -> Classification<'k> {
    let prefix = request.prefix.as_str();
    if !prefix.is_empty() && !key.starts_with(prefix) {
        return Classification::Skip;
    }
    if !request.marker.is_empty() && key <= request.marker.as_str() {
        return Classification::Skip;
    }
    if seen.iter().any(|p| key.starts_with(p.as_str())) {
        return Classification::Skip;
    }

    let delimiter = request.delimiter.as_str();
    if !delimiter.is_empty() {
        // key starts with prefix here, so the offset is a char boundary
        let offset = prefix.len();
        if let Some(pos) = key[offset..].find(delimiter) {
            let end = offset + pos + delimiter.len();
            return Classification::CommonPrefix(&key[..end]);
        }
    }

    Classification::Leaf
}

// ---------------------------------------------------------------------------
// ListingEngine
// ---------------------------------------------------------------------------

/// Produces [`ListingPage`]s from an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct ListingEngine {
    store: Arc<dyn ObjectStore>,
}

impl ListingEngine {
    /// Create an engine over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// List `bucket` according to `request`.
    pub async fn list(
        &self,
        bucket: &BucketPath,
        request: &ListRequest,
    ) -> GatewayResult<ListingPage> {
        let mut keys = self.store.enumerate_all(bucket).await?;
        let mut common_prefixes = BTreeSet::new();
        let mut contents = Vec::new();
        let mut is_truncated = false;

        while let Some(key) = keys.try_next().await? {
            match classify(&key, request, &common_prefixes) {
                Classification::Skip => continue,
                _ if contents.len() + common_prefixes.len() >= request.max_keys => {
                    is_truncated = true;
                    break;
                }
                Classification::CommonPrefix(prefix) => {
                    trace!(key = %key, prefix = %prefix, "rolled up into common prefix");
                    common_prefixes.insert(prefix.to_owned());
                }
                Classification::Leaf => match self.summarize(bucket, &key).await? {
                    Some(summary) => contents.push(summary),
                    None => continue,
                },
            }

            if contents.len() + common_prefixes.len() >= request.max_keys {
                is_truncated = true;
                break;
            }
        }

        contents.sort_by(|a, b| a.key.cmp(&b.key));
        let page = ListingPage {
            bucket: bucket.name().to_owned(),
            prefix: request.prefix.clone(),
            delimiter: request.delimiter.clone(),
            marker: request.marker.clone(),
            max_keys: request.max_keys,
            is_truncated,
            contents,
            common_prefixes: common_prefixes.into_iter().collect(),
        };

        debug!(
            bucket = %page.bucket,
            prefix = %page.prefix,
            count = page.key_count(),
            is_truncated = page.is_truncated,
            "list_objects completed"
        );
        Ok(page)
    }

    /// Stat and hash a leaf. Returns `None` if it vanished mid-listing.
    async fn summarize(
        &self,
        bucket: &BucketPath,
        key: &str,
    ) -> GatewayResult<Option<ObjectSummary>> {
        let object = self.store.codec().resolve(bucket.name(), key)?;
        let result = async {
            let stat = self.store.stat(&object).await?;
            let md5 = self.store.content_hash(&object).await?;
            Ok::<_, GatewayError>((stat, md5))
        }
        .await;

        match result {
            Ok((stat, md5)) => Ok(Some(ObjectSummary {
                key: key.to_owned(),
                last_modified: stat.last_modified,
                etag: quote_etag(&md5),
                size: stat.size,
                storage_class: STORAGE_CLASS,
            })),
            Err(GatewayError::NoSuchKey { .. }) => {
                trace!(key = %key, "object vanished during listing");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
