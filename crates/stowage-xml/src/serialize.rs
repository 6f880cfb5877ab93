//! XML serialization of response bodies.
//!
//! Conventions:
//!
//! - No namespace on the root element
//! - Booleans: lowercase `true`/`false`
//! - Timestamps: ISO 8601 with milliseconds (`2024-02-03T16:45:09.000Z`)
//! - XML declaration: `<?xml version="1.0" encoding="UTF-8"?>`

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesText, Event};
use stowage_core::listing::{ListingPage, ObjectSummary};

use crate::error::XmlError;

/// Root element of a bucket listing.
pub const LIST_BUCKET_RESULT: &str = "ListBucketResult";

/// Types that write themselves as child elements of a root element.
///
/// Uses `io::Result` because `quick_xml::Writer` closures require it.
pub trait XmlSerialize {
    /// Write this value's child elements into `writer`.
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()>;
}

/// Serialize `value` as a complete XML document under `root_element`.
pub fn to_xml<T: XmlSerialize>(root_element: &str, value: &T) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer
        .create_element(root_element)
        .write_inner_content(|w| value.serialize_xml(w))?;

    Ok(buf)
}

/// Serialize a listing page as a `ListBucketResult` document.
///
/// ```
/// use stowage_core::listing::ListingPage;
/// use stowage_xml::list_bucket_result;
///
/// let page = ListingPage {
///     bucket: "photos".to_owned(),
///     prefix: String::new(),
///     delimiter: "/".to_owned(),
///     marker: String::new(),
///     max_keys: 1000,
///     is_truncated: false,
///     contents: Vec::new(),
///     common_prefixes: vec!["2024/".to_owned()],
/// };
/// let xml = String::from_utf8(list_bucket_result(&page).unwrap()).unwrap();
/// assert!(xml.contains("<CommonPrefixes><Prefix>2024/</Prefix></CommonPrefixes>"));
/// ```
pub fn list_bucket_result(page: &ListingPage) -> Result<Vec<u8>, XmlError> {
    to_xml(LIST_BUCKET_RESULT, page)
}

/// Format a timestamp as ISO 8601 with millisecond precision.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write `<tag>text</tag>`. Only `<`, `>` and `&` are escaped so quoted
/// ETags stay readable.
fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::from_escaped(partial_escape(text)))?;
    Ok(())
}

/// Write `<tag>text</tag>` only for a non-empty value.
fn write_non_empty<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    if !text.is_empty() {
        write_text_element(writer, tag, text)?;
    }
    Ok(())
}

fn write_bool<W: Write>(writer: &mut Writer<W>, tag: &str, value: bool) -> io::Result<()> {
    write_text_element(writer, tag, if value { "true" } else { "false" })
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

impl XmlSerialize for ListingPage {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Name", &self.bucket)?;
        write_non_empty(writer, "Prefix", &self.prefix)?;
        write_non_empty(writer, "Marker", &self.marker)?;
        write_text_element(writer, "MaxKeys", &self.max_keys.to_string())?;
        write_non_empty(writer, "Delimiter", &self.delimiter)?;
        write_bool(writer, "IsTruncated", self.is_truncated)?;
        write_text_element(writer, "KeyCount", &self.key_count().to_string())?;

        for prefix in &self.common_prefixes {
            writer
                .create_element("CommonPrefixes")
                .write_inner_content(|w| write_text_element(w, "Prefix", prefix))?;
        }
        for object in &self.contents {
            writer
                .create_element("Contents")
                .write_inner_content(|w| object.serialize_xml(w))?;
        }
        Ok(())
    }
}

impl XmlSerialize for ObjectSummary {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        write_text_element(writer, "Key", &self.key)?;
        write_text_element(writer, "LastModified", &format_timestamp(&self.last_modified))?;
        write_text_element(writer, "ETag", &self.etag)?;
        write_text_element(writer, "Size", &self.size.to_string())?;
        write_text_element(writer, "StorageClass", self.storage_class)?;
        Ok(())
    }
}
