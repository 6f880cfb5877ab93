//! Response body supporting buffered, streamed and empty modes.
//!
//! - **Buffered**: XML listings, error envelopes, JSON payloads.
//! - **Stream**: object downloads, read from the store in fixed-size chunks.
//! - **Empty**: 204 responses, HEAD responses, PUT acknowledgements.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::Full;
use stowage_core::storage::ObjectReader;
use tokio::io::ReadBuf;

/// Chunk size for streamed object bodies.
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// An object body being read from the store.
pub struct ObjectStream {
    reader: ObjectReader,
    buf: Box<[u8]>,
    done: bool,
}

impl ObjectStream {
    /// Wrap a reader.
    #[must_use]
    pub fn new(reader: ObjectReader) -> Self {
        Self {
            reader,
            buf: vec![0u8; STREAM_CHUNK_SIZE].into_boxed_slice(),
            done: false,
        }
    }
}

impl fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStream")
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

/// Gateway response body.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper responses.
#[derive(Debug, Default)]
pub enum GatewayBody {
    /// Buffered body for small responses.
    Buffered(Full<Bytes>),
    /// Streamed object content.
    Stream(ObjectStream),
    /// No content.
    #[default]
    Empty,
}

impl GatewayBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a streamed body from an object reader.
    #[must_use]
    pub fn from_reader(reader: ObjectReader) -> Self {
        Self::Stream(ObjectStream::new(reader))
    }
}

impl http_body::Body for GatewayBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Stream(stream) => {
                if stream.done {
                    return Poll::Ready(None);
                }
                let mut read_buf = ReadBuf::new(&mut stream.buf);
                match stream.reader.as_mut().poll_read(cx, &mut read_buf) {
                    Poll::Pending => Poll::Pending,
                    Poll::Ready(Err(e)) => {
                        stream.done = true;
                        Poll::Ready(Some(Err(e)))
                    }
                    Poll::Ready(Ok(())) => {
                        let filled = read_buf.filled();
                        if filled.is_empty() {
                            stream.done = true;
                            Poll::Ready(None)
                        } else {
                            let chunk = Bytes::copy_from_slice(filled);
                            Poll::Ready(Some(Ok(http_body::Frame::data(chunk))))
                        }
                    }
                }
            }
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Stream(stream) => stream.done,
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Stream(_) => http_body::SizeHint::default(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
