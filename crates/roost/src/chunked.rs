//! Chunked HTTP body streaming over a lazy byte source.
//!
//! [`ChunkedBody`] adapts anything producing byte chunks on demand into the
//! shape a chunked transfer encoder wants: a run of data chunks followed by
//! exactly one terminator, which may carry trailing headers.

use bytes::Bytes;
use smallvec::SmallVec;

use crate::error::Result;

/// A lazy producer of body bytes.
///
/// `read` is non-blocking: `Ok(None)` means "nothing ready right now", not
/// end of input. Exhaustion is signalled separately through `is_end`, which
/// lets a source report end-of-input only after its final bytes have been
/// read out.
pub trait ChunkSource {
    /// `true` once the source will never produce more bytes.
    fn is_end(&self) -> bool;

    /// Read the next chunk, or `None` if no bytes are ready yet.
    fn read(&mut self) -> Result<Option<Bytes>>;

    /// Total body length if known up front.
    fn length(&self) -> Option<u64>;

    /// Bytes produced so far.
    fn progress(&self) -> u64;

    /// Release any resources held by the source.
    fn close(&mut self) -> Result<()>;
}

/// Trailing headers carried by the final chunk of a stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trailers {
    headers: SmallVec<[(String, String); 2]>,
}

impl Trailers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// One piece of a chunked HTTP body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    /// A data chunk.
    Data(Bytes),
    /// The terminator: a zero-length chunk, optionally carrying trailers.
    Last(Trailers),
}

impl Content {
    pub fn is_last(&self) -> bool {
        matches!(self, Content::Last(_))
    }
}

/// Wraps a [`ChunkSource`] into a chunked HTTP body stream.
///
/// Every chunk the source produces comes out as [`Content::Data`]; once the
/// source reports exhaustion, exactly one [`Content::Last`] terminator is
/// emitted and the stream ends.
pub struct ChunkedBody<S> {
    source: S,
    trailers: Option<Trailers>,
    sent_last: bool,
}

impl<S: ChunkSource> ChunkedBody<S> {
    /// Stream `source` with a bare terminator.
    pub fn new(source: S) -> Self {
        Self {
            source,
            trailers: None,
            sent_last: false,
        }
    }

    /// Stream `source`, terminated by a chunk carrying `trailers`.
    pub fn with_trailers(source: S, trailers: Trailers) -> Self {
        Self {
            source,
            trailers: Some(trailers),
            sent_last: false,
        }
    }

    /// `true` once the source is exhausted and the terminator has been
    /// emitted.
    pub fn is_end(&self) -> bool {
        self.source.is_end() && self.sent_last
    }

    /// Produce the next piece of the body.
    ///
    /// Returns `None` when the source has nothing ready yet, and again for
    /// every call after the terminator has been emitted.
    pub fn read_chunk(&mut self) -> Result<Option<Content>> {
        if self.source.is_end() {
            if self.sent_last {
                return Ok(None);
            }
            self.sent_last = true;
            return Ok(Some(Content::Last(self.trailers.take().unwrap_or_default())));
        }

        match self.source.read()? {
            // Not ready yet; the terminator waits for actual exhaustion.
            None => Ok(None),
            Some(bytes) => Ok(Some(Content::Data(bytes))),
        }
    }

    /// Total length of the underlying source, if known.
    pub fn length(&self) -> Option<u64> {
        self.source.length()
    }

    /// Bytes the underlying source has produced so far.
    pub fn progress(&self) -> u64 {
        self.source.progress()
    }

    /// Close the underlying source.
    pub fn close(&mut self) -> Result<()> {
        self.source.close()
    }
}
