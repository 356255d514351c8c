//! Byte sources produced and consumed by codecs.
//!
//! A `Payload` is what travels on the wire for one side of a call: nothing,
//! an in-memory buffer, or a stream of chunks. It may carry a close hook
//! that releases whatever resource backs the stream (a file, a pooled
//! buffer, a child process pipe). Whoever owns the payload last is
//! responsible for closing it.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_util::stream::{BoxStream, Stream, StreamExt};

/// Boxed stream of body chunks.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Release hook attached to a payload.
pub struct Closer(Box<dyn FnOnce() -> io::Result<()> + Send>);

impl Closer {
    pub fn new(f: impl FnOnce() -> io::Result<()> + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn close(self) -> io::Result<()> {
        (self.0)()
    }
}

impl fmt::Debug for Closer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Closer")
    }
}

pub(crate) enum Source {
    Empty,
    Full(Bytes),
    Stream(ByteStream),
}

impl Source {
    pub(crate) fn into_stream(self) -> ByteStream {
        match self {
            Source::Empty => futures_util::stream::empty::<io::Result<Bytes>>().boxed(),
            Source::Full(bytes) => {
                futures_util::stream::once(async move { Ok::<_, io::Error>(bytes) }).boxed()
            }
            Source::Stream(stream) => stream,
        }
    }
}

/// An encoded message body.
pub struct Payload {
    source: Source,
    closer: Option<Closer>,
}

impl Payload {
    /// A payload carrying nothing. Used for procedures without data.
    pub fn empty() -> Self {
        Self {
            source: Source::Empty,
            closer: None,
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            source: Source::Full(bytes.into()),
            closer: None,
        }
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            source: Source::Stream(stream.boxed()),
            closer: None,
        }
    }

    /// Attach a release hook, run once the payload is closed or fully sent.
    pub fn with_closer(mut self, f: impl FnOnce() -> io::Result<()> + Send + 'static) -> Self {
        self.closer = Some(Closer::new(f));
        self
    }

    /// True when the payload is known to carry no bytes without reading it.
    pub fn is_empty(&self) -> bool {
        match &self.source {
            Source::Empty => true,
            Source::Full(bytes) => bytes.is_empty(),
            Source::Stream(_) => false,
        }
    }

    pub fn has_closer(&self) -> bool {
        self.closer.is_some()
    }

    /// Drain the source into memory. The close hook stays attached.
    pub async fn read_to_end(&mut self) -> io::Result<Bytes> {
        match std::mem::replace(&mut self.source, Source::Empty) {
            Source::Empty => Ok(Bytes::new()),
            Source::Full(bytes) => Ok(bytes),
            Source::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Move the whole payload out, close hook included, leaving an empty one
    /// behind. Decoders that keep the body open use this to take ownership.
    pub fn take(&mut self) -> Payload {
        std::mem::replace(self, Payload::empty())
    }

    /// Consume the payload as a single stream. The close hook runs when the
    /// stream is dropped; a failing hook is reported as the final chunk if the
    /// stream was read to the end.
    pub fn into_stream(self) -> ByteStream {
        let (source, closer) = self.split();
        let inner = source.into_stream();
        match closer {
            None => inner,
            Some(closer) => CloseOnEnd {
                inner,
                closer: Some(closer),
            }
            .boxed(),
        }
    }

    /// Detach the close hook without running it.
    pub fn take_closer(&mut self) -> Option<Closer> {
        self.closer.take()
    }

    pub(crate) fn take_source(&mut self) -> Source {
        std::mem::replace(&mut self.source, Source::Empty)
    }

    /// Drop the source, then run the close hook if any.
    pub fn close(self) -> io::Result<()> {
        let (source, closer) = self.split();
        drop(source);
        match closer {
            Some(closer) => closer.close(),
            None => Ok(()),
        }
    }

    fn split(mut self) -> (Source, Option<Closer>) {
        let source = std::mem::replace(&mut self.source, Source::Empty);
        (source, self.closer.take())
    }
}

// A payload dropped without an explicit close still runs its hook.
impl Drop for Payload {
    fn drop(&mut self) {
        if let Some(closer) = self.closer.take() {
            if let Err(err) = closer.close() {
                tracing::info!(error = %err, "payload close failed on drop");
            }
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Empty => "empty".to_string(),
            Source::Full(bytes) => format!("{} bytes", bytes.len()),
            Source::Stream(_) => "stream".to_string(),
        };
        f.debug_struct("Payload")
            .field("source", &source)
            .field("closer", &self.closer.is_some())
            .finish()
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::from_bytes(bytes)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::from_bytes(text)
    }
}

struct CloseOnEnd {
    inner: ByteStream,
    closer: Option<Closer>,
}

impl Stream for CloseOnEnd {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(None) => match this.closer.take() {
                Some(closer) => Poll::Ready(closer.close().err().map(Err)),
                None => Poll::Ready(None),
            },
            other => other,
        }
    }
}

impl Drop for CloseOnEnd {
    fn drop(&mut self) {
        if let Some(closer) = self.closer.take() {
            if let Err(err) = closer.close() {
                tracing::info!(error = %err, "stream abandoned, close failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_read_to_end_collects_stream_chunks() {
        let chunks = vec![Ok(Bytes::from_static(b"he")), Ok(Bytes::from_static(b"llo"))];
        let mut payload = Payload::from_stream(futures_util::stream::iter(chunks));
        assert!(!payload.is_empty());
        assert_eq!(payload.read_to_end().await.unwrap(), Bytes::from_static(b"hello"));
        assert!(payload.is_empty());
    }

    #[test]
    fn test_close_runs_hook_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let payload = Payload::from_bytes("x").with_closer(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        payload.close().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_take_moves_closer() {
        let mut payload = Payload::from_bytes("x").with_closer(|| Ok(()));
        let taken = payload.take();
        assert!(taken.has_closer());
        assert!(!payload.has_closer());
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn test_into_stream_reports_close_error_last() {
        let payload = Payload::from_bytes("abc")
            .with_closer(|| Err(io::Error::new(io::ErrorKind::Other, "release failed")));
        let items: Vec<_> = payload.into_stream().collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), &Bytes::from_static(b"abc"));
        assert_eq!(items[1].as_ref().unwrap_err().to_string(), "release failed");
    }

    #[test]
    fn test_into_stream_dropped_early_still_closes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let stream = Payload::from_bytes("abc")
            .with_closer(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .into_stream();
        drop(stream);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
