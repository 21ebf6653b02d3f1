//! Download Service helpers — content-type lookup and the proxy stream
//! lifecycle.
//!
//! A proxied download moves through `Streaming → {Completed | Aborted}`.
//! [`DownloadStream`] owns the upstream byte stream for exactly one request
//! and releases it exactly once on every exit path: normal completion, an
//! upstream read error, or the client disconnecting (which drops the
//! response body mid-transfer).

use crate::services::object_store::ObjectByteStream;
use bytes::Bytes;
use futures::Stream;
use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};
use tracing::{debug, warn};

/// Content type for a download, from the filename extension.
/// Unknown extensions fall back to `application/octet-stream`.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit('.')
        .next()
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "exe" => "application/x-msdownload",
        "dmg" => "application/x-apple-diskimage",
        "deb" => "application/vnd.debian.binary-package",
        "appimage" => "application/x-executable",
        "snap" => "application/vnd.snap",
        "bin" => "application/octet-stream",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Streaming,
    Completed,
    Aborted,
}

/// Byte stream forwarding an object body into an HTTP response with bounded
/// buffering: one chunk in flight, nothing materialized.
pub struct DownloadStream {
    inner: Option<ObjectByteStream>,
    key: String,
    bytes_sent: u64,
    state: StreamState,
}

impl DownloadStream {
    pub fn new(key: impl Into<String>, inner: ObjectByteStream) -> Self {
        Self {
            inner: Some(inner),
            key: key.into(),
            bytes_sent: 0,
            state: StreamState::Streaming,
        }
    }

    #[cfg(test)]
    fn is_completed(&self) -> bool {
        self.state == StreamState::Completed
    }

    #[cfg(test)]
    fn is_aborted(&self) -> bool {
        self.state == StreamState::Aborted
    }
}

impl Stream for DownloadStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match Pin::new(inner).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes_sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                // The response has already begun, so there is no retry; the
                // only recovery is clean termination of the stream.
                this.state = StreamState::Aborted;
                this.inner = None;
                warn!(
                    key = %this.key,
                    bytes_sent = this.bytes_sent,
                    error = %err,
                    "download aborted by upstream read error"
                );
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.state = StreamState::Completed;
                this.inner = None;
                debug!(key = %this.key, bytes_sent = this.bytes_sent, "download completed");
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for DownloadStream {
    fn drop(&mut self) {
        // Dropped while still streaming means the client went away before
        // the transfer finished. Dropping `inner` releases the upstream
        // handle instead of continuing to drain it.
        if self.state == StreamState::Streaming {
            self.inner = None;
            warn!(
                key = %self.key,
                bytes_sent = self.bytes_sent,
                "download aborted by client disconnect"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, stream};
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    /// Wraps a stream and raises a flag when dropped, so tests can observe
    /// exactly when the upstream handle is released.
    struct DropTracked<S> {
        inner: S,
        released: Arc<AtomicBool>,
    }

    impl<S: Stream + Unpin> Stream for DropTracked<S> {
        type Item = S::Item;

        fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Pin::new(&mut self.get_mut().inner).poll_next(cx)
        }
    }

    impl<S> Drop for DropTracked<S> {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn tracked(
        chunks: Vec<io::Result<Bytes>>,
    ) -> (ObjectByteStream, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let stream = DropTracked {
            inner: stream::iter(chunks),
            released: released.clone(),
        };
        (stream.boxed(), released)
    }

    #[test]
    fn maps_known_extensions_and_defaults_the_rest() {
        assert_eq!(content_type_for("app.exe"), "application/x-msdownload");
        assert_eq!(content_type_for("app.dmg"), "application/x-apple-diskimage");
        assert_eq!(
            content_type_for("app.deb"),
            "application/vnd.debian.binary-package"
        );
        assert_eq!(content_type_for("app.AppImage"), "application/x-executable");
        assert_eq!(content_type_for("app.snap"), "application/vnd.snap");
        assert_eq!(content_type_for("bundle.tar"), "application/x-tar");
        assert_eq!(content_type_for("app.unknownext"), "application/octet-stream");
        assert_eq!(content_type_for("no-extension"), "application/octet-stream");
    }

    #[tokio::test]
    async fn completes_and_releases_the_source_once_drained() {
        let (inner, released) = tracked(vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"de")),
        ]);
        let mut stream = DownloadStream::new("k", inner);

        let mut total = 0;
        while let Some(chunk) = stream.next().await {
            total += chunk.unwrap().len();
        }

        assert_eq!(total, 5);
        assert!(stream.is_completed());
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn upstream_error_aborts_and_releases_immediately() {
        let (inner, released) = tracked(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "cut off")),
        ]);
        let mut stream = DownloadStream::new("k", inner);

        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());

        assert!(stream.is_aborted());
        assert!(released.load(Ordering::SeqCst));

        // Terminal: no resurrection after the error.
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn client_disconnect_releases_the_source() {
        let (inner, released) = tracked(vec![
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"de")),
        ]);
        let mut stream = DownloadStream::new("k", inner);

        // One chunk delivered, then the client goes away.
        assert!(stream.next().await.unwrap().is_ok());
        drop(stream);

        assert!(released.load(Ordering::SeqCst));
    }
}
