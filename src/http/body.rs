//! Request body accumulation.
//!
//! # Responsibilities
//! - Concatenate streamed chunks in arrival order
//! - Detect client disconnect (stream error or raised abort flag)
//!
//! # Design Decisions
//! - Abort is a local flag, consulted between chunks and before the
//!   response write; it never cancels a running handler
//! - No size or time limit is enforced here

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};

/// Shared flag marking a request whose client went away.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Guard that raises the flag if dropped before [`AbortGuard::disarm`].
    pub fn guard(&self) -> AbortGuard {
        AbortGuard {
            flag: self.clone(),
            armed: true,
        }
    }
}

/// Raises its [`AbortFlag`] on drop unless disarmed.
///
/// Held by the transport-facing future: the server drops that future when
/// the connection closes, which marks the request as aborted.
#[derive(Debug)]
pub struct AbortGuard {
    flag: AbortFlag,
    armed: bool,
}

impl AbortGuard {
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if self.armed {
            self.flag.abort();
        }
    }
}

/// Result of reading a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyOutcome {
    Complete(Bytes),
    Aborted,
}

/// Fold a chunk stream into a single buffer.
///
/// A stream error means the client disconnected: the flag is raised and
/// [`BodyOutcome::Aborted`] returned.
pub async fn accumulate<S, E>(stream: S, abort: &AbortFlag) -> BodyOutcome
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut buffer = BytesMut::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => buffer.extend_from_slice(&chunk),
            Err(_) => {
                abort.abort();
                return BodyOutcome::Aborted;
            }
        }

        if abort.is_aborted() {
            return BodyOutcome::Aborted;
        }
    }

    if abort.is_aborted() {
        return BodyOutcome::Aborted;
    }

    BodyOutcome::Complete(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::io;

    fn chunks(parts: &[&'static str]) -> Vec<Result<Bytes, io::Error>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect()
    }

    #[tokio::test]
    async fn test_chunks_concatenated_in_order() {
        let abort = AbortFlag::new();
        let outcome = accumulate(stream::iter(chunks(&["{\"na", "me\":", "\"x\"}"])), &abort).await;
        assert_eq!(outcome, BodyOutcome::Complete(Bytes::from_static(b"{\"name\":\"x\"}")));
        assert!(!abort.is_aborted());
    }

    #[tokio::test]
    async fn test_empty_body_completes() {
        let abort = AbortFlag::new();
        let outcome = accumulate(stream::iter(chunks(&[])), &abort).await;
        assert_eq!(outcome, BodyOutcome::Complete(Bytes::new()));
    }

    #[tokio::test]
    async fn test_stream_error_aborts() {
        let abort = AbortFlag::new();
        let mut items = chunks(&["{\"partial"]);
        items.push(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")));

        let outcome = accumulate(stream::iter(items), &abort).await;
        assert_eq!(outcome, BodyOutcome::Aborted);
        assert!(abort.is_aborted());
    }

    #[tokio::test]
    async fn test_raised_flag_stops_accumulation() {
        let abort = AbortFlag::new();
        abort.abort();
        let outcome = accumulate(stream::iter(chunks(&["{}"])), &abort).await;
        assert_eq!(outcome, BodyOutcome::Aborted);
    }

    #[test]
    fn test_guard_raises_flag_on_drop() {
        let abort = AbortFlag::new();
        drop(abort.guard());
        assert!(abort.is_aborted());

        let abort = AbortFlag::new();
        abort.guard().disarm();
        assert!(!abort.is_aborted());
    }
}
