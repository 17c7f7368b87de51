//! Upload/download progress reporting.
//!
//! Progress flows through a latest-value-coalescing channel: the
//! producer never blocks and never queues more than one unconsumed
//! update, a slow consumer simply observes the most recent value. The
//! channel is single-producer, multi-consumer ([`ProgressStream`] is
//! `Clone`).
//!
//! Dropping every consumer is a cancellation signal: transports watch
//! [`ProgressSender::closed`] and abort the underlying transfer when it
//! fires, so an abandoned transfer never holds sockets or file handles.

use tokio::sync::watch;

/// A point-in-time progress measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Bytes transferred so far.
    pub completed_bytes: u64,
    /// Total bytes, when the transport can report one.
    pub total_bytes: Option<u64>,
}

impl ProgressUpdate {
    /// Creates a new update.
    #[must_use]
    pub const fn new(completed_bytes: u64, total_bytes: Option<u64>) -> Self {
        Self {
            completed_bytes,
            total_bytes,
        }
    }

    /// Completed fraction in `0.0..=1.0`, when the total is known.
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                #[allow(clippy::cast_precision_loss)]
                Some((self.completed_bytes as f64 / total as f64).min(1.0))
            }
            _ => None,
        }
    }
}

/// Creates a connected progress channel.
#[must_use]
pub fn progress_channel() -> (ProgressSender, ProgressStream) {
    let (tx, rx) = watch::channel(None);
    (ProgressSender { tx }, ProgressStream { rx })
}

/// Producer half of the progress channel, held by the transport.
#[derive(Debug)]
pub struct ProgressSender {
    tx: watch::Sender<Option<ProgressUpdate>>,
}

impl ProgressSender {
    /// Publishes an update, overwriting any unconsumed previous one.
    pub fn send(&self, update: ProgressUpdate) {
        self.tx.send_replace(Some(update));
    }

    /// Resolves once every [`ProgressStream`] has been dropped.
    ///
    /// Transports treat this as a cancellation request for the transfer.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    /// Returns `true` if every consumer is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of the progress channel.
///
/// Dropping the sender terminates the stream; [`ProgressStream::recv`]
/// then returns `None`.
#[derive(Debug, Clone)]
pub struct ProgressStream {
    rx: watch::Receiver<Option<ProgressUpdate>>,
}

impl ProgressStream {
    /// Waits for the next (coalesced) update.
    ///
    /// Returns `None` once the transfer has finished and no further
    /// updates will arrive.
    pub async fn recv(&mut self) -> Option<ProgressUpdate> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            if let Some(update) = *self.rx.borrow_and_update() {
                return Some(update);
            }
        }
    }

    /// The most recently published update, without waiting.
    #[must_use]
    pub fn latest(&self) -> Option<ProgressUpdate> {
        *self.rx.borrow()
    }
}
