//! Channel-buffered sink drained by a tokio task

use super::Sink;
use crate::error::{SinkError, SinkResult};
use std::sync::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

enum LineSender {
    Unbounded(mpsc::UnboundedSender<String>),
    Bounded(mpsc::Sender<String>),
}

impl LineSender {
    fn send(&self, line: String) -> SinkResult<()> {
        match self {
            LineSender::Unbounded(sender) => sender.send(line).map_err(|_| SinkError::Closed),
            LineSender::Bounded(sender) => sender.try_send(line).map_err(|e| match e {
                TrySendError::Full(_) => SinkError::Full,
                TrySendError::Closed(_) => SinkError::Closed,
            }),
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            LineSender::Unbounded(sender) => sender.is_closed(),
            LineSender::Bounded(sender) => sender.is_closed(),
        }
    }
}

fn forward<S: Sink>(inner: &S, line: &str) {
    if let Err(e) = inner.emit(line) {
        tracing::warn!(error = %e, "buffered sink dropped a line");
    }
}

fn finish<S: Sink>(inner: &S) {
    if let Err(e) = inner.flush() {
        tracing::warn!(error = %e, "buffered sink failed to flush");
    }
}

/// Moves sink I/O off the calling thread.
///
/// `emit` only pushes onto a channel; a background task forwards every line,
/// in order, to the inner sink. Failures of the inner sink are reported
/// through `tracing` by the drain task.
///
/// [`ChannelSink::spawn`] buffers without limit. [`ChannelSink::bounded`]
/// caps the backlog and refuses lines with [`SinkError::Full`] while the
/// inner sink is behind.
pub struct ChannelSink {
    sender: Mutex<Option<LineSender>>,
    drain: Mutex<Option<JoinHandle<()>>>,
}

impl ChannelSink {
    /// Spawn the drain task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    pub fn spawn<S>(inner: S) -> Self
    where
        S: Sink + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

        let drain = tokio::spawn(async move {
            while let Some(line) = receiver.recv().await {
                forward(&inner, &line);
            }
            finish(&inner);
        });

        Self::from_parts(LineSender::Unbounded(sender), drain)
    }

    /// Like [`ChannelSink::spawn`], holding at most `capacity` queued lines.
    ///
    /// A capacity of zero is raised to one.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    pub fn bounded<S>(inner: S, capacity: usize) -> Self
    where
        S: Sink + 'static,
    {
        let (sender, mut receiver) = mpsc::channel::<String>(capacity.max(1));

        let drain = tokio::spawn(async move {
            while let Some(line) = receiver.recv().await {
                forward(&inner, &line);
            }
            finish(&inner);
        });

        Self::from_parts(LineSender::Bounded(sender), drain)
    }

    fn from_parts(sender: LineSender, drain: JoinHandle<()>) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
            drain: Mutex::new(Some(drain)),
        }
    }

    /// Close the channel and wait until every queued line reached the inner sink.
    ///
    /// Lines emitted after shutdown fail with [`SinkError::Closed`].
    pub async fn shutdown(&self) -> SinkResult<()> {
        self.sender
            .lock()
            .map_err(|e| SinkError::Poisoned(e.to_string()))?
            .take();

        let drain = self
            .drain
            .lock()
            .map_err(|e| SinkError::Poisoned(e.to_string()))?
            .take();

        if let Some(handle) = drain {
            handle
                .await
                .map_err(|e| SinkError::Poisoned(format!("drain task failed: {}", e)))?;
        }
        Ok(())
    }

    /// Whether the channel still accepts lines.
    pub fn is_open(&self) -> bool {
        self.sender
            .lock()
            .map(|sender| sender.as_ref().is_some_and(|s| !s.is_closed()))
            .unwrap_or(false)
    }
}

impl Sink for ChannelSink {
    fn emit(&self, line: &str) -> SinkResult<()> {
        let sender = self
            .sender
            .lock()
            .map_err(|e| SinkError::Poisoned(e.to_string()))?;

        match sender.as_ref() {
            Some(sender) => sender.send(line.to_string()),
            None => Err(SinkError::Closed),
        }
    }
}

impl std::fmt::Debug for ChannelSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSink")
            .field("open", &self.is_open())
            .finish()
    }
}
