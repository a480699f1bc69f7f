//! Handoff from the capability's callback thread to handler workers
//!
//! The capability invokes its callbacks on its own thread. The taps installed
//! there only copy the data and push it into a bounded queue; a worker task
//! per handler drains the queue and runs the user handler. A handler that
//! returns an error or panics is logged and counted, and the worker keeps
//! going with the next item.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::HarnessError;
use crate::types::{MocapFrame, Verbosity};

pub(crate) const FRAME_HANDLER: &str = "frame";
pub(crate) const MESSAGE_HANDLER: &str = "message";

/// Counters shared between the taps, the workers and the session.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    messages_received: AtomicU64,
    messages_dropped: AtomicU64,
    handler_failures: AtomicU64,
}

impl Counters {
    pub(crate) fn snapshot(&self) -> SessionStats {
        SessionStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    /// Frames delivered by the capability
    pub frames_received: u64,
    /// Frames discarded because the handler queue was full
    pub frames_dropped: u64,
    /// Diagnostic messages delivered by the capability
    pub messages_received: u64,
    /// Messages discarded because the handler queue was full
    pub messages_dropped: u64,
    /// Handler invocations that returned an error or panicked
    pub handler_failures: u64,
}

struct TapState<T> {
    queue: Option<mpsc::Sender<T>>,
    closed: bool,
}

impl<T> TapState<T> {
    fn new() -> Self {
        Self { queue: None, closed: false }
    }
}

struct FrameTapState {
    tap: TapState<Arc<MocapFrame>>,
    last_frame_index: Option<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Receives frames on the capability thread.
pub(crate) struct FrameTap {
    state: Mutex<FrameTapState>,
    latest: watch::Sender<Option<Arc<MocapFrame>>>,
    counters: Arc<Counters>,
}

impl FrameTap {
    pub(crate) fn new(counters: Arc<Counters>) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            state: Mutex::new(FrameTapState { tap: TapState::new(), last_frame_index: None }),
            latest,
            counters,
        }
    }

    /// Copy a borrowed frame and hand it off. Never blocks.
    pub(crate) fn publish(&self, frame: &MocapFrame) {
        let mut state = lock(&self.state);
        if state.tap.closed {
            return;
        }

        let frame = Arc::new(frame.clone());
        self.counters.frames_received.fetch_add(1, Ordering::Relaxed);

        if let Some(previous) = state.last_frame_index.replace(frame.frame_index) {
            if frame.frame_index < previous {
                debug!(previous, current = frame.frame_index, "Frame index went backwards");
            }
        }

        self.latest.send_replace(Some(Arc::clone(&frame)));

        let queue_closed = match state.tap.queue.as_ref().map(|queue| queue.try_send(frame)) {
            Some(Err(mpsc::error::TrySendError::Full(frame))) => {
                let dropped = self.counters.frames_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(
                    frame_index = frame.frame_index,
                    dropped, "Frame queue full, dropping frame"
                );
                false
            }
            Some(Err(mpsc::error::TrySendError::Closed(_))) => true,
            Some(Ok(())) | None => false,
        };
        if queue_closed {
            state.tap.queue = None;
        }
    }

    pub(crate) fn attach(&self, queue: mpsc::Sender<Arc<MocapFrame>>) {
        lock(&self.state).tap.queue = Some(queue);
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Option<Arc<MocapFrame>>> {
        self.latest.subscribe()
    }

    pub(crate) fn latest(&self) -> Option<Arc<MocapFrame>> {
        self.latest.borrow().clone()
    }

    /// Stop accepting frames and end any frame streams.
    pub(crate) fn close(&self) {
        let mut state = lock(&self.state);
        state.tap.closed = true;
        state.tap.queue = None;
        self.latest.send_replace(None);
    }
}

/// Receives diagnostic messages on the capability thread.
pub(crate) struct MessageTap {
    state: Mutex<TapState<(Verbosity, String)>>,
    counters: Arc<Counters>,
}

impl MessageTap {
    pub(crate) fn new(counters: Arc<Counters>) -> Self {
        Self {
            state: Mutex::new(TapState::new()),
            counters,
        }
    }

    pub(crate) fn publish(&self, verbosity: Verbosity, text: &str) {
        let mut state = lock(&self.state);
        if state.closed {
            return;
        }
        self.counters.messages_received.fetch_add(1, Ordering::Relaxed);

        let message = (verbosity, text.to_owned());
        let queue_closed = match state.queue.as_ref().map(|queue| queue.try_send(message)) {
            Some(Err(mpsc::error::TrySendError::Full(_))) => {
                self.counters.messages_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Some(Err(mpsc::error::TrySendError::Closed(_))) => true,
            Some(Ok(())) | None => false,
        };
        if queue_closed {
            state.queue = None;
        }
    }

    pub(crate) fn attach(&self, queue: mpsc::Sender<(Verbosity, String)>) {
        lock(&self.state).queue = Some(queue);
    }

    pub(crate) fn close(&self) {
        let mut state = lock(&self.state);
        state.closed = true;
        state.queue = None;
    }
}

/// Spawns handler workers.
pub(crate) struct Dispatcher;

impl Dispatcher {
    /// Spawn a worker that feeds queued items to `handler` until the queue
    /// closes or `cancel` fires.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub(crate) fn spawn<T, H>(
        kind: &'static str,
        queue: mpsc::Receiver<T>,
        cancel: CancellationToken,
        counters: Arc<Counters>,
        handler: H,
    ) -> JoinHandle<()>
    where
        T: Send + 'static,
        H: FnMut(T) -> anyhow::Result<()> + Send + 'static,
    {
        tokio::spawn(Self::worker(kind, queue, cancel, counters, handler))
    }

    async fn worker<T, H>(
        kind: &'static str,
        mut queue: mpsc::Receiver<T>,
        cancel: CancellationToken,
        counters: Arc<Counters>,
        mut handler: H,
    ) where
        H: FnMut(T) -> anyhow::Result<()>,
    {
        debug!(handler = kind, "Dispatcher started");
        let mut delivered = 0u64;

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(handler = kind, "Dispatcher cancelled");
                    break;
                }
                item = queue.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            delivered += 1;
            if let Err(err) = invoke_isolated(kind, || handler(item)) {
                counters.handler_failures.fetch_add(1, Ordering::Relaxed);
                error!(handler = kind, "{err}");
            }
        }

        info!(handler = kind, delivered, "Dispatcher stopped");
    }
}

/// Run a handler, turning returned errors and panics into [`HarnessError::Handler`].
pub(crate) fn invoke_isolated<F>(kind: &'static str, handler: F) -> Result<(), HarnessError>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match catch_unwind(AssertUnwindSafe(handler)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(HarnessError::handler_failed(kind, format!("{err:#}"))),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            Err(HarnessError::handler_failed(kind, format!("panicked: {reason}")))
        }
    }
}
