//! Motion capture session lifecycle
//!
//! A [`Session`] owns one connection to a streaming capability. The usual
//! sequence is:
//!
//! 1. [`Session::configure`] validates settings
//! 2. [`Session::connect`] establishes the transport and reads the server description
//! 3. [`Session::register_frame_handler`] / [`Session::register_message_handler`]
//! 4. [`Session::fetch_data_descriptions`] (optional, non-fatal on failure)
//! 5. [`Session::run_until_signaled`] idles while frames arrive in the background
//! 6. [`Session::shutdown`] releases everything
//!
//! ```rust,no_run
//! use mocap_harness::providers::MockClient;
//! use mocap_harness::{ConnectionConfig, Session, ShutdownSignal};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> mocap_harness::Result<()> {
//!     let config = ConnectionConfig::new("10.0.0.2", "10.0.0.5")?;
//!     let mut session = Session::configure(config, MockClient::new())?;
//!
//!     let server = session.connect()?;
//!     println!("connected to {}", server.application_name);
//!
//!     session.register_frame_handler(|frame| {
//!         println!("{}", frame.summary());
//!         Ok(())
//!     })?;
//!
//!     let signal = ShutdownSignal::new();
//!     signal.listen_for_interrupt();
//!     session.run_until_signaled(&signal, Duration::from_millis(100)).await;
//!     session.shutdown()
//! }
//! ```

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::StreamingClient;
use crate::dispatch::{
    Counters, Dispatcher, FRAME_HANDLER, FrameTap, MESSAGE_HANDLER, MessageTap, SessionStats,
};
use crate::signal::ShutdownSignal;
use crate::stream::SampleExt;
use crate::types::{
    ConnectionConfig, DataDescriptionSet, MocapFrame, ServerDescription, Severity, UpdateRate,
    Verbosity,
};
use crate::{HarnessError, Result};

/// Queue sizes between the capability thread and the handler workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Frames buffered for the frame handler before new frames are dropped
    pub frame_queue_capacity: usize,
    /// Messages buffered for the message handler before new messages are dropped
    pub message_queue_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { frame_queue_capacity: 64, message_queue_capacity: 256 }
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Settings validated, no transport yet (or connect failed)
    Configured,
    /// Transport up and a host answered the handshake
    Connected,
    /// Shut down; the session cannot be reused
    Closed,
}

/// One session against a streaming capability.
pub struct Session<C: StreamingClient> {
    client: C,
    config: ConnectionConfig,
    options: SessionOptions,
    state: SessionState,
    transport_open: bool,
    server: Option<ServerDescription>,
    descriptions: Option<DataDescriptionSet>,
    counters: Arc<Counters>,
    frame_tap: Arc<FrameTap>,
    frame_tap_installed: bool,
    message_tap: Arc<MessageTap>,
    message_tap_installed: bool,
    cancel: CancellationToken,
    frame_worker: Option<CancellationToken>,
    message_worker: Option<CancellationToken>,
}

impl<C: StreamingClient> Session<C> {
    /// Validate `config` and create a session with default options.
    ///
    /// Accepts a [`ConnectionConfig`] or anything convertible into one, such
    /// as a [`RawConnectionConfig`](crate::types::RawConnectionConfig).
    pub fn configure<T>(config: T, client: C) -> Result<Self>
    where
        T: TryInto<ConnectionConfig>,
        HarnessError: From<T::Error>,
    {
        Self::configure_with(config, client, SessionOptions::default())
    }

    /// Validate `config` and create a session with the given options.
    pub fn configure_with<T>(config: T, client: C, options: SessionOptions) -> Result<Self>
    where
        T: TryInto<ConnectionConfig>,
        HarnessError: From<T::Error>,
    {
        let config = config.try_into()?;
        if options.frame_queue_capacity == 0 {
            return Err(HarnessError::config("frame_queue_capacity", "must be at least 1"));
        }
        if options.message_queue_capacity == 0 {
            return Err(HarnessError::config("message_queue_capacity", "must be at least 1"));
        }

        debug!(%config, "Session configured");

        let counters = Arc::new(Counters::default());
        Ok(Self {
            client,
            config,
            options,
            state: SessionState::Configured,
            transport_open: false,
            server: None,
            descriptions: None,
            frame_tap: Arc::new(FrameTap::new(Arc::clone(&counters))),
            frame_tap_installed: false,
            message_tap: Arc::new(MessageTap::new(Arc::clone(&counters))),
            message_tap_installed: false,
            counters,
            cancel: CancellationToken::new(),
            frame_worker: None,
            message_worker: None,
        })
    }

    /// Establish the transport and read the server description.
    ///
    /// Fails with [`HarnessError::Connect`] carrying the capability's code when
    /// the transport cannot be established, and with
    /// [`HarnessError::ServerAbsent`] when no host answers the handshake (the
    /// transport is torn down in that case). No retries are attempted.
    ///
    /// On an already-connected session this returns the cached description.
    pub fn connect(&mut self) -> Result<ServerDescription> {
        match self.state {
            SessionState::Closed => return Err(HarnessError::Closed),
            SessionState::Connected => {
                if let Some(server) = &self.server {
                    return Ok(server.clone());
                }
            }
            SessionState::Configured => {}
        }

        info!(config = %self.config, "Connecting to Motive at {}...", self.config.server_address());

        if let Err(code) = self.client.connect(&self.config) {
            error!(%code, "Error initializing client");
            return Err(HarnessError::connect_failed(code));
        }
        self.transport_open = true;

        let server = match self.client.server_description() {
            Ok(server) => server,
            Err(code) => {
                error!(%code, "Failed to read server description");
                self.close_transport_quietly();
                return Err(HarnessError::connect_failed(code));
            }
        };

        if !server.host_present {
            error!(server = self.config.server_address(), "Unable to connect to Motive server");
            self.close_transport_quietly();
            return Err(HarnessError::ServerAbsent {
                server: self.config.server_address().to_string(),
            });
        }

        info!(
            application_version = %server.application_version,
            protocol_version = %server.protocol_version,
            "Connected to Motive server: {}",
            server.application_name
        );

        self.state = SessionState::Connected;
        self.server = Some(server.clone());
        Ok(server)
    }

    /// Install a handler invoked once per received frame, in delivery order.
    ///
    /// Frames are copied off the capability's thread into a bounded queue and
    /// the handler runs on a Tokio task. When the queue is full new frames are
    /// dropped and counted in [`SessionStats::frames_dropped`]. A handler that
    /// returns an error or panics is logged and counted; later frames are
    /// still delivered. Registering again replaces the previous handler.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn register_frame_handler<H>(&mut self, mut handler: H) -> Result<()>
    where
        H: FnMut(&MocapFrame) -> anyhow::Result<()> + Send + 'static,
    {
        self.ensure_open()?;
        self.install_frame_tap()?;

        let (tx, rx) = mpsc::channel(self.options.frame_queue_capacity);
        let worker = self.cancel.child_token();
        Dispatcher::spawn(
            FRAME_HANDLER,
            rx,
            worker.clone(),
            Arc::clone(&self.counters),
            move |frame: Arc<MocapFrame>| handler(frame.as_ref()),
        );

        if let Some(previous) = self.frame_worker.replace(worker) {
            previous.cancel();
        }
        self.frame_tap.attach(tx);
        debug!("Frame handler registered");
        Ok(())
    }

    /// Install a handler for the capability's diagnostic messages.
    ///
    /// Same queueing and isolation rules as [`Session::register_frame_handler`].
    /// Unknown verbosity values arrive as [`Severity::Info`].
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn register_message_handler<H>(&mut self, mut handler: H) -> Result<()>
    where
        H: FnMut(Severity, &str) -> anyhow::Result<()> + Send + 'static,
    {
        self.register_verbosity_handler(move |verbosity, text| handler(verbosity.severity(), text))
    }

    /// Like [`Session::register_message_handler`], but the handler sees the
    /// verbosity exactly as the capability reported it.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn register_verbosity_handler<H>(&mut self, mut handler: H) -> Result<()>
    where
        H: FnMut(Verbosity, &str) -> anyhow::Result<()> + Send + 'static,
    {
        self.ensure_open()?;
        self.install_message_tap()?;

        let (tx, rx) = mpsc::channel(self.options.message_queue_capacity);
        let worker = self.cancel.child_token();
        Dispatcher::spawn(
            MESSAGE_HANDLER,
            rx,
            worker.clone(),
            Arc::clone(&self.counters),
            move |(verbosity, text): (Verbosity, String)| handler(verbosity, &text),
        );

        if let Some(previous) = self.message_worker.replace(worker) {
            previous.cancel();
        }
        self.message_tap.attach(tx);
        debug!("Message handler registered");
        Ok(())
    }

    /// Request the scene description from the server.
    ///
    /// Fails with [`HarnessError::Fetch`] when the session is not connected.
    /// The most recent successful result is also kept until shutdown and is
    /// available through [`Session::descriptions`].
    pub fn fetch_data_descriptions(&mut self) -> Result<DataDescriptionSet> {
        match self.state {
            SessionState::Connected => {}
            SessionState::Configured => {
                return Err(HarnessError::fetch_failed("session is not connected", None));
            }
            SessionState::Closed => {
                return Err(HarnessError::fetch_failed("session has been shut down", None));
            }
        }

        match self.client.data_descriptions() {
            Ok(set) => {
                info!(
                    marker_sets = set.marker_set_count(),
                    rigid_bodies = set.rigid_body_count(),
                    "Scene descriptions: {}",
                    set.len()
                );
                self.descriptions = Some(set.clone());
                Ok(set)
            }
            Err(code) => {
                warn!(%code, "Could not fetch data descriptions");
                Err(HarnessError::fetch_failed("server rejected the request", Some(code)))
            }
        }
    }

    /// Idle until `signal` is set, waking every `poll_interval` to check it.
    ///
    /// Frames and messages keep arriving in the background while this waits.
    pub async fn run_until_signaled(&self, signal: &ShutdownSignal, poll_interval: Duration) {
        info!("Receiving data... (Ctrl+C to exit)");
        signal.wait(poll_interval).await;
        debug!(stats = ?self.stats(), "Termination requested");
    }

    /// Disconnect and release everything the session holds.
    ///
    /// Idempotent: later calls do nothing. Safe after a failed connect.
    ///
    /// Whether a capability callback already in flight may still run after
    /// this returns depends on the capability's own disconnect contract; the
    /// harness stops forwarding anything it receives afterwards.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            debug!("Session already shut down");
            return Ok(());
        }

        info!("Shutting down...");
        self.state = SessionState::Closed;
        self.cancel.cancel();
        self.frame_worker = None;
        self.message_worker = None;
        self.frame_tap.close();
        self.message_tap.close();
        self.descriptions = None;

        if self.transport_open {
            self.transport_open = false;
            if let Err(code) = self.client.disconnect() {
                error!(%code, "Disconnect failed");
                return Err(HarnessError::Disconnect { code });
            }
        }

        info!(stats = ?self.counters.snapshot(), "Session closed");
        Ok(())
    }

    /// Most recent frame, once frames are being received.
    ///
    /// Frames are only observed after a frame handler is registered or
    /// [`Session::frames`] has been called.
    pub fn latest_frame(&self) -> Option<Arc<MocapFrame>> {
        self.frame_tap.latest()
    }

    /// Stream of received frames.
    ///
    /// The stream observes the latest frame: a slow consumer skips frames
    /// rather than queueing them. Use a frame handler to see every frame.
    /// `UpdateRate::Max(hz)` additionally limits delivery to `hz` frames per
    /// second. The stream ends when the session shuts down.
    pub fn frames(&mut self, rate: UpdateRate) -> Result<BoxStream<'static, Arc<MocapFrame>>> {
        self.ensure_open()?;
        self.install_frame_tap()?;

        let closed = self.cancel.clone().cancelled_owned();
        let frames =
            latest_frames(WatchStream::new(self.frame_tap.subscribe())).take_until(closed);
        Ok(match rate.interval() {
            None => frames.boxed(),
            Some(period) => frames.sample_latest(period).boxed(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Server description from the last successful connect.
    pub fn server_description(&self) -> Option<&ServerDescription> {
        self.server.as_ref()
    }

    /// Data descriptions from the last successful fetch.
    pub fn descriptions(&self) -> Option<&DataDescriptionSet> {
        self.descriptions.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == SessionState::Closed { Err(HarnessError::Closed) } else { Ok(()) }
    }

    fn install_frame_tap(&mut self) -> Result<()> {
        if self.frame_tap_installed {
            return Ok(());
        }
        let tap = Arc::clone(&self.frame_tap);
        self.client
            .set_frame_callback(Box::new(move |frame: &MocapFrame| tap.publish(frame)))
            .map_err(|code| {
                error!(%code, "SetFrameReceivedCallback failed");
                HarnessError::registration_failed(FRAME_HANDLER, code)
            })?;
        self.frame_tap_installed = true;
        Ok(())
    }

    fn install_message_tap(&mut self) -> Result<()> {
        if self.message_tap_installed {
            return Ok(());
        }
        let tap = Arc::clone(&self.message_tap);
        self.client
            .set_message_callback(Box::new(move |verbosity, text: &str| tap.publish(verbosity, text)))
            .map_err(|code| {
                error!(%code, "SetMessageCallback failed");
                HarnessError::registration_failed(MESSAGE_HANDLER, code)
            })?;
        self.message_tap_installed = true;
        Ok(())
    }

    fn close_transport_quietly(&mut self) {
        if !self.transport_open {
            return;
        }
        self.transport_open = false;
        if let Err(code) = self.client.disconnect() {
            warn!(%code, "Disconnect after failed handshake also failed");
        }
    }
}

impl<C: StreamingClient> Drop for Session<C> {
    fn drop(&mut self) {
        debug!("Dropping session");
        let _ = self.shutdown();
    }
}

/// Skip the empty slot before the first frame and end once the tap closes.
fn latest_frames<S>(slots: S) -> impl Stream<Item = Arc<MocapFrame>> + Send + 'static
where
    S: Stream<Item = Option<Arc<MocapFrame>>> + Send + 'static,
{
    slots
        .skip_while(|slot| {
            let is_none = slot.is_none();
            async move { is_none }
        })
        .take_while(|slot| {
            let is_some = slot.is_some();
            async move { is_some }
        })
        .filter_map(|slot| async move { slot })
}
