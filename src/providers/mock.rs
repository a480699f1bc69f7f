//! Scriptable streaming client for tests and simulation
//!
//! Uses a builder pattern to configure the server description, the scene
//! description and error injection. Clones share state, so a test can keep a
//! handle to emit frames and inspect call counts after moving a clone into a
//! [`Session`](crate::Session).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

use crate::client::{ClientResult, ErrorCode, FrameCallback, MessageCallback, StreamingClient};
use crate::types::{
    ConnectionConfig, DataDescriptionSet, MocapFrame, ServerDescription, Severity, Verbosity,
};

type SharedFrameCallback = Arc<dyn Fn(&MocapFrame) + Send + Sync>;
type SharedMessageCallback = Arc<dyn Fn(Verbosity, &str) + Send + Sync>;

/// Operations whose failure can be injected.
#[derive(Debug, Default)]
struct Failures {
    connect: Option<ErrorCode>,
    server_description: Option<ErrorCode>,
    data_descriptions: Option<ErrorCode>,
    frame_callback: Option<ErrorCode>,
    message_callback: Option<ErrorCode>,
    disconnect: Option<ErrorCode>,
}

#[derive(Default)]
struct MockState {
    server: ServerDescription,
    descriptions: DataDescriptionSet,
    failures: Failures,
    connected: bool,
    last_config: Option<ConnectionConfig>,
    frame_callback: Option<SharedFrameCallback>,
    message_callback: Option<SharedMessageCallback>,
    connect_calls: usize,
    disconnect_calls: usize,
    fetch_calls: usize,
}

/// Mock streaming client.
///
/// All state is behind a `Mutex`; callbacks are invoked after the lock is
/// released, from whichever thread calls [`MockClient::emit_frame`] or
/// [`MockClient::emit_message`].
#[derive(Clone, Default)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    /// Create a mock whose handshake reports no host.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn configure(self, apply: impl FnOnce(&mut MockState)) -> Self {
        apply(&mut self.lock());
        self
    }

    /// Server description reported after connect.
    pub fn with_server(self, server: ServerDescription) -> Self {
        self.configure(|state| state.server = server)
    }

    /// Scene description returned by fetches.
    pub fn with_descriptions(self, descriptions: DataDescriptionSet) -> Self {
        self.configure(|state| state.descriptions = descriptions)
    }

    pub fn fail_connect(self, code: ErrorCode) -> Self {
        self.configure(|state| state.failures.connect = Some(code))
    }

    pub fn fail_server_description(self, code: ErrorCode) -> Self {
        self.configure(|state| state.failures.server_description = Some(code))
    }

    pub fn fail_data_descriptions(self, code: ErrorCode) -> Self {
        self.configure(|state| state.failures.data_descriptions = Some(code))
    }

    pub fn fail_frame_callback(self, code: ErrorCode) -> Self {
        self.configure(|state| state.failures.frame_callback = Some(code))
    }

    pub fn fail_message_callback(self, code: ErrorCode) -> Self {
        self.configure(|state| state.failures.message_callback = Some(code))
    }

    pub fn fail_disconnect(self, code: ErrorCode) -> Self {
        self.configure(|state| state.failures.disconnect = Some(code))
    }

    /// Deliver a frame to the installed frame callback.
    ///
    /// Returns `false` when the client is not connected or no callback is
    /// installed. The callback only borrows the frame.
    pub fn emit_frame(&self, frame: &MocapFrame) -> bool {
        let callback = {
            let state = self.lock();
            if !state.connected {
                return false;
            }
            state.frame_callback.clone()
        };

        match callback {
            Some(callback) => {
                callback(frame);
                true
            }
            None => {
                trace!(frame_index = frame.frame_index, "No frame callback installed");
                false
            }
        }
    }

    /// Deliver a diagnostic message to the installed message callback.
    ///
    /// Accepts a [`Severity`] or a raw [`Verbosity`], including values the
    /// capability does not document.
    pub fn emit_message(&self, verbosity: impl Into<Verbosity>, text: &str) -> bool {
        let callback = self.lock().message_callback.clone();
        match callback {
            Some(callback) => {
                callback(verbosity.into(), text);
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Config passed to the most recent connect call.
    pub fn last_config(&self) -> Option<ConnectionConfig> {
        self.lock().last_config.clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.lock().connect_calls
    }

    pub fn disconnect_calls(&self) -> usize {
        self.lock().disconnect_calls
    }

    pub fn fetch_calls(&self) -> usize {
        self.lock().fetch_calls
    }
}

impl StreamingClient for MockClient {
    fn connect(&mut self, config: &ConnectionConfig) -> ClientResult<()> {
        {
            let mut state = self.lock();
            state.connect_calls += 1;
            state.last_config = Some(config.clone());
            if let Some(code) = state.failures.connect {
                return Err(code);
            }
            state.connected = true;
        }

        self.emit_message(
            Severity::Info,
            &format!(
                "Connected to server at {} ({}, ports {}/{})",
                config.server_address(),
                config.transport(),
                config.command_port(),
                config.data_port()
            ),
        );
        Ok(())
    }

    fn set_frame_callback(&mut self, callback: FrameCallback) -> ClientResult<()> {
        let mut state = self.lock();
        if let Some(code) = state.failures.frame_callback {
            return Err(code);
        }
        state.frame_callback = Some(Arc::from(callback));
        Ok(())
    }

    fn set_message_callback(&mut self, callback: MessageCallback) -> ClientResult<()> {
        let mut state = self.lock();
        if let Some(code) = state.failures.message_callback {
            return Err(code);
        }
        state.message_callback = Some(Arc::from(callback));
        Ok(())
    }

    fn server_description(&mut self) -> ClientResult<ServerDescription> {
        let state = self.lock();
        if let Some(code) = state.failures.server_description {
            return Err(code);
        }
        Ok(state.server.clone())
    }

    fn data_descriptions(&mut self) -> ClientResult<DataDescriptionSet> {
        let mut state = self.lock();
        state.fetch_calls += 1;
        if !state.connected {
            return Err(ErrorCode::INVALID_OPERATION);
        }
        if let Some(code) = state.failures.data_descriptions {
            return Err(code);
        }
        Ok(state.descriptions.clone())
    }

    fn disconnect(&mut self) -> ClientResult<()> {
        let mut state = self.lock();
        state.disconnect_calls += 1;
        state.connected = false;
        state.failures.disconnect.unwrap_or(ErrorCode::OK).into_result()
    }
}
