//! Streaming client trait for motion capture capabilities

use std::fmt;

use crate::types::{
    ConnectionConfig, DataDescriptionSet, MocapFrame, ServerDescription, Verbosity,
};

/// Numeric status code returned by a streaming capability.
///
/// Codes are kept verbatim so they can be reported exactly as the
/// capability returned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const OK: ErrorCode = ErrorCode(0);
    pub const INTERNAL: ErrorCode = ErrorCode(1);
    pub const EXTERNAL: ErrorCode = ErrorCode(2);
    pub const NETWORK: ErrorCode = ErrorCode(3);
    pub const OTHER: ErrorCode = ErrorCode(4);
    pub const INVALID_ARGUMENT: ErrorCode = ErrorCode(5);
    pub const INVALID_OPERATION: ErrorCode = ErrorCode(6);
    pub const INVALID_SIZE: ErrorCode = ErrorCode(7);

    /// Name of a known code.
    pub fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("OK"),
            1 => Some("Internal"),
            2 => Some("External"),
            3 => Some("Network"),
            4 => Some("Other"),
            5 => Some("InvalidArgument"),
            6 => Some("InvalidOperation"),
            7 => Some("InvalidSize"),
            _ => None,
        }
    }

    pub fn is_ok(self) -> bool {
        self == ErrorCode::OK
    }

    /// Convert a raw status into a `Result`.
    pub fn into_result(self) -> ClientResult<()> {
        if self.is_ok() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({name})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Result of a call into the streaming capability.
pub type ClientResult<T> = std::result::Result<T, ErrorCode>;

/// Callback invoked for every received frame.
///
/// The frame reference is only valid for the duration of the call.
pub type FrameCallback = Box<dyn Fn(&MocapFrame) + Send + Sync + 'static>;

/// Callback invoked for every diagnostic message, with the raw verbosity.
pub type MessageCallback = Box<dyn Fn(Verbosity, &str) + Send + Sync + 'static>;

/// A motion capture streaming capability.
///
/// Implementations wrap a vendor client library (or a mock). They own the
/// transport and decoding, and invoke the installed callbacks from whatever
/// thread they receive data on. Callbacks installed here must return
/// promptly; the harness only does non-blocking work inside them.
///
/// Outputs that the vendor library hands out as borrowed buffers must be
/// copied into the owned return types before the vendor scope is released.
pub trait StreamingClient: Send + 'static {
    /// Establish the transport.
    fn connect(&mut self, config: &ConnectionConfig) -> ClientResult<()>;

    /// Install the frame callback, replacing any previous one.
    fn set_frame_callback(&mut self, callback: FrameCallback) -> ClientResult<()>;

    /// Install the diagnostic message callback, replacing any previous one.
    fn set_message_callback(&mut self, callback: MessageCallback) -> ClientResult<()>;

    /// Read the server handshake result.
    fn server_description(&mut self) -> ClientResult<ServerDescription>;

    /// Request the scene description.
    fn data_descriptions(&mut self) -> ClientResult<DataDescriptionSet>;

    /// Tear down the transport.
    fn disconnect(&mut self) -> ClientResult<()>;
}

impl<C: StreamingClient + ?Sized> StreamingClient for Box<C> {
    fn connect(&mut self, config: &ConnectionConfig) -> ClientResult<()> {
        (**self).connect(config)
    }

    fn set_frame_callback(&mut self, callback: FrameCallback) -> ClientResult<()> {
        (**self).set_frame_callback(callback)
    }

    fn set_message_callback(&mut self, callback: MessageCallback) -> ClientResult<()> {
        (**self).set_message_callback(callback)
    }

    fn server_description(&mut self) -> ClientResult<ServerDescription> {
        (**self).server_description()
    }

    fn data_descriptions(&mut self) -> ClientResult<DataDescriptionSet> {
        (**self).data_descriptions()
    }

    fn disconnect(&mut self) -> ClientResult<()> {
        (**self).disconnect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_display_with_names() {
        assert_eq!(ErrorCode::NETWORK.to_string(), "3 (Network)");
        assert_eq!(ErrorCode(42).to_string(), "42");
        assert_eq!(ErrorCode(-1).name(), None);
    }

    #[test]
    fn ok_code_converts_to_ok() {
        assert_eq!(ErrorCode::OK.into_result(), Ok(()));
        assert_eq!(ErrorCode::INVALID_OPERATION.into_result(), Err(ErrorCode::INVALID_OPERATION));
    }
}
