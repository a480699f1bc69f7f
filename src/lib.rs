//! Session harness for OptiTrack Motive streaming clients.
//!
//! Wraps a motion capture streaming client behind a small, typed session:
//! validate settings, connect, hand frames and diagnostic messages to
//! handlers off the client's receive thread, fetch the scene description,
//! idle until asked to stop, and tear everything down exactly once.
//!
//! # Features
//!
//! - **Pluggable client**: anything implementing [`StreamingClient`]
//! - **Isolated handlers**: a failing or panicking handler never reaches the
//!   client's callback thread
//! - **Bounded handoff**: frames are queued for handlers and dropped (and
//!   counted) when a handler falls behind
//! - **Frame streams**: latest frame and rate-limited streams via [`Session::frames`]
//!
//! ## Example (mock client)
//!
//! ```rust,no_run
//! use mocap_harness::providers::MockClient;
//! use mocap_harness::types::{ServerDescription, TransportMode};
//! use mocap_harness::{ConnectionConfig, Session, ShutdownSignal};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MockClient::new()
//!         .with_server(ServerDescription::present("Motive", (3, 0, 0), (4, 1, 0)));
//!     let config = ConnectionConfig::new("127.0.0.1", "127.0.0.1")?
//!         .with_transport(TransportMode::Unicast);
//!
//!     let mut session = Session::configure(config, client)?;
//!     session.connect()?;
//!     session.register_frame_handler(|frame| {
//!         println!("{}", frame.summary());
//!         Ok(())
//!     })?;
//!
//!     let signal = ShutdownSignal::new();
//!     signal.listen_for_interrupt();
//!     session.run_until_signaled(&signal, Duration::from_millis(100)).await;
//!     session.shutdown()?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod client;
pub mod config;
mod dispatch;
mod error;
pub mod types;

// Session lifecycle
pub mod providers;
pub mod session;
pub mod signal;
pub mod stream;

// Core exports
pub use client::{ClientResult, ErrorCode, StreamingClient};
pub use config::HarnessConfig;
pub use dispatch::SessionStats;
pub use error::*;
pub use session::{Session, SessionOptions, SessionState};
pub use signal::ShutdownSignal;
pub use types::{ConnectionConfig, MocapFrame, Severity, TransportMode, UpdateRate, Verbosity};
