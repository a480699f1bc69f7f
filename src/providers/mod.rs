//! Streaming client implementations that run without a capture server
//!
//! - [`MockClient`]: scriptable client with error injection
//! - [`SyntheticFeed`]: drives a [`MockClient`] with generated frames

mod mock;
mod synthetic;

pub use mock::MockClient;
pub use synthetic::{SyntheticFeed, SyntheticScene};
