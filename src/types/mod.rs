//! Core types for motion capture sessions.
//!
//! Everything here is an owned value. The streaming capability lends its
//! frames and descriptions for the duration of a call; the harness copies
//! them into these types before the call returns.
//!
//! - [`ConnectionConfig`] holds validated connection settings
//! - [`MocapFrame`] carries rigid bodies, skeletons and markers for one frame
//! - [`ServerDescription`] is the post-connect handshake snapshot
//! - [`DataDescriptionSet`] describes the named entities in the scene
//! - [`Severity`] classifies diagnostic messages; [`Verbosity`] keeps the raw value
//!
//! ```rust
//! use mocap_harness::types::{MocapFrame, RigidBody, IDENTITY_ORIENTATION};
//!
//! let frame = MocapFrame::new(42)
//!     .with_rigid_bodies(vec![RigidBody::new(1, [0.0, 0.0, 0.0], IDENTITY_ORIENTATION)]);
//!
//! assert_eq!(frame.rigid_body(1).map(|rb| rb.orientation[3]), Some(1.0));
//! println!("{}", frame.summary());
//! ```

mod config;
mod description;
mod frame;
mod severity;
mod update_rate;

pub use config::{
    ConnectionConfig, DEFAULT_COMMAND_PORT, DEFAULT_DATA_PORT, DEFAULT_MULTICAST_ADDRESS,
    RawConnectionConfig, TransportMode,
};
pub use description::{DataDescription, DataDescriptionSet, ServerDescription, Version};
pub use frame::{
    FrameSummary, IDENTITY_ORIENTATION, Marker, MocapFrame, Orientation, Position, RigidBody,
    Skeleton,
};
pub use severity::{Severity, Verbosity};
pub use update_rate::UpdateRate;
