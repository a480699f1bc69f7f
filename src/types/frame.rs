//! Per-frame motion capture data

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in scene units (`x`, `y`, `z`).
pub type Position = [f32; 3];

/// Orientation quaternion (`x`, `y`, `z`, `w`).
pub type Orientation = [f32; 4];

/// Identity orientation.
pub const IDENTITY_ORIENTATION: Orientation = [0.0, 0.0, 0.0, 1.0];

/// A tracked rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub id: i32,
    pub position: Position,
    pub orientation: Orientation,
}

impl RigidBody {
    pub fn new(id: i32, position: Position, orientation: Orientation) -> Self {
        Self { id, position, orientation }
    }
}

/// An articulated structure whose joints are rigid bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub id: i32,
    pub rigid_bodies: Vec<RigidBody>,
}

/// A single reflective marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: i32,
    pub position: Position,
}

/// One frame of motion capture data.
///
/// The streaming capability lends frames to its callback only for the
/// duration of the call; the harness stores owned copies of this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MocapFrame {
    /// Server frame counter, non-decreasing while connected
    pub frame_index: u64,
    pub rigid_bodies: Vec<RigidBody>,
    pub skeletons: Vec<Skeleton>,
    pub labeled_markers: Vec<Marker>,
    pub unlabeled_markers: Vec<Marker>,
    /// Camera data receive timestamp in seconds, when the server reports one
    pub receive_timestamp: Option<f64>,
}

impl MocapFrame {
    /// Create an empty frame with the given index.
    pub fn new(frame_index: u64) -> Self {
        Self { frame_index, ..Self::default() }
    }

    pub fn with_rigid_bodies(mut self, rigid_bodies: Vec<RigidBody>) -> Self {
        self.rigid_bodies = rigid_bodies;
        self
    }

    pub fn with_skeletons(mut self, skeletons: Vec<Skeleton>) -> Self {
        self.skeletons = skeletons;
        self
    }

    pub fn with_markers(mut self, labeled: Vec<Marker>, unlabeled: Vec<Marker>) -> Self {
        self.labeled_markers = labeled;
        self.unlabeled_markers = unlabeled;
        self
    }

    pub fn with_receive_timestamp(mut self, timestamp: f64) -> Self {
        self.receive_timestamp = Some(timestamp);
        self
    }

    /// Look up a rigid body by its streaming ID.
    pub fn rigid_body(&self, id: i32) -> Option<&RigidBody> {
        self.rigid_bodies.iter().find(|rb| rb.id == id)
    }

    /// One-line console summary of the frame contents.
    pub fn summary(&self) -> FrameSummary<'_> {
        FrameSummary(self)
    }
}

/// Display adapter produced by [`MocapFrame::summary`].
pub struct FrameSummary<'a>(&'a MocapFrame);

impl fmt::Display for FrameSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.0;
        write!(
            f,
            "[Frame] {}  RBs: {}  Unlabeled: {}  Labeled: {}",
            frame.frame_index,
            frame.rigid_bodies.len(),
            frame.unlabeled_markers.len(),
            frame.labeled_markers.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_matches_console_format() {
        let frame = MocapFrame::new(42)
            .with_rigid_bodies(vec![RigidBody::new(1, [0.0; 3], IDENTITY_ORIENTATION)])
            .with_markers(vec![Marker { id: 7, position: [1.0, 2.0, 3.0] }], vec![]);

        assert_eq!(frame.summary().to_string(), "[Frame] 42  RBs: 1  Unlabeled: 0  Labeled: 1");
    }

    #[test]
    fn rigid_body_lookup_by_id() {
        let frame = MocapFrame::new(1).with_rigid_bodies(vec![
            RigidBody::new(3, [1.0, 0.0, 0.0], IDENTITY_ORIENTATION),
            RigidBody::new(9, [0.0, 1.0, 0.0], IDENTITY_ORIENTATION),
        ]);

        assert_eq!(frame.rigid_body(9).map(|rb| rb.position), Some([0.0, 1.0, 0.0]));
        assert!(frame.rigid_body(4).is_none());
    }
}
