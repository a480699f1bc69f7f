//! Synthetic scene generator for offline runs
//!
//! Produces deterministic frames for a small scene (rigid bodies moving on
//! circles, one skeleton, a marker cloud) and pushes them into a
//! [`MockClient`] from a dedicated thread, the way a vendor client delivers
//! frames from its own receive thread.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::MockClient;
use crate::error::{HarnessError, Result};
use crate::types::{
    DataDescription, DataDescriptionSet, IDENTITY_ORIENTATION, Marker, MocapFrame, Orientation,
    RigidBody, Skeleton,
};

/// Rate limits accepted by [`SyntheticFeed::spawn`].
const MAX_RATE_HZ: f64 = 1000.0;

/// Number of joints in the generated skeleton.
const SKELETON_JOINTS: i32 = 5;

/// Layout of the generated scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticScene {
    pub rigid_bodies: usize,
    pub skeletons: usize,
    pub labeled_markers: usize,
    pub unlabeled_markers: usize,
    /// Radius of the circular path, in scene units
    pub radius: f32,
}

impl Default for SyntheticScene {
    fn default() -> Self {
        Self { rigid_bodies: 2, skeletons: 1, labeled_markers: 6, unlabeled_markers: 3, radius: 1.5 }
    }
}

impl SyntheticScene {
    /// Scene description matching the frames this scene produces.
    pub fn descriptions(&self) -> DataDescriptionSet {
        let mut descriptions = vec![DataDescription::MarkerSet {
            name: "all".to_string(),
            marker_count: self.labeled_markers,
        }];
        descriptions.extend((0..self.rigid_bodies).map(|index| DataDescription::RigidBody {
            name: format!("RigidBody{}", index + 1),
            id: rigid_body_id(index),
        }));
        descriptions.into_iter().collect()
    }

    /// Frame `index` at scene time `t` seconds.
    pub fn frame(&self, index: u64, t: f64) -> MocapFrame {
        let t = t as f32;

        let rigid_bodies = (0..self.rigid_bodies)
            .map(|slot| {
                let phase = t + slot as f32 * TAU / self.rigid_bodies.max(1) as f32;
                RigidBody::new(
                    rigid_body_id(slot),
                    [self.radius * phase.cos(), 1.0, self.radius * phase.sin()],
                    yaw(phase),
                )
            })
            .collect();

        let skeletons = (0..self.skeletons)
            .map(|slot| {
                let skeleton_id = slot as i32 + 1;
                let sway = (t * 2.0).sin() * 0.1;
                let joints = (0..SKELETON_JOINTS)
                    .map(|joint| {
                        RigidBody::new(
                            skeleton_id * 256 + joint + 1,
                            [sway * joint as f32, 0.2 * joint as f32, slot as f32],
                            IDENTITY_ORIENTATION,
                        )
                    })
                    .collect();
                Skeleton { id: skeleton_id, rigid_bodies: joints }
            })
            .collect();

        let labeled = (0..self.labeled_markers)
            .map(|slot| {
                let angle = t + slot as f32 * TAU / self.labeled_markers.max(1) as f32;
                Marker { id: slot as i32 + 1, position: [angle.cos(), 0.5, angle.sin()] }
            })
            .collect();

        let unlabeled = (0..self.unlabeled_markers)
            .map(|slot| Marker {
                id: 0,
                position: [slot as f32 * 0.25, 0.05 * (t + slot as f32).sin(), -1.0],
            })
            .collect();

        MocapFrame::new(index)
            .with_rigid_bodies(rigid_bodies)
            .with_skeletons(skeletons)
            .with_markers(labeled, unlabeled)
            .with_receive_timestamp(f64::from(t))
    }
}

fn rigid_body_id(slot: usize) -> i32 {
    slot as i32 + 1
}

fn yaw(angle: f32) -> Orientation {
    let half = angle / 2.0;
    [0.0, half.sin(), 0.0, half.cos()]
}

/// Background thread emitting synthetic frames at a fixed rate.
///
/// Dropping the feed stops the thread and joins it.
pub struct SyntheticFeed {
    running: Arc<AtomicBool>,
    emitted: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl SyntheticFeed {
    /// Start emitting frames into `client` at `rate_hz`.
    ///
    /// Frames emitted while the client is disconnected are skipped but still
    /// advance the frame index.
    pub fn spawn(client: MockClient, scene: SyntheticScene, rate_hz: f64) -> Result<Self> {
        if !(rate_hz > 0.0 && rate_hz <= MAX_RATE_HZ) {
            return Err(HarnessError::config(
                "simulate_hz",
                format!("must be in (0, {MAX_RATE_HZ}], got {rate_hz}"),
            ));
        }

        let period = Duration::from_secs_f64(1.0 / rate_hz);
        let running = Arc::new(AtomicBool::new(true));
        let emitted = Arc::new(AtomicU64::new(0));

        let handle = thread::Builder::new()
            .name("synthetic-feed".to_string())
            .spawn({
                let running = Arc::clone(&running);
                let emitted = Arc::clone(&emitted);
                move || feed_loop(client, scene, period, running, emitted)
            })
            .map_err(|err| {
                HarnessError::config("simulate_hz", format!("failed to start feed thread: {err}"))
            })?;

        info!(rate_hz, "Synthetic feed started");
        Ok(Self { running, emitted, handle: Some(handle) })
    }

    /// Frames delivered to a connected client so far.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Synthetic feed thread panicked");
            }
            debug!(emitted = self.emitted(), "Synthetic feed stopped");
        }
    }
}

impl Drop for SyntheticFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

fn feed_loop(
    client: MockClient,
    scene: SyntheticScene,
    period: Duration,
    running: Arc<AtomicBool>,
    emitted: Arc<AtomicU64>,
) {
    let start = Instant::now();
    let mut next = start;
    let mut index = 1u64;

    while running.load(Ordering::SeqCst) {
        let frame = scene.frame(index, start.elapsed().as_secs_f64());
        if client.emit_frame(&frame) {
            emitted.fetch_add(1, Ordering::Relaxed);
        }
        index += 1;

        next += period;
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        } else {
            next = now;
        }
    }
}
