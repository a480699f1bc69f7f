//! Delivery rate control for frame streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Update rate for frame streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every frame the server sends
    Native,

    /// At most this many frames per second, latest frame wins
    /// `Max(0)` is treated as `Native`
    Max(u32),
}

impl UpdateRate {
    /// Sampling interval, or `None` when every frame is delivered
    pub fn interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => Some(Duration::from_nanos(1_000_000_000 / u64::from(hz))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals() {
        assert_eq!(UpdateRate::Native.interval(), None);
        assert_eq!(UpdateRate::Max(0).interval(), None);
        assert_eq!(UpdateRate::Max(10).interval(), Some(Duration::from_millis(100)));
    }
}
