//! Stream combinators for frame consumers

mod sample;

pub use sample::{SampleExt, SampleLatest};
