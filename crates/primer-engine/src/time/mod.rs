//! Frame timing.
//!
//! The driver owns one [`FrameClock`] and ticks it once per recorded frame; scenes
//! only ever see the resulting [`FrameTime`], so animation is a pure function of
//! `elapsed` and can be replayed at fixed times.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
