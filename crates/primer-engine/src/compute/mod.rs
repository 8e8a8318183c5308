//! Compute dispatch and host readback.
//!
//! Stage host data into a storage buffer, dispatch over a grid that covers the
//! data extent, copy the result into a staging buffer and map it for read.

mod dispatch;
mod job;
mod readback;

pub use dispatch::WorkgroupGrid;
pub use job::ComputeJob;
pub use readback::{round_trip, StagingBuffer};
