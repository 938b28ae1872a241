//! Time subsystem.
//!
//! Provides stable, testable timing utilities without coupling to the runtime:
//! - one `FrameClock` per render loop; call `tick()` once per presented frame
//! - `CostTimer` to measure a section of the frame in isolation

mod cost_timer;
mod frame_clock;

pub use cost_timer::{as_millis, CostTimer};
pub use frame_clock::{FrameClock, FrameTime};
