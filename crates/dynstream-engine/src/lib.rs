//! dynstream engine crate.
//!
//! This crate owns the platform + GPU runtime pieces used by the benchmarks:
//! device creation, the window loop, frame timing and logging.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
