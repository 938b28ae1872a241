//! Dynamic vertex-buffer streaming benchmark.
//!
//! A CPU-simulated point cloud is streamed into a GPU vertex buffer every frame
//! through one of several [`BufferUpdateStrategy`] implementations, and the cost
//! of the update step is measured apart from rendering.
//!
//! Layering:
//! - [`harness`] owns the window loop and drives a [`StreamSession`]
//! - [`session`] owns the points, the buffer and the strategy for one run
//! - [`strategy`] implements the buffer update techniques being compared

pub mod batch;
pub mod buffer;
pub mod config;
pub mod harness;
pub mod points;
pub mod render;
pub mod session;
pub mod strategy;

pub use batch::{BatchPlan, BatchRange};
pub use buffer::PositionBuffer;
pub use config::BenchmarkConfig;
pub use harness::StreamingBenchmark;
pub use points::PointSet;
pub use session::{BenchmarkReport, StreamSession};
pub use strategy::{BufferUpdateStrategy, Lifecycle, StrategyKind};
