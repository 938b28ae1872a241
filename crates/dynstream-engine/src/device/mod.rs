//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - acquiring frames and providing encoders/views for rendering
//! - blocking helpers for buffer mapping

mod context;
mod error;
mod gpu;
mod init;
mod surface;

pub use context::GpuContext;
pub use error::SurfaceErrorAction;
pub use gpu::{Gpu, GpuFrame};
pub use init::GpuInit;
