//! GPU rendering context handed to renderers.
//!
//! Each renderer is responsible for its own GPU resources (pipelines, buffers)
//! and records passes into the frame encoder it is given.

mod ctx;

pub use ctx::{RenderCtx, RenderTarget};
