use anyhow::Result;
use dynstream_engine::coords::Vec3;
use dynstream_engine::device::GpuContext;

use super::{BufferUpdateStrategy, Lifecycle};
use crate::batch::BatchRange;
use crate::buffer::PositionBuffer;

/// Uploads the initial contents at allocation, then hands each changed
/// sub-range to `Queue::write_buffer`.
///
/// The queue owns staging and synchronization; nothing is kept here.
#[derive(Debug, Default)]
pub struct ReplaceWhole {
    lifecycle: Lifecycle,
}

impl ReplaceWhole {
    pub const NAME: &'static str = "replace-whole";

    pub fn new() -> Self {
        Self::default()
    }
}

impl BufferUpdateStrategy for ReplaceWhole {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn init(
        &mut self,
        gpu: &GpuContext,
        buffer: &mut PositionBuffer,
        positions: &[Vec3],
    ) -> Result<()> {
        self.lifecycle.begin(Self::NAME);
        buffer.allocate(gpu.device(), Some(positions));
        Ok(())
    }

    fn update(
        &mut self,
        gpu: &GpuContext,
        buffer: &PositionBuffer,
        positions: &[Vec3],
        range: BatchRange,
    ) -> Result<()> {
        self.lifecycle.assert_initialized(Self::NAME, "update");
        range.assert_within(positions.len());

        gpu.queue()
            .write_buffer(buffer.raw(), range.byte_offset(), range.bytes(positions));
        Ok(())
    }

    fn shutdown(&mut self, _gpu: &GpuContext) {
        self.lifecycle.end(Self::NAME);
    }
}
