use anyhow::{Context, Result};
use dynstream_engine::coords::Vec3;
use dynstream_engine::device::GpuContext;

use super::{create_staging, write_staged, BufferUpdateStrategy, Lifecycle};
use crate::batch::BatchRange;
use crate::buffer::PositionBuffer;

/// Maps the whole staging buffer for every update, copies the batch, unmaps,
/// and submits a copy of just that batch.
///
/// Every call waits for the previous copy to finish before the map completes.
#[derive(Debug, Default)]
pub struct MapUnmapPerUpdate {
    lifecycle: Lifecycle,
    staging: Option<wgpu::Buffer>,
}

impl MapUnmapPerUpdate {
    pub const NAME: &'static str = "map-unmap";

    pub fn new() -> Self {
        Self::default()
    }

    fn copy_to_buffer(
        gpu: &GpuContext,
        staging: &wgpu::Buffer,
        buffer: &PositionBuffer,
        range: BatchRange,
    ) {
        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("dynstream map-unmap copy"),
            });
        encoder.copy_buffer_to_buffer(
            staging,
            range.byte_offset(),
            buffer.raw(),
            range.byte_offset(),
            range.byte_len(),
        );
        gpu.queue().submit(std::iter::once(encoder.finish()));
    }
}

impl BufferUpdateStrategy for MapUnmapPerUpdate {
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

        buffer.allocate(gpu.device(), None);
        let staging = create_staging(gpu.device(), buffer, "dynstream map-unmap staging");

        let all = BatchRange::new(0, positions.len());
        write_staged(&staging, positions, all);
        staging.unmap();
        Self::copy_to_buffer(gpu, &staging, buffer, all);

        self.staging = Some(staging);
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

        let Some(staging) = self.staging.as_ref() else {
            anyhow::bail!("{}: staging buffer missing", Self::NAME);
        };

        gpu.map_blocking(staging.slice(..), wgpu::MapMode::Write)
            .context("failed to map staging buffer for update")?;
        write_staged(staging, positions, range);
        staging.unmap();

        Self::copy_to_buffer(gpu, staging, buffer, range);
        Ok(())
    }

    fn shutdown(&mut self, _gpu: &GpuContext) {
        self.lifecycle.end(Self::NAME);
        if let Some(staging) = self.staging.take() {
            staging.destroy();
        }
    }
}
