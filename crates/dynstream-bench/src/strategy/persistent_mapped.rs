use anyhow::{Context, Result};
use dynstream_engine::coords::Vec3;
use dynstream_engine::device::GpuContext;

use super::{create_staging, write_staged, BufferUpdateStrategy, Lifecycle};
use crate::batch::BatchRange;
use crate::buffer::PositionBuffer;

/// Keeps a staging buffer mapped across all updates of a frame.
///
/// `update` is a plain memory copy into the mapping and issues no GPU command.
/// `flush` unmaps, copies every range written during the frame into the position
/// buffer in a single submission, and maps the staging buffer again for the next
/// frame. wgpu can not keep a buffer mapped while the GPU reads it, so mapping
/// persists for a frame rather than for the whole run.
#[derive(Debug, Default)]
pub struct PersistentMapped {
    lifecycle: Lifecycle,
    staging: Option<wgpu::Buffer>,
    mapped: bool,

    /// Ranges written since the last flush, ascending and coalesced.
    dirty: Vec<BatchRange>,
}

impl PersistentMapped {
    pub const NAME: &'static str = "persistent-mapped";

    pub fn new() -> Self {
        Self::default()
    }

    fn mark_dirty(&mut self, range: BatchRange) {
        if let Some(last) = self.dirty.last_mut() {
            if let Some(merged) = last.merge(range) {
                *last = merged;
                return;
            }
        }
        self.dirty.push(range);
    }

    /// Ranges waiting for the next flush.
    pub fn pending(&self) -> &[BatchRange] {
        &self.dirty
    }
}

impl BufferUpdateStrategy for PersistentMapped {
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
        self.staging = Some(create_staging(gpu.device(), buffer, "dynstream persistent staging"));
        self.mapped = true;

        let all = BatchRange::new(0, positions.len());
        self.update(gpu, buffer, positions, all)?;
        self.flush(gpu, buffer)
            .context("failed to upload initial positions")
    }

    fn update(
        &mut self,
        _gpu: &GpuContext,
        _buffer: &PositionBuffer,
        positions: &[Vec3],
        range: BatchRange,
    ) -> Result<()> {
        self.lifecycle.assert_initialized(Self::NAME, "update");
        range.assert_within(positions.len());

        let Some(staging) = self.staging.as_ref() else {
            anyhow::bail!("{}: staging buffer missing", Self::NAME);
        };
        anyhow::ensure!(self.mapped, "{}: staging buffer is not mapped", Self::NAME);

        write_staged(staging, positions, range);
        self.mark_dirty(range);
        Ok(())
    }

    fn flush(&mut self, gpu: &GpuContext, buffer: &PositionBuffer) -> Result<()> {
        self.lifecycle.assert_initialized(Self::NAME, "flush");
        if self.dirty.is_empty() {
            return Ok(());
        }

        let Some(staging) = self.staging.as_ref() else {
            anyhow::bail!("{}: staging buffer missing", Self::NAME);
        };

        staging.unmap();
        self.mapped = false;

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("dynstream persistent flush"),
            });
        for range in self.dirty.drain(..) {
            encoder.copy_buffer_to_buffer(
                staging,
                range.byte_offset(),
                buffer.raw(),
                range.byte_offset(),
                range.byte_len(),
            );
        }
        gpu.queue().submit(std::iter::once(encoder.finish()));

        gpu.map_blocking(staging.slice(..), wgpu::MapMode::Write)
            .context("failed to re-map persistent staging buffer")?;
        self.mapped = true;
        Ok(())
    }

    fn shutdown(&mut self, _gpu: &GpuContext) {
        self.lifecycle.end(Self::NAME);

        if let Some(staging) = self.staging.take() {
            if self.mapped {
                staging.unmap();
            }
            staging.destroy();
        }
        self.mapped = false;

        if !self.dirty.is_empty() {
            log::warn!("{}: {} ranges discarded unflushed at shutdown", Self::NAME, self.dirty.len());
            self.dirty.clear();
        }
    }
}
