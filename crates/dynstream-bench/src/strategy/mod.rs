//! Buffer update strategies.
//!
//! Each strategy gets the same inputs (the full current position array and one
//! batch range at a time) and must leave the position buffer with identical
//! contents. They differ only in how the bytes reach the device:
//!
//! - [`ReplaceWhole`]: queue-managed sub-range writes
//! - [`PersistentMapped`]: a staging buffer kept mapped for the whole frame,
//!   plain memory copies per update, one copy submission per frame
//! - [`MapUnmapPerUpdate`]: map, copy, unmap and submit for every batch

mod map_unmap;
mod persistent_mapped;
mod replace_whole;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use dynstream_engine::coords::Vec3;
use dynstream_engine::device::GpuContext;

use crate::batch::BatchRange;
use crate::buffer::PositionBuffer;

pub use map_unmap::MapUnmapPerUpdate;
pub use persistent_mapped::PersistentMapped;
pub use replace_whole::ReplaceWhole;

/// Technique for getting updated positions into the position buffer.
///
/// Call order per instance: `init` once, then any number of `update` calls
/// followed by one `flush` per frame, then `shutdown` once. Any other order is a
/// caller bug and panics.
pub trait BufferUpdateStrategy {
    /// Short label used in logs and the window title.
    fn name(&self) -> &'static str;

    fn lifecycle(&self) -> Lifecycle;

    /// Allocates the buffer storage and fills it with `positions`.
    fn init(
        &mut self,
        gpu: &GpuContext,
        buffer: &mut PositionBuffer,
        positions: &[Vec3],
    ) -> Result<()>;

    /// Brings the bytes of `positions[range]` up to date.
    ///
    /// `positions` is the whole current array. Other bytes keep the values
    /// written by earlier calls.
    fn update(
        &mut self,
        gpu: &GpuContext,
        buffer: &PositionBuffer,
        positions: &[Vec3],
        range: BatchRange,
    ) -> Result<()>;

    /// Makes every range written since the previous flush visible to the next draw.
    fn flush(&mut self, gpu: &GpuContext, buffer: &PositionBuffer) -> Result<()> {
        let _ = (gpu, buffer);
        self.lifecycle().assert_initialized(self.name(), "flush");
        Ok(())
    }

    /// Releases strategy-owned device state. The buffer itself stays alive.
    fn shutdown(&mut self, gpu: &GpuContext);
}

/// Strategy lifecycle: `Uninitialized → Initialized → Shutdown`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Initialized,
    Shutdown,
}

impl Lifecycle {
    /// Transition for `init`.
    #[track_caller]
    pub fn begin(&mut self, strategy: &str) {
        assert!(
            *self == Lifecycle::Uninitialized,
            "{strategy}: init called while {self:?}"
        );
        *self = Lifecycle::Initialized;
    }

    #[track_caller]
    pub fn assert_initialized(self, strategy: &str, op: &str) {
        assert!(
            self == Lifecycle::Initialized,
            "{strategy}: {op} called while {self:?}"
        );
    }

    /// Transition for `shutdown`.
    #[track_caller]
    pub fn end(&mut self, strategy: &str) {
        self.assert_initialized(strategy, "shutdown");
        *self = Lifecycle::Shutdown;
    }
}

/// Closed set of the available strategies, for configuration and reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    ReplaceWhole,
    PersistentMapped,
    MapUnmapPerUpdate,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::ReplaceWhole,
        StrategyKind::PersistentMapped,
        StrategyKind::MapUnmapPerUpdate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::ReplaceWhole => ReplaceWhole::NAME,
            StrategyKind::PersistentMapped => PersistentMapped::NAME,
            StrategyKind::MapUnmapPerUpdate => MapUnmapPerUpdate::NAME,
        }
    }

    pub fn build(self) -> Box<dyn BufferUpdateStrategy> {
        match self {
            StrategyKind::ReplaceWhole => Box::new(ReplaceWhole::new()),
            StrategyKind::PersistentMapped => Box::new(PersistentMapped::new()),
            StrategyKind::MapUnmapPerUpdate => Box::new(MapUnmapPerUpdate::new()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "replace-whole" | "replace" | "buffer-data" => Ok(StrategyKind::ReplaceWhole),
            "persistent-mapped" | "persistent" | "map-range" => Ok(StrategyKind::PersistentMapped),
            "map-unmap" | "map-unmap-per-update" | "map" => Ok(StrategyKind::MapUnmapPerUpdate),
            other => anyhow::bail!(
                "unknown strategy {other:?} (expected replace-whole, persistent-mapped or map-unmap)"
            ),
        }
    }
}

/// Writes the bytes of `range` into a write-mapped staging buffer that mirrors
/// the position layout.
///
/// Mapped views must start on `wgpu::MAP_ALIGNMENT`, which a 12-byte stride does
/// not guarantee. The view is widened down to the alignment boundary and filled
/// from the same position array, so the extra leading bytes receive the current
/// value of the preceding point. Copies out of the staging buffer use the exact
/// range, so those bytes never reach the position buffer.
fn write_staged(staging: &wgpu::Buffer, positions: &[Vec3], range: BatchRange) {
    let all: &[u8] = bytemuck::cast_slice(positions);
    let start = range.byte_offset() - range.byte_offset() % wgpu::MAP_ALIGNMENT;
    let end = range.byte_end();

    let mut view = staging.slice(start..end).get_mapped_range_mut();
    view.copy_from_slice(&all[start as usize..end as usize]);
}

/// `MAP_WRITE | COPY_SRC` buffer sized like `buffer`, mapped at creation.
fn create_staging(device: &wgpu::Device, buffer: &PositionBuffer, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: buffer.byte_size(),
        usage: wgpu::BufferUsages::MAP_WRITE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: true,
    })
}
