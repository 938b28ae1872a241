use anyhow::{Context, Result};
use dynstream_engine::coords::Vec3;
use dynstream_engine::device::GpuContext;
use wgpu::util::DeviceExt;

/// Device-visible storage for the point positions, bound as vertex buffer 0.
///
/// The harness creates the handle; the active strategy allocates its storage
/// during `init`. Contents are laid out as `len` packed `Vec3`s.
pub struct PositionBuffer {
    len: usize,
    buffer: Option<wgpu::Buffer>,
}

impl PositionBuffer {
    /// Usage every allocation carries. `COPY_SRC` allows contents to be read back.
    pub const USAGE: wgpu::BufferUsages = wgpu::BufferUsages::VERTEX
        .union(wgpu::BufferUsages::COPY_DST)
        .union(wgpu::BufferUsages::COPY_SRC);

    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    /// Creates an unallocated handle for `len` positions.
    pub fn new(len: usize) -> Self {
        Self { len, buffer: None }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Storage size in bytes.
    pub fn byte_size(&self) -> u64 {
        (self.len * Vec3::SIZE) as u64
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    /// Fails if storage for `len` positions exceeds what `limits` allow in one buffer.
    pub fn check_fits(&self, limits: &wgpu::Limits) -> Result<()> {
        anyhow::ensure!(
            self.byte_size() <= limits.max_buffer_size,
            "{} points need {} bytes, above the device buffer limit of {} bytes",
            self.len,
            self.byte_size(),
            limits.max_buffer_size
        );
        Ok(())
    }

    /// Allocates storage; filled with `initial` when given, zeroed otherwise.
    ///
    /// Panics if storage already exists or `initial` has the wrong length.
    pub fn allocate(&mut self, device: &wgpu::Device, initial: Option<&[Vec3]>) -> &wgpu::Buffer {
        assert!(self.buffer.is_none(), "position buffer storage allocated twice");

        let buffer = match initial {
            Some(positions) => {
                assert_eq!(positions.len(), self.len, "initial positions do not fill the buffer");
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("dynstream positions"),
                    contents: bytemuck::cast_slice(positions),
                    usage: Self::USAGE,
                })
            }
            None => device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("dynstream positions"),
                size: self.byte_size(),
                usage: Self::USAGE,
                mapped_at_creation: false,
            }),
        };

        self.buffer.insert(buffer)
    }

    /// Returns the allocated storage.
    ///
    /// Panics if no strategy has allocated it yet.
    #[track_caller]
    pub fn raw(&self) -> &wgpu::Buffer {
        match self.buffer.as_ref() {
            Some(buffer) => buffer,
            None => panic!("position buffer used before a strategy allocated its storage"),
        }
    }

    /// Vertex layout: one `Float32x3` attribute at location 0, stride 12.
    pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Vec3::SIZE as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    /// Copies the current contents back to the CPU.
    ///
    /// Blocks until all previously submitted work has finished.
    pub fn read_back(&self, gpu: &GpuContext) -> Result<Vec<Vec3>> {
        let readback = gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("dynstream positions readback"),
            size: self.byte_size(),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("dynstream readback encoder"),
            });
        encoder.copy_buffer_to_buffer(self.raw(), 0, &readback, 0, self.byte_size());
        gpu.queue().submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        gpu.map_blocking(slice, wgpu::MapMode::Read)
            .context("failed to map position readback buffer")?;

        let positions = {
            let view = slice.get_mapped_range();
            let bytes: &[u8] = &view;
            bytes
                .chunks_exact(Vec3::SIZE)
                .map(bytemuck::pod_read_unaligned::<Vec3>)
                .collect()
        };
        readback.unmap();

        Ok(positions)
    }

    /// Destroys the storage. The handle can not be reused afterwards.
    pub fn release(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_buffer_size: u64) -> wgpu::Limits {
        wgpu::Limits {
            max_buffer_size,
            ..wgpu::Limits::default()
        }
    }

    #[test]
    fn new_handle_is_unallocated() {
        let buffer = PositionBuffer::new(4);
        assert!(!buffer.is_allocated());
        assert_eq!(buffer.byte_size(), 48);
    }

    #[test]
    fn buffer_at_the_limit_fits() {
        assert!(PositionBuffer::new(10).check_fits(&limits(120)).is_ok());
    }

    #[test]
    fn buffer_over_the_limit_is_an_error() {
        let err = PositionBuffer::new(11).check_fits(&limits(120)).unwrap_err();
        assert!(err.to_string().contains("132 bytes"));
    }
}
