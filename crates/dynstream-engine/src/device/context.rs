use anyhow::{Context, Result};

/// Adapter, device and queue, independent of any surface.
///
/// Benchmarks and buffer strategies only ever need this half of the GPU
/// state. Windowed runs get one through [`Gpu::context`](super::Gpu::context);
/// tests and offline tools create one with [`GpuContext::headless`].
pub struct GpuContext {
    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Requests an adapter compatible with `surface` (if any) and opens a device on it.
    pub(crate) async fn request(
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
        required_features: wgpu::Features,
        required_limits: wgpu::Limits,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("dynstream device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    /// Creates a context with no surface attached.
    pub async fn headless() -> Result<Self> {
        Self::headless_with_limits(wgpu::Limits::default()).await
    }

    /// Creates a surfaceless context whose device is opened with `limits`.
    pub async fn headless_with_limits(limits: wgpu::Limits) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        Self::request(&instance, None, wgpu::Features::empty(), limits).await
    }

    /// Blocking variant of [`GpuContext::headless`].
    pub fn headless_blocking() -> Result<Self> {
        pollster::block_on(Self::headless())
    }

    /// Returns the adapter the device was opened on.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Blocks until all submitted work and pending map callbacks have completed.
    pub fn wait_idle(&self) -> Result<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .context("device poll failed")?;
        Ok(())
    }

    /// Maps `slice` and blocks until the mapping is usable.
    ///
    /// The buffer must have been created with the usage matching `mode`.
    pub fn map_blocking(&self, slice: wgpu::BufferSlice<'_>, mode: wgpu::MapMode) -> Result<()> {
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(mode, move |result| {
            let _ = tx.send(result);
        });

        self.wait_idle()?;

        rx.recv()
            .context("map callback was dropped without firing")?
            .context("buffer mapping failed")?;
        Ok(())
    }
}
