/// Device and surface options applied when a window's GPU context is created.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB surface format if the surface offers one.
    pub prefer_srgb: bool,

    /// Requested swap behavior. Unsupported explicit modes fall back to `Fifo`.
    pub present_mode: wgpu::PresentMode,

    /// Requested compositing alpha mode; `None` takes the surface's first.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Frame latency hint passed to the surface configuration.
    pub desired_maximum_frame_latency: u32,
}

impl GpuInit {
    /// Options for timing runs: presentation does not wait for vertical sync.
    pub fn benchmark() -> Self {
        Self {
            present_mode: wgpu::PresentMode::AutoNoVsync,
            ..Self::default()
        }
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
