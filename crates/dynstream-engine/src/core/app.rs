use anyhow::Result;
use winit::event::WindowEvent;

use crate::device::Gpu;

use super::ctx::{FrameCtx, WindowCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by the benchmarks.
///
/// Callback order for a run is `on_start` (once), then `on_frame` per redraw,
/// then `on_exit` (once). `on_exit` is only called if `on_start` succeeded, and
/// always before the GPU context is destroyed.
pub trait App {
    /// Called once after the window and its GPU context were created.
    ///
    /// Returning an error ends the run before the first frame.
    fn on_start(&mut self, window: &WindowCtx<'_>, gpu: &Gpu<'_>) -> Result<()>;

    /// Called for window events.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per rendered frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called once when the loop ends.
    fn on_exit(&mut self, gpu: &Gpu<'_>) {
        let _ = gpu;
    }
}
