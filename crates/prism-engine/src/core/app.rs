use anyhow::Result;
use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::device::Gpu;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`Runtime`](crate::window::Runtime).
///
/// An `Err` from any hook is fatal: the runtime stops the loop, runs
/// [`App::on_shutdown`] if the GPU is still alive and returns the error from
/// `Runtime::run`.
pub trait App {
    /// Called once, right after the window and GPU exist.
    fn on_start(&mut self, gpu: &mut Gpu<'_>) -> Result<()> {
        let _ = gpu;
        Ok(())
    }

    /// Called for window events.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per redraw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl>;

    /// Called once before the GPU is torn down. GPU resources owned by the
    /// app must be released here.
    fn on_shutdown(&mut self, gpu: &mut Gpu<'_>) -> Result<()> {
        let _ = gpu;
        Ok(())
    }
}
