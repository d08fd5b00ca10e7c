use anyhow::{Context, Result};
use glam::Mat4;
use winit::window::{Window, WindowId};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::gpu::Extent2d;
use crate::input::{InputFrame, InputState};
use crate::render::{FrameContext, FrameStats, Renderer};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
    /// Looping shader time in seconds.
    pub elapsed: f32,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires a swapchain image, lets `renderer` record and submit into it,
    /// then presents.
    ///
    /// Returns `Ok(None)` when the surface had to be reconfigured or the
    /// frame was skipped. Unrecoverable surface errors and render errors are
    /// returned; the acquired image is given back either way.
    ///
    /// `view` receives the extent of the acquired image and returns the
    /// camera view-projection for it.
    pub fn render(
        &mut self,
        renderer: &mut Renderer,
        view: impl FnOnce(Extent2d) -> Mat4,
    ) -> Result<Option<FrameStats>> {
        let frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let message = err.to_string();
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => {
                        anyhow::bail!("surface error: {message}")
                    }
                    action => {
                        log::debug!("frame not rendered ({action:?}): {message}");
                        Ok(None)
                    }
                };
            }
        };

        let ctx = FrameContext::for_output(frame.output, frame.extent, self.elapsed, view);

        match renderer.render_frame(self.gpu.backend_mut(), &ctx) {
            Ok(stats) => {
                self.window.window.pre_present_notify();
                self.gpu.present(frame);
                Ok(Some(stats))
            }
            Err(err) => {
                self.gpu.discard(frame);
                Err(err).context("failed to render frame")
            }
        }
    }
}
