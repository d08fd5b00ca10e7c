use std::path::PathBuf;

use anyhow::{Context, Result};
use glam::Vec3;

use prism_engine::camera::{Camera, CameraInput, CameraState};
use prism_engine::core::{App, AppControl, FrameCtx};
use prism_engine::device::Gpu;
use prism_engine::input::{Key, Modifiers};
use prism_engine::render::{Renderer, RendererConfig};

use crate::fps::FpsCounter;

pub struct ViewerOptions {
    pub shaders: Vec<PathBuf>,
    pub instances: Vec<Vec3>,
    pub camera: CameraState,
}

/// Draws the instance list every frame and flies a free-look camera.
///
/// Escape quits, Ctrl+R rebuilds the pipeline from the shader files.
pub struct CubeViewer {
    options: ViewerOptions,
    renderer: Option<Renderer>,
    camera: Camera,
    fps: FpsCounter,
}

impl CubeViewer {
    pub fn new(options: ViewerOptions) -> Self {
        Self {
            options,
            renderer: None,
            camera: Camera::default(),
            fps: FpsCounter::default(),
        }
    }
}

impl App for CubeViewer {
    fn on_start(&mut self, gpu: &mut Gpu<'_>) -> Result<()> {
        let color_format = gpu.color_format();
        let renderer = Renderer::new(
            gpu.backend_mut(),
            RendererConfig::default(),
            color_format,
            self.options.shaders.clone(),
            self.options.instances.clone(),
        )
        .context("failed to create renderer")?;

        self.renderer = Some(renderer);
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(AppControl::Continue);
        };

        if ctx.input_frame.keys_pressed.contains(&Key::Escape) {
            return Ok(AppControl::Exit);
        }
        if ctx.input_frame.chord_pressed(Modifiers::CTRL, Key::R) {
            log::info!("pipeline reload requested");
            renderer.reload_signal().request();
        }

        let input = CameraInput::from_input(ctx.input, ctx.input_frame);
        self.camera
            .move_freelook(&input, &self.options.camera, ctx.time.dt);

        let camera = &self.camera;
        ctx.render(renderer, |extent| camera.view_matrix(extent.width, extent.height))?;

        if let Some(fps) = self.fps.tick(ctx.time.now) {
            ctx.runtime.set_title(format!(
                "prism | {fps:.0} fps | {} cubes",
                renderer.instances().len()
            ));
        }

        Ok(AppControl::Continue)
    }

    fn on_shutdown(&mut self, gpu: &mut Gpu<'_>) -> Result<()> {
        if let Some(renderer) = self.renderer.take() {
            renderer
                .shutdown(gpu.backend_mut())
                .context("failed to release renderer resources")?;
        }
        Ok(())
    }
}
