use std::path::PathBuf;

use glam::{Mat4, Vec3};
use thiserror::Error;

use crate::gpu::{
    ClipSpace, Command, CommandList, DrawIndexed, Extent2d, GpuBackend, GpuError, ImageFormat,
    ImageHandle, IndexFormat, MemoryBarrier, RenderTargetFormats, RenderTargets,
};
use crate::mesh::CubeMesh;

use super::depth::{DepthAttachment, DepthManager};
use super::pipeline::{Pipeline, PipelineError, PipelineManager};
use super::push::PushConstants;
use super::reload::ReloadSignal;
use super::upload::{UploadedMesh, upload_mesh};

/// Fatal errors on the render path. None of them are retried.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Background color the output is cleared to each frame (linear RGBA).
    pub clear_color: [f32; 4],
    pub depth_format: ImageFormat,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            depth_format: ImageFormat::Depth32Float,
        }
    }
}

/// Everything the renderer needs to know about the frame being recorded.
///
/// Built by the loop each frame and passed by reference; nothing here
/// outlives the frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameContext {
    /// Output image acquired for this frame, already in `General` layout.
    pub output: ImageHandle,
    pub extent: Extent2d,
    /// Camera view-projection for `extent`.
    pub view: Mat4,
    /// Looping elapsed seconds for shader animation.
    pub elapsed: f32,
}

impl FrameContext {
    /// Builds the context for an acquired output image.
    ///
    /// `view` is evaluated against the extent of the image actually acquired,
    /// which can differ from the window size reported before acquisition.
    pub fn for_output(
        output: ImageHandle,
        extent: Extent2d,
        elapsed: f32,
        view: impl FnOnce(Extent2d) -> Mat4,
    ) -> Self {
        Self {
            output,
            extent,
            view: view(extent),
            elapsed,
        }
    }
}

/// Summary of one recorded frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub draws: u32,
    pub depth_reallocated: bool,
    pub pipeline_reloaded: bool,
    pub commands: usize,
}

/// Draws one cube per instance through a single pipeline.
///
/// Owns the mesh buffers, the pipeline and the depth attachment. All of them
/// are mutated only from [`Renderer::record_frame`] and released by
/// [`Renderer::shutdown`].
pub struct Renderer {
    config: RendererConfig,
    mesh: UploadedMesh,
    pipelines: PipelineManager,
    depth: DepthManager,
    reload: ReloadSignal,
    instances: Vec<Vec3>,
}

impl Renderer {
    /// Builds the pipeline and uploads the cube.
    ///
    /// Shader configuration errors surface here, before any buffer is
    /// allocated.
    pub fn new(
        backend: &mut impl GpuBackend,
        config: RendererConfig,
        color_format: ImageFormat,
        shaders: Vec<PathBuf>,
        instances: Vec<Vec3>,
    ) -> Result<Self, RenderError> {
        let formats = RenderTargetFormats {
            color: color_format,
            depth: config.depth_format,
        };
        let pipelines = PipelineManager::build(backend, shaders, formats)?;

        let mesh = match upload_mesh(backend, &CubeMesh::unit()) {
            Ok(mesh) => mesh,
            Err(err) => {
                pipelines.destroy(backend);
                return Err(err.into());
            }
        };

        log::info!(
            "renderer ready: {} instance(s), color {:?}, depth {:?}",
            instances.len(),
            formats.color,
            formats.depth
        );

        Ok(Self {
            depth: DepthManager::new(config.depth_format),
            config,
            mesh,
            pipelines,
            reload: ReloadSignal::new(),
            instances,
        })
    }

    /// Handle for requesting a pipeline rebuild at the next frame boundary.
    pub fn reload_signal(&self) -> ReloadSignal {
        self.reload.clone()
    }

    pub fn pipeline(&self) -> &Pipeline {
        self.pipelines.current()
    }

    pub fn depth(&self) -> Option<&DepthAttachment> {
        self.depth.current()
    }

    pub fn mesh(&self) -> &UploadedMesh {
        &self.mesh
    }

    pub fn instances(&self) -> &[Vec3] {
        &self.instances
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Transform shared by every instance in a frame.
    ///
    /// `flip_y * view * translate(-0.5)`: the recentering moves the unit
    /// cube's center onto the instance position. The flip is applied only on
    /// Y-down clip spaces.
    pub fn base_transform(clip: ClipSpace, view: Mat4) -> Mat4 {
        let flip_y = match clip {
            ClipSpace::YDown => Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0)),
            ClipSpace::YUp => Mat4::IDENTITY,
        };
        flip_y * view * Mat4::from_translation(Vec3::splat(-0.5))
    }

    /// Records one frame into `cmds`.
    ///
    /// Order: pending reload (drain + rebuild), depth sync, clears,
    /// clear-to-draw barrier, then one rendering scope with a single
    /// pipeline/index bind and a push-constants + draw pair per instance.
    ///
    /// A frame with an empty extent records nothing and leaves any pending
    /// reload for the next frame.
    pub fn record_frame(
        &mut self,
        backend: &mut impl GpuBackend,
        frame: &FrameContext,
        cmds: &mut CommandList,
    ) -> Result<FrameStats, RenderError> {
        if frame.extent.is_empty() {
            log::trace!("skipping frame with empty extent");
            return Ok(FrameStats::default());
        }

        let mut stats = FrameStats::default();
        let start = cmds.len();

        if self.reload.take() {
            self.pipelines.reload(backend)?;
            stats.pipeline_reloaded = true;
        }

        let (depth, reallocated) = self.depth.ensure(backend, frame.extent, cmds)?;
        stats.depth_reallocated = reallocated;

        cmds.push(Command::ClearColor {
            image: frame.output,
            color: self.config.clear_color,
        });
        cmds.push(Command::ClearDepth {
            image: depth.image,
            depth: 1.0,
        });
        cmds.push(Command::MemoryBarrier(MemoryBarrier::CLEAR_TO_DRAW));

        let base = Self::base_transform(backend.clip_space(), frame.view);
        let pipeline = self.pipelines.current().handle;
        let targets = RenderTargets {
            color: frame.output,
            depth: Some(depth.image),
            extent: frame.extent,
        };

        stats.draws = cmds.with_render_targets(targets, |cmds| -> Result<u32, RenderError> {
            cmds.push(Command::BindPipeline(pipeline));
            cmds.push(Command::BindIndexBuffer {
                buffer: self.mesh.indices.handle,
                format: IndexFormat::Uint32,
            });

            for position in &self.instances {
                let constants = PushConstants::new(
                    self.mesh.vertices.address,
                    base * Mat4::from_translation(*position),
                    frame.elapsed,
                );
                cmds.push(Command::PushConstants {
                    pipeline,
                    offset: 0,
                    data: constants.as_bytes().to_vec(),
                });
                cmds.push(Command::DrawIndexed(DrawIndexed::single(self.mesh.index_count)));
            }
            Ok(self.instances.len() as u32)
        })?;

        stats.commands = cmds.len() - start;
        log::trace!("recorded frame: {} draws, {} commands", stats.draws, stats.commands);
        Ok(stats)
    }

    /// Records a frame and submits it.
    pub fn render_frame(
        &mut self,
        backend: &mut impl GpuBackend,
        frame: &FrameContext,
    ) -> Result<FrameStats, RenderError> {
        let mut cmds = CommandList::new();
        let stats = self.record_frame(backend, frame, &mut cmds)?;
        if !cmds.is_empty() {
            backend.submit(cmds)?;
        }
        Ok(stats)
    }

    /// Drains the device, then releases the pipeline, depth attachment and
    /// mesh buffers.
    pub fn shutdown(mut self, backend: &mut impl GpuBackend) -> Result<(), RenderError> {
        backend.drain()?;
        self.pipelines.destroy(backend);
        self.depth.destroy(backend);
        self.mesh.destroy(backend);
        log::info!("renderer shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{CommandKind, DeviceEvent, HeadlessBackend};
    use crate::render::pipeline::ENTRY_POINT;
    use pretty_assertions::assert_eq;

    struct Fixture {
        _dir: tempfile::TempDir,
        backend: HeadlessBackend,
        renderer: Renderer,
    }

    fn fixture_with(mut backend: HeadlessBackend, instances: Vec<Vec3>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let vert = dir.path().join("cube.vert.wgsl");
        let frag = dir.path().join("cube.frag.wgsl");
        std::fs::write(&vert, format!("@vertex fn {ENTRY_POINT}() {{}}")).unwrap();
        std::fs::write(&frag, format!("@fragment fn {ENTRY_POINT}() {{}}")).unwrap();

        let renderer = Renderer::new(
            &mut backend,
            RendererConfig::default(),
            ImageFormat::Bgra8UnormSrgb,
            vec![vert, frag],
            instances,
        )
        .unwrap();
        Fixture {
            _dir: dir,
            backend,
            renderer,
        }
    }

    fn fixture(instances: Vec<Vec3>) -> Fixture {
        fixture_with(HeadlessBackend::new(), instances)
    }

    fn perspective(extent: Extent2d) -> Mat4 {
        Mat4::perspective_rh(60f32.to_radians(), extent.aspect(), 0.1, 1000.0)
    }

    fn frame(backend: &mut HeadlessBackend, extent: Extent2d) -> FrameContext {
        let output = backend
            .create_output_image(extent, ImageFormat::Bgra8UnormSrgb)
            .unwrap();
        FrameContext::for_output(output, extent, 1.5, perspective)
    }

    fn pushed(cmds: &CommandList) -> Vec<PushConstants> {
        cmds.iter()
            .filter_map(|c| match c {
                Command::PushConstants { data, .. } => PushConstants::read(data),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn single_instance_frame_order() {
        let Fixture { _dir, mut backend, mut renderer } = fixture(vec![Vec3::ZERO]);
        let ctx = frame(&mut backend, Extent2d::new(800, 600));

        let mut cmds = CommandList::new();
        let stats = renderer.record_frame(&mut backend, &ctx, &mut cmds).unwrap();

        assert_eq!(
            cmds.kinds(),
            vec![
                CommandKind::ImageBarrier,
                CommandKind::ClearColor,
                CommandKind::ClearDepth,
                CommandKind::MemoryBarrier,
                CommandKind::BeginRendering,
                CommandKind::BindPipeline,
                CommandKind::BindIndexBuffer,
                CommandKind::PushConstants,
                CommandKind::DrawIndexed,
                CommandKind::EndRendering,
            ]
        );
        assert_eq!(
            cmds.commands()[1],
            Command::ClearColor { image: ctx.output, color: renderer.config().clear_color }
        );
        assert_eq!(cmds.commands()[3], Command::MemoryBarrier(MemoryBarrier::CLEAR_TO_DRAW));
        assert_eq!(cmds.commands()[8], Command::DrawIndexed(DrawIndexed::single(36)));
        assert_eq!(
            stats,
            FrameStats {
                draws: 1,
                depth_reallocated: true,
                pipeline_reloaded: false,
                commands: 10,
            }
        );

        let base = Renderer::base_transform(ClipSpace::YDown, ctx.view);
        let constants = pushed(&cmds);
        assert_eq!(constants.len(), 1);
        assert_eq!(constants[0].model_matrix(), base);
        assert_eq!(constants[0].vertex_buffer, renderer.mesh().vertices.address.get());
        assert_eq!(constants[0].time, 1.5);

        backend.submit(cmds).unwrap();
        assert_eq!(backend.submitted().len(), 1);
        assert_eq!(backend.submitted()[0].len(), 10);
    }

    #[test]
    fn two_instances_differ_only_in_translation() {
        let Fixture { _dir, mut backend, mut renderer } =
            fixture(vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)]);
        let ctx = FrameContext {
            view: Mat4::IDENTITY,
            ..frame(&mut backend, Extent2d::new(320, 240))
        };

        let mut cmds = CommandList::new();
        renderer.record_frame(&mut backend, &ctx, &mut cmds).unwrap();

        assert_eq!(cmds.count(CommandKind::PushConstants), 2);
        assert_eq!(cmds.count(CommandKind::DrawIndexed), 2);
        assert_eq!(cmds.count(CommandKind::BindPipeline), 1);
        assert_eq!(cmds.count(CommandKind::BindIndexBuffer), 1);

        // Every push is immediately followed by the draw consuming it.
        let kinds = cmds.kinds();
        for (i, kind) in kinds.iter().enumerate() {
            if *kind == CommandKind::PushConstants {
                assert_eq!(kinds[i + 1], CommandKind::DrawIndexed);
            }
        }

        let constants = pushed(&cmds);
        let [a, b] = constants[..] else {
            panic!("expected two push-constant blocks");
        };
        let (ma, mb) = (a.model_matrix(), b.model_matrix());
        assert_ne!(ma, mb);
        for col in 0..3 {
            assert_eq!(ma.col(col), mb.col(col));
        }
        // With an identity view only the flip differs from a plain translation.
        assert_eq!(ma.w_axis.truncate(), Vec3::new(0.5, 0.5, -0.5));
        assert_eq!(mb.w_axis.truncate(), Vec3::new(-0.5, -0.5, -0.5));

        backend.submit(cmds).unwrap();
    }

    #[test]
    fn resize_reallocates_depth_once() {
        let Fixture { _dir, mut backend, mut renderer } = fixture(vec![Vec3::ZERO]);
        let small = frame(&mut backend, Extent2d::new(800, 600));
        let large = frame(&mut backend, Extent2d::new(1024, 768));

        let stats = renderer.render_frame(&mut backend, &small).unwrap();
        assert!(stats.depth_reallocated);
        let old = renderer.depth().unwrap().image;

        let mut cmds = CommandList::new();
        let stats = renderer.record_frame(&mut backend, &large, &mut cmds).unwrap();
        assert!(stats.depth_reallocated);
        assert_eq!(cmds.kinds()[0], CommandKind::ImageBarrier);
        assert_eq!(cmds.count(CommandKind::ImageBarrier), 1);
        assert!(backend.journal().contains(&DeviceEvent::DestroyImage(old)));
        backend.submit(cmds).unwrap();

        for _ in 0..3 {
            let mut cmds = CommandList::new();
            let stats = renderer.record_frame(&mut backend, &large, &mut cmds).unwrap();
            assert!(!stats.depth_reallocated);
            assert_eq!(cmds.count(CommandKind::ImageBarrier), 0);
            backend.submit(cmds).unwrap();
        }
        assert_eq!(renderer.depth().unwrap().extent, Extent2d::new(1024, 768));
    }

    #[test]
    fn reload_drains_before_recording_and_never_uses_the_old_pipeline() {
        let Fixture { _dir, mut backend, mut renderer } = fixture(vec![Vec3::ZERO, Vec3::ONE]);
        let ctx = frame(&mut backend, Extent2d::new(64, 64));
        renderer.render_frame(&mut backend, &ctx).unwrap();

        let old = renderer.pipeline().handle;
        renderer.reload_signal().request();
        backend.clear_journal();

        let mut cmds = CommandList::new();
        let stats = renderer.record_frame(&mut backend, &ctx, &mut cmds).unwrap();
        let new = renderer.pipeline().handle;

        assert!(stats.pipeline_reloaded);
        assert_ne!(old, new);
        assert_eq!(
            &backend.journal()[..3],
            &[
                DeviceEvent::Drain,
                DeviceEvent::CreatePipeline(new),
                DeviceEvent::DestroyPipeline(old),
            ]
        );
        assert!(cmds.iter().filter_map(Command::pipeline).all(|p| p == new));
        backend.submit(cmds).unwrap();

        // The signal is consumed once.
        let mut cmds = CommandList::new();
        let stats = renderer.record_frame(&mut backend, &ctx, &mut cmds).unwrap();
        assert!(!stats.pipeline_reloaded);
        assert_eq!(renderer.pipeline().handle, new);
    }

    #[test]
    fn y_up_backends_skip_the_flip() {
        let view = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let down = Renderer::base_transform(ClipSpace::YDown, view);
        let up = Renderer::base_transform(ClipSpace::YUp, view);

        assert_eq!(up, view * Mat4::from_translation(Vec3::splat(-0.5)));
        assert_eq!(down.row(1), -up.row(1));
        assert_eq!(down.row(0), up.row(0));

        let Fixture { _dir, mut backend, mut renderer } =
            fixture_with(HeadlessBackend::y_up(), vec![Vec3::ZERO]);
        let ctx = FrameContext {
            view,
            ..frame(&mut backend, Extent2d::new(16, 16))
        };
        let mut cmds = CommandList::new();
        renderer.record_frame(&mut backend, &ctx, &mut cmds).unwrap();
        assert_eq!(pushed(&cmds)[0].model_matrix(), up);
    }

    #[test]
    fn empty_extent_records_nothing() {
        let Fixture { _dir, mut backend, mut renderer } = fixture(vec![Vec3::ZERO]);
        let ctx = frame(&mut backend, Extent2d::new(8, 8));
        let minimized = FrameContext {
            extent: Extent2d::new(0, 0),
            ..ctx
        };
        renderer.reload_signal().request();

        let mut cmds = CommandList::new();
        let stats = renderer.record_frame(&mut backend, &minimized, &mut cmds).unwrap();
        assert_eq!(stats, FrameStats::default());
        assert!(cmds.is_empty());
        assert!(renderer.reload_signal().is_pending());
    }

    #[test]
    fn view_is_built_for_the_acquired_extent() {
        let mut backend = HeadlessBackend::new();
        // The window reported 800x600 before the swapchain image came back smaller.
        let acquired = Extent2d::new(640, 360);
        let output = backend
            .create_output_image(acquired, ImageFormat::Bgra8UnormSrgb)
            .unwrap();

        let mut seen = None;
        let ctx = FrameContext::for_output(output, acquired, 0.0, |extent| {
            seen = Some(extent);
            perspective(extent)
        });

        assert_eq!(seen, Some(acquired));
        assert_eq!(ctx.view, perspective(acquired));
        assert_ne!(ctx.view, perspective(Extent2d::new(800, 600)));
        assert_eq!(backend.image_extent(ctx.output), Some(ctx.extent));
    }

    #[test]
    fn zero_instances_still_clears() {
        let Fixture { _dir, mut backend, mut renderer } = fixture(Vec::new());
        let ctx = frame(&mut backend, Extent2d::new(8, 8));

        let mut cmds = CommandList::new();
        let stats = renderer.record_frame(&mut backend, &ctx, &mut cmds).unwrap();
        assert_eq!(stats.draws, 0);
        assert_eq!(cmds.count(CommandKind::ClearColor), 1);
        assert_eq!(cmds.count(CommandKind::DrawIndexed), 0);
        backend.submit(cmds).unwrap();
    }

    #[test]
    fn shutdown_drains_then_releases_everything() {
        let Fixture { _dir, mut backend, mut renderer } = fixture(vec![Vec3::ZERO]);
        let ctx = frame(&mut backend, Extent2d::new(8, 8));
        renderer.render_frame(&mut backend, &ctx).unwrap();
        let pipeline = renderer.pipeline().handle;
        backend.clear_journal();

        renderer.shutdown(&mut backend).unwrap();

        assert_eq!(backend.journal()[0], DeviceEvent::Drain);
        assert!(!backend.is_pipeline_alive(pipeline));
        assert_eq!(backend.live_buffers(), 0);
        // Only the stand-in output image remains.
        assert_eq!(backend.live_images(), 1);
    }

    #[test]
    fn bad_shader_name_fails_before_allocating() {
        let mut backend = HeadlessBackend::new();
        let result = Renderer::new(
            &mut backend,
            RendererConfig::default(),
            ImageFormat::Bgra8UnormSrgb,
            vec![PathBuf::from("cube.vertex")],
            vec![Vec3::ZERO],
        );
        assert!(matches!(
            result,
            Err(RenderError::Pipeline(PipelineError::UnknownSuffix(_)))
        ));
        assert!(backend.journal().is_empty());
    }

    #[test]
    fn upload_failure_releases_the_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let vert = dir.path().join("cube.vert.wgsl");
        std::fs::write(&vert, "").unwrap();

        let mut backend = HeadlessBackend::new();
        backend.fail_allocations(true);
        let result = Renderer::new(
            &mut backend,
            RendererConfig::default(),
            ImageFormat::Bgra8UnormSrgb,
            vec![vert],
            vec![Vec3::ZERO],
        );
        assert!(matches!(result, Err(RenderError::Gpu(GpuError::Allocation { .. }))));
        assert!(matches!(backend.journal().last(), Some(DeviceEvent::DestroyPipeline(_))));
    }
}
