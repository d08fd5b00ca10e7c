use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::gpu::{Extent2d, ImageFormat, ImageHandle};

use super::backend::WgpuBackend;
use super::{GpuInit, SurfaceErrorAction, convert, surface};

/// A single acquired swapchain image.
///
/// Short-lived: hand it back through [`Gpu::present`] or [`Gpu::discard`]
/// before acquiring the next one.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    /// The swapchain view, registered with the backend for this frame only.
    pub output: ImageHandle,
    pub extent: Extent2d,
}

/// Owns the window surface and the wgpu-backed [`WgpuBackend`].
pub struct Gpu<'w> {
    /// Surface bound to the window.
    ///
    /// Surface lifetime is tied to the window; architecture must ensure the window
    /// outlives the `Gpu` instance.
    surface: wgpu::Surface<'w>,

    device: wgpu::Device,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,
    color_format: ImageFormat,

    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,

    backend: WgpuBackend,
}

impl<'w> Gpu<'w> {
    /// Creates a GPU context bound to a window.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let GpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
            address_space_size,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);
        anyhow::ensure!(
            adapter.features().contains(required_features),
            "adapter {} does not support {:?}",
            info.name,
            required_features
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("prism device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&surface_caps, prefer_srgb)
            .context("no supported surface formats")?;
        let color_format =
            convert::image_format(format).context("surface format has no image equivalent")?;

        let alpha_mode = surface::choose_alpha_mode(&surface_caps, alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency,
        };

        surface.configure(&device, &config);
        log::debug!("surface configured: {format:?} {}x{}", size.width, size.height);

        let backend = WgpuBackend::new(device.clone(), queue, address_space_size);

        Ok(Self {
            surface,
            device,
            config,
            color_format,
            size,
            backend,
        })
    }

    pub fn backend(&self) -> &WgpuBackend {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut WgpuBackend {
        &mut self.backend
    }

    /// Format of the swapchain images the renderer draws into.
    pub fn color_format(&self) -> ImageFormat {
        self.color_format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Reconfigures the surface after a resize.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        surface::apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            new_size,
        );
    }

    /// Acquires the next swapchain image and registers it as an output image.
    pub fn begin_frame(&mut self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let extent = Extent2d::new(
            surface_texture.texture.width(),
            surface_texture.texture.height(),
        );
        let output = self.backend.register_view(view, extent, self.color_format);

        Ok(GpuFrame {
            surface_texture,
            output,
            extent,
        })
    }

    /// Presents a frame whose commands have been submitted.
    pub fn present(&mut self, frame: GpuFrame) {
        self.backend.release_view(frame.output);
        frame.surface_texture.present();
    }

    /// Gives a frame back without presenting it.
    pub fn discard(&mut self, frame: GpuFrame) {
        self.backend.release_view(frame.output);
        drop(frame.surface_texture);
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        surface::map_surface_error(&self.surface, &self.device, &self.config, self.size, err)
    }
}
