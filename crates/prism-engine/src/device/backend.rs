use std::collections::HashMap;

use crate::gpu::{
    BufferDesc, BufferHandle, ClipSpace, Command, CommandList, DeviceAddress, Extent2d,
    GpuBackend, GpuError, ImageDesc, ImageFormat, ImageHandle, PipelineDesc, PipelineHandle,
    RenderTargets, ShaderCode, ShaderStage,
};

use super::arena::{AddressSpace, Range};
use super::convert;

const SPIRV_MAGIC: u32 = 0x0723_0203;

struct WgpuImage {
    /// `None` for views borrowed from the swapchain.
    texture: Option<wgpu::Texture>,
    view: wgpu::TextureView,
    extent: Extent2d,
    format: ImageFormat,
}

/// [`GpuBackend`] on top of wgpu.
///
/// wgpu has no buffer device addresses, so every buffer is a sub-range of
/// one storage+index buffer (the address space) and its address is the
/// byte offset into it. Pipelines see the whole address space as
/// `@group(0) @binding(0) var<storage, read> memory: array<u32>`.
///
/// Command lists are translated on submit:
/// - clears become load ops of the next rendering scope on that image
/// - barriers and layout transitions are implied by wgpu's usage tracking
/// - push constants map to immediates
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    memory: wgpu::Buffer,
    memory_layout: wgpu::BindGroupLayout,
    memory_bind_group: wgpu::BindGroup,
    space: AddressSpace,

    next_id: u32,
    buffers: HashMap<BufferHandle, Range>,
    images: HashMap<ImageHandle, WgpuImage>,
    pipelines: HashMap<PipelineHandle, wgpu::RenderPipeline>,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, address_space_size: u64) -> Self {
        let memory = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("prism address space"),
            size: address_space_size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::INDEX
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let memory_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("prism address space bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let memory_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("prism address space bind group"),
            layout: &memory_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: memory.as_entire_binding(),
            }],
        });

        log::debug!("address space: {address_space_size} bytes");

        Self {
            device,
            queue,
            memory,
            memory_layout,
            memory_bind_group,
            space: AddressSpace::new(address_space_size),
            next_id: 0,
            buffers: HashMap::new(),
            images: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    /// Makes a swapchain view addressable as an image for one frame.
    ///
    /// The view is treated as already transitioned; release it with
    /// [`WgpuBackend::release_view`] before presenting.
    pub fn register_view(
        &mut self,
        view: wgpu::TextureView,
        extent: Extent2d,
        format: ImageFormat,
    ) -> ImageHandle {
        let handle = ImageHandle::from_raw(self.next_raw());
        self.images.insert(
            handle,
            WgpuImage {
                texture: None,
                view,
                extent,
                format,
            },
        );
        handle
    }

    pub fn release_view(&mut self, image: ImageHandle) {
        self.images.remove(&image);
    }

    pub fn address_space_available(&self) -> u64 {
        self.space.available()
    }

    fn next_raw(&mut self) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    fn range(&self, buffer: BufferHandle) -> Result<Range, GpuError> {
        self.buffers.get(&buffer).copied().ok_or(GpuError::UnknownHandle {
            kind: "buffer",
            id: buffer.raw(),
        })
    }

    fn image(&self, image: ImageHandle) -> Result<&WgpuImage, GpuError> {
        self.images.get(&image).ok_or(GpuError::UnknownHandle {
            kind: "image",
            id: image.raw(),
        })
    }

    fn pipeline(&self, pipeline: PipelineHandle) -> Result<&wgpu::RenderPipeline, GpuError> {
        self.pipelines.get(&pipeline).ok_or(GpuError::UnknownHandle {
            kind: "pipeline",
            id: pipeline.raw(),
        })
    }

    fn shader_module(
        &self,
        label: &str,
        code: &ShaderCode,
    ) -> Result<wgpu::ShaderModule, GpuError> {
        let source = match code {
            ShaderCode::Wgsl(src) => wgpu::ShaderSource::Wgsl(src.as_str().into()),
            ShaderCode::SpirV(bytes) => {
                check_spirv(label, bytes)?;
                wgpu::util::make_spirv(bytes)
            }
        };
        Ok(self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source,
        }))
    }

    fn build_render_pipeline(
        &self,
        desc: &PipelineDesc<'_>,
    ) -> Result<wgpu::RenderPipeline, GpuError> {
        let mut vertex = None;
        let mut fragment = None;
        for stage in desc.stages {
            let module = self.shader_module(stage.label, stage.code)?;
            let slot = match stage.stage {
                ShaderStage::Vertex => &mut vertex,
                ShaderStage::Fragment => &mut fragment,
            };
            if slot.replace((module, stage.entry_point)).is_some() {
                return Err(GpuError::PipelineCreation(format!(
                    "{}: more than one {:?} stage",
                    desc.label,
                    convert::shader_stage(stage.stage)
                )));
            }
        }
        let (vertex_module, vertex_entry) = vertex.ok_or_else(|| {
            GpuError::PipelineCreation(format!("{}: no vertex stage", desc.label))
        })?;

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &[&self.memory_layout],
                immediate_size: desc.push_constant_size,
            });

        let state = desc.state;
        let color_targets = [Some(wgpu::ColorTargetState {
            format: convert::texture_format(desc.targets.color),
            blend: state.blend.then_some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let depth_stencil = (state.depth_test || state.depth_write).then(|| wgpu::DepthStencilState {
            format: convert::texture_format(desc.targets.depth),
            depth_write_enabled: state.depth_write,
            depth_compare: if state.depth_test {
                convert::compare_function(state.depth_compare)
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some(vertex_entry),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: fragment.as_ref().map(|(module, entry)| wgpu::FragmentState {
                    module,
                    entry_point: Some(*entry),
                    compilation_options: Default::default(),
                    targets: &color_targets,
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: state.cull_back_faces.then_some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil,
                multisample: wgpu::MultisampleState {
                    count: state.sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview_mask: None,
                cache: None,
            });
        Ok(pipeline)
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        body: &[Command],
        clears: &mut PendingClears,
    ) -> Result<(), GpuError> {
        let color = self.image(targets.color)?;
        let depth = match targets.depth {
            Some(handle) => Some((handle, self.image(handle)?)),
            None => None,
        };

        for image in std::iter::once(color).chain(depth.map(|(_, d)| d)) {
            if image.extent != targets.extent {
                return Err(GpuError::InvalidCommand(format!(
                    "{:?} attachment is {}x{}, rendering scope is {}x{}",
                    image.format,
                    image.extent.width,
                    image.extent.height,
                    targets.extent.width,
                    targets.extent.height
                )));
            }
        }

        let color_load = match clears.color.remove(&targets.color) {
            Some(rgba) => wgpu::LoadOp::Clear(convert::clear_color(rgba)),
            None => wgpu::LoadOp::Load,
        };
        let depth_attachment = depth.map(|(handle, image)| {
            let load = match clears.depth.remove(&handle) {
                Some(value) => wgpu::LoadOp::Clear(value),
                None => wgpu::LoadOp::Load,
            };
            wgpu::RenderPassDepthStencilAttachment {
                view: &image.view,
                depth_ops: Some(wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("prism frame pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &color.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let Extent2d { width, height } = targets.extent;
        pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        pass.set_bind_group(0, &self.memory_bind_group, &[]);

        for cmd in body {
            match cmd {
                Command::BindPipeline(p) => pass.set_pipeline(self.pipeline(*p)?),
                Command::BindIndexBuffer { buffer, format } => {
                    let range = self.range(*buffer)?;
                    pass.set_index_buffer(
                        self.memory.slice(range.offset..range.end()),
                        convert::index_format(*format),
                    );
                }
                Command::PushConstants {
                    pipeline,
                    offset,
                    data,
                } => {
                    self.pipeline(*pipeline)?;
                    pass.set_immediates(*offset, data);
                }
                Command::DrawIndexed(d) => pass.draw_indexed(
                    d.first_index..d.first_index + d.index_count,
                    d.vertex_offset,
                    d.first_instance..d.first_instance + d.instance_count,
                ),
                other => {
                    return Err(GpuError::InvalidCommand(format!(
                        "{:?} inside a rendering scope",
                        other.kind()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Clears that no rendering scope consumed still have to happen.
    fn flush_clears(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        clears: PendingClears,
    ) -> Result<(), GpuError> {
        for (handle, rgba) in clears.color {
            let image = self.image(handle)?;
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("prism color clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &image.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(convert::clear_color(rgba)),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        for (handle, value) in clears.depth {
            let image = self.image(handle)?;
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("prism depth clear"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &image.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(value),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct PendingClears {
    color: HashMap<ImageHandle, [f32; 4]>,
    depth: HashMap<ImageHandle, f32>,
}

/// Rejects byte streams that `make_spirv` would panic on.
fn check_spirv(label: &str, bytes: &[u8]) -> Result<(), GpuError> {
    let magic = bytes
        .get(..4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]));
    let valid = bytes.len() % 4 == 0
        && matches!(magic, Some(m) if m == SPIRV_MAGIC || m == SPIRV_MAGIC.swap_bytes());
    if valid {
        Ok(())
    } else {
        Err(GpuError::PipelineCreation(format!("{label}: not a SPIR-V module")))
    }
}

impl GpuBackend for WgpuBackend {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GpuError> {
        let range = self.space.allocate(desc.size)?;
        let handle = BufferHandle::from_raw(self.next_raw());
        self.buffers.insert(handle, range);
        log::trace!("{}: {} bytes at {:#x}", desc.label, desc.size, range.offset);
        Ok(handle)
    }

    fn upload_buffer_sync(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GpuError> {
        let range = self.range(buffer)?;
        let len = data.len() as u64;
        if offset + len > range.size {
            return Err(GpuError::UploadOutOfBounds {
                id: buffer.raw(),
                offset,
                len,
                size: range.size,
            });
        }
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(GpuError::InvalidCommand(format!(
                "upload offset {offset} is not {}-byte aligned",
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }

        // Ranges are 16-byte aligned, so padding the tail stays inside them.
        let at = range.offset + offset;
        if len % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
            self.queue.write_buffer(&self.memory, at, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(len.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT) as usize, 0);
            self.queue.write_buffer(&self.memory, at, &padded);
        }

        self.queue.submit(std::iter::empty());
        self.drain()
    }

    fn buffer_address(&self, buffer: BufferHandle) -> Result<DeviceAddress, GpuError> {
        self.range(buffer).map(|r| DeviceAddress(r.offset))
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if let Some(range) = self.buffers.remove(&buffer) {
            self.space.release(range);
        }
    }

    fn create_image(&mut self, desc: &ImageDesc<'_>) -> Result<ImageHandle, GpuError> {
        if desc.extent.is_empty() {
            return Err(GpuError::Allocation {
                what: desc.label.to_string(),
                size: 0,
            });
        }

        let mut usage = wgpu::TextureUsages::empty();
        if desc.usage.color_attachment || desc.usage.depth_stencil_attachment {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        // Depth formats cannot be copy targets; their clears are load ops anyway.
        if desc.usage.transfer_dst && !desc.format.is_depth() {
            usage |= wgpu::TextureUsages::COPY_DST;
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.extent.width,
                height: desc.extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: convert::texture_format(desc.format),
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let handle = ImageHandle::from_raw(self.next_raw());
        self.images.insert(
            handle,
            WgpuImage {
                texture: Some(texture),
                view,
                extent: desc.extent,
                format: desc.format,
            },
        );
        Ok(handle)
    }

    fn destroy_image(&mut self, image: ImageHandle) {
        if let Some(WgpuImage {
            texture: Some(texture),
            format,
            ..
        }) = self.images.remove(&image)
        {
            log::trace!("destroying {format:?} image {}", image.raw());
            texture.destroy();
        }
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineHandle, GpuError> {
        // Shader and pipeline validation errors would otherwise reach the
        // device's uncaptured-error handler, which panics.
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.build_render_pipeline(desc)?;
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(GpuError::PipelineCreation(format!("{}: {err}", desc.label)));
        }

        let handle = PipelineHandle::from_raw(self.next_raw());
        self.pipelines.insert(handle, pipeline);
        Ok(handle)
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle) {
        self.pipelines.remove(&pipeline);
    }

    fn submit(&mut self, commands: CommandList) -> Result<(), GpuError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("prism frame encoder"),
            });

        let cmds = commands.commands();
        let mut clears = PendingClears::default();
        let mut i = 0;
        while i < cmds.len() {
            match &cmds[i] {
                Command::ImageBarrier(b) => {
                    self.image(b.image)?;
                    log::trace!("image {} {:?} -> {:?}", b.image.raw(), b.old_layout, b.new_layout);
                }
                Command::MemoryBarrier(b) => {
                    log::trace!("memory barrier {:?} -> {:?}", b.src_stages, b.dst_stages);
                }
                Command::ClearColor { image, color } => {
                    self.image(*image)?;
                    clears.color.insert(*image, *color);
                }
                Command::ClearDepth { image, depth } => {
                    self.image(*image)?;
                    clears.depth.insert(*image, *depth);
                }
                Command::BeginRendering(targets) => {
                    let end = cmds[i + 1..]
                        .iter()
                        .position(|c| matches!(c, Command::EndRendering))
                        .map(|p| i + 1 + p)
                        .ok_or_else(|| {
                            GpuError::InvalidCommand("unterminated rendering scope".into())
                        })?;
                    self.encode_pass(&mut encoder, targets, &cmds[i + 1..end], &mut clears)?;
                    i = end;
                }
                other => {
                    return Err(GpuError::InvalidCommand(format!(
                        "{:?} outside a rendering scope",
                        other.kind()
                    )));
                }
            }
            i += 1;
        }
        self.flush_clears(&mut encoder, clears)?;

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn drain(&mut self) -> Result<(), GpuError> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| GpuError::DeviceLost(e.to_string()))
    }

    fn clip_space(&self) -> ClipSpace {
        ClipSpace::YUp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spirv_magic_is_checked() {
        let le = SPIRV_MAGIC.to_le_bytes();
        let be = SPIRV_MAGIC.to_be_bytes();
        assert!(check_spirv("ok", &[le, [0; 4]].concat()).is_ok());
        assert!(check_spirv("swapped", &be).is_ok());
        assert!(check_spirv("short", &le[..3]).is_err());
        assert!(check_spirv("text", b"void main() {}\n\0").is_err());
        assert!(check_spirv("empty", &[]).is_err());
    }

    fn noop_backend() -> WgpuBackend {
        let init = crate::device::GpuInit::default();
        let (device, queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor {
            required_features: init.required_features,
            required_limits: init.required_limits,
            ..Default::default()
        });
        WgpuBackend::new(device, queue, 1 << 16)
    }

    fn vertex_only(label: &str, source: &str) -> Result<PipelineHandle, GpuError> {
        let code = ShaderCode::Wgsl(source.into());
        let stages = [crate::gpu::ShaderModuleDesc {
            label,
            stage: ShaderStage::Vertex,
            entry_point: "main",
            code: &code,
        }];
        noop_backend().create_pipeline(&PipelineDesc {
            label,
            stages: &stages,
            targets: crate::gpu::RenderTargetFormats {
                color: ImageFormat::Bgra8UnormSrgb,
                depth: ImageFormat::Depth32Float,
            },
            state: crate::gpu::FixedFunctionState::default(),
            push_constant_size: crate::render::PushConstants::SIZE as u32,
        })
    }

    #[test]
    fn malformed_wgsl_is_a_pipeline_error() {
        let err = vertex_only("broken", "@vertex fn main( { broken").unwrap_err();
        match err {
            GpuError::PipelineCreation(msg) => assert!(msg.starts_with("broken"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn valid_wgsl_builds_a_pipeline() {
        let source = "@vertex fn main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";
        assert!(vertex_only("point", source).is_ok());
    }

    #[test]
    fn buffers_consume_address_space_until_destroyed() {
        let mut backend = noop_backend();
        let before = backend.address_space_available();
        let buffer = backend
            .create_buffer(&BufferDesc {
                label: "positions",
                size: 96,
                usage: crate::gpu::BufferUsage::STORAGE,
            })
            .unwrap();
        assert!(backend.address_space_available() < before);
        backend.destroy_buffer(buffer);
        assert_eq!(backend.address_space_available(), before);
    }
}
