use std::collections::{HashMap, HashSet};

use super::backend::{ClipSpace, GpuBackend};
use super::command::{Command, CommandList, ImageLayout};
use super::desc::{BufferDesc, BufferUsage, Extent2d, ImageDesc, ImageFormat, ImageUsage, PipelineDesc};
use super::error::GpuError;
use super::handle::{BufferHandle, DeviceAddress, ImageHandle, PipelineHandle};

const ADDRESS_BASE: u64 = 0x1_0000;
const ADDRESS_ALIGN: u64 = 256;

/// Device-level event recorded by [`HeadlessBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    CreateBuffer { buffer: BufferHandle, size: u64 },
    Upload { buffer: BufferHandle, len: u64 },
    DestroyBuffer(BufferHandle),
    CreateImage { image: ImageHandle, extent: Extent2d },
    DestroyImage(ImageHandle),
    CreatePipeline(PipelineHandle),
    DestroyPipeline(PipelineHandle),
    Submit { commands: usize },
    Drain,
}

struct HeadlessBuffer {
    usage: BufferUsage,
    address: DeviceAddress,
    contents: Vec<u8>,
}

struct HeadlessImage {
    extent: Extent2d,
    format: ImageFormat,
    layout: ImageLayout,
}

/// GPU backend without a GPU.
///
/// Allocates handles, keeps buffer contents in host memory and journals every
/// device-level call. `submit` validates a command list the way a validation
/// layer would for the hazards the renderer cares about:
/// - every referenced handle is alive
/// - images are transitioned out of `Undefined` before use
/// - a draw never follows a clear without an intervening transfer barrier
/// - draws have a bound pipeline and index buffer inside a rendering scope
#[derive(Default)]
pub struct HeadlessBackend {
    next_id: u32,
    next_address: u64,
    buffers: HashMap<BufferHandle, HeadlessBuffer>,
    images: HashMap<ImageHandle, HeadlessImage>,
    pipelines: HashSet<PipelineHandle>,
    journal: Vec<DeviceEvent>,
    submitted: Vec<CommandList>,
    fail_allocations: bool,
    /// Buffer creations left before allocations start failing.
    buffer_budget: Option<usize>,
    y_up: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headless backend reporting a Y-up clip space.
    pub fn y_up() -> Self {
        Self {
            y_up: true,
            ..Self::default()
        }
    }

    /// Makes every following buffer/image allocation fail.
    pub fn fail_allocations(&mut self, fail: bool) {
        self.fail_allocations = fail;
    }

    /// Lets the next `count` buffer creations succeed and fails every one
    /// after that.
    pub fn fail_buffers_after(&mut self, count: usize) {
        self.buffer_budget = Some(count);
    }

    /// Creates an image standing in for an acquired swapchain image.
    ///
    /// Presentation hands images over already in `General` layout, so no
    /// transition is needed before the first clear.
    pub fn create_output_image(
        &mut self,
        extent: Extent2d,
        format: ImageFormat,
    ) -> Result<ImageHandle, GpuError> {
        let image = self.create_image(&ImageDesc {
            label: "headless output",
            extent,
            format,
            usage: ImageUsage::COLOR_TARGET,
        })?;
        if let Some(img) = self.images.get_mut(&image) {
            img.layout = ImageLayout::General;
        }
        Ok(image)
    }

    pub fn journal(&self) -> &[DeviceEvent] {
        &self.journal
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    pub fn submitted(&self) -> &[CommandList] {
        &self.submitted
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.contents.as_slice())
    }

    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsage> {
        self.buffers.get(&buffer).map(|b| b.usage)
    }

    pub fn image_extent(&self, image: ImageHandle) -> Option<Extent2d> {
        self.images.get(&image).map(|i| i.extent)
    }

    pub fn image_format(&self, image: ImageHandle) -> Option<ImageFormat> {
        self.images.get(&image).map(|i| i.format)
    }

    pub fn is_pipeline_alive(&self, pipeline: PipelineHandle) -> bool {
        self.pipelines.contains(&pipeline)
    }

    pub fn live_images(&self) -> usize {
        self.images.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    fn next_raw(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn check_image(&self, image: ImageHandle) -> Result<&HeadlessImage, GpuError> {
        self.images.get(&image).ok_or(GpuError::UnknownHandle {
            kind: "image",
            id: image.raw(),
        })
    }

    fn check_image_ready(&self, image: ImageHandle) -> Result<(), GpuError> {
        let img = self.check_image(image)?;
        if img.layout == ImageLayout::Undefined {
            return Err(GpuError::InvalidCommand(format!(
                "image {} used before its layout transition",
                image.raw()
            )));
        }
        Ok(())
    }

    fn check_pipeline(&self, pipeline: PipelineHandle) -> Result<(), GpuError> {
        if self.pipelines.contains(&pipeline) {
            Ok(())
        } else {
            Err(GpuError::UnknownHandle {
                kind: "pipeline",
                id: pipeline.raw(),
            })
        }
    }

    fn validate(&mut self, commands: &CommandList) -> Result<(), GpuError> {
        let mut in_rendering = false;
        let mut bound_pipeline = None;
        let mut index_bound = false;
        let mut unsynced_clear = false;

        for cmd in commands {
            match cmd {
                Command::ImageBarrier(b) => {
                    if in_rendering {
                        return Err(GpuError::InvalidCommand(
                            "layout transition inside a rendering scope".into(),
                        ));
                    }
                    self.check_image(b.image)?;
                    if let Some(img) = self.images.get_mut(&b.image) {
                        img.layout = b.new_layout;
                    }
                }
                Command::MemoryBarrier(b) => {
                    if b.src_stages.transfer && b.src_access.transfer_write {
                        unsynced_clear = false;
                    }
                }
                Command::ClearColor { image, .. } | Command::ClearDepth { image, .. } => {
                    if in_rendering {
                        return Err(GpuError::InvalidCommand(
                            "transfer clear inside a rendering scope".into(),
                        ));
                    }
                    self.check_image_ready(*image)?;
                    unsynced_clear = true;
                }
                Command::BeginRendering(targets) => {
                    if in_rendering {
                        return Err(GpuError::InvalidCommand("nested rendering scope".into()));
                    }
                    self.check_image_ready(targets.color)?;
                    if let Some(depth) = targets.depth {
                        self.check_image_ready(depth)?;
                        let extent = self.check_image(depth)?.extent;
                        if extent != targets.extent {
                            return Err(GpuError::InvalidCommand(format!(
                                "depth attachment {}x{} does not match render area {}x{}",
                                extent.width,
                                extent.height,
                                targets.extent.width,
                                targets.extent.height
                            )));
                        }
                    }
                    in_rendering = true;
                }
                Command::BindPipeline(p) => {
                    self.check_pipeline(*p)?;
                    bound_pipeline = Some(*p);
                }
                Command::BindIndexBuffer { buffer, .. } => {
                    let buf = self.buffers.get(buffer).ok_or(GpuError::UnknownHandle {
                        kind: "buffer",
                        id: buffer.raw(),
                    })?;
                    if !buf.usage.index {
                        return Err(GpuError::InvalidCommand(format!(
                            "buffer {} bound as index buffer without index usage",
                            buffer.raw()
                        )));
                    }
                    index_bound = true;
                }
                Command::PushConstants { pipeline, .. } => {
                    self.check_pipeline(*pipeline)?;
                    if bound_pipeline != Some(*pipeline) {
                        return Err(GpuError::InvalidCommand(
                            "push constants for a pipeline that is not bound".into(),
                        ));
                    }
                }
                Command::DrawIndexed(_) => {
                    if !in_rendering {
                        return Err(GpuError::InvalidCommand(
                            "draw outside a rendering scope".into(),
                        ));
                    }
                    if bound_pipeline.is_none() || !index_bound {
                        return Err(GpuError::InvalidCommand(
                            "draw without bound pipeline and index buffer".into(),
                        ));
                    }
                    if unsynced_clear {
                        return Err(GpuError::InvalidCommand(
                            "draw races a clear: no transfer barrier in between".into(),
                        ));
                    }
                }
                Command::EndRendering => {
                    if !in_rendering {
                        return Err(GpuError::InvalidCommand(
                            "end of a rendering scope that was never begun".into(),
                        ));
                    }
                    in_rendering = false;
                }
            }
        }

        if in_rendering {
            return Err(GpuError::InvalidCommand("unterminated rendering scope".into()));
        }
        Ok(())
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GpuError> {
        if self.fail_allocations || self.buffer_budget == Some(0) {
            return Err(GpuError::Allocation {
                what: desc.label.to_string(),
                size: desc.size,
            });
        }
        if let Some(left) = &mut self.buffer_budget {
            *left -= 1;
        }

        let handle = BufferHandle::from_raw(self.next_raw());
        let address = if desc.usage.shader_address {
            let addr = ADDRESS_BASE + self.next_address;
            self.next_address += desc.size.div_ceil(ADDRESS_ALIGN).max(1) * ADDRESS_ALIGN;
            DeviceAddress(addr)
        } else {
            DeviceAddress::NULL
        };

        self.buffers.insert(
            handle,
            HeadlessBuffer {
                usage: desc.usage,
                address,
                contents: vec![0; desc.size as usize],
            },
        );
        self.journal.push(DeviceEvent::CreateBuffer {
            buffer: handle,
            size: desc.size,
        });
        Ok(handle)
    }

    fn upload_buffer_sync(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GpuError> {
        let buf = self.buffers.get_mut(&buffer).ok_or(GpuError::UnknownHandle {
            kind: "buffer",
            id: buffer.raw(),
        })?;

        let size = buf.contents.len() as u64;
        let end = offset + data.len() as u64;
        if end > size {
            return Err(GpuError::UploadOutOfBounds {
                id: buffer.raw(),
                offset,
                len: data.len() as u64,
                size,
            });
        }

        buf.contents[offset as usize..end as usize].copy_from_slice(data);
        self.journal.push(DeviceEvent::Upload {
            buffer,
            len: data.len() as u64,
        });
        Ok(())
    }

    fn buffer_address(&self, buffer: BufferHandle) -> Result<DeviceAddress, GpuError> {
        self.buffers
            .get(&buffer)
            .map(|b| b.address)
            .ok_or(GpuError::UnknownHandle {
                kind: "buffer",
                id: buffer.raw(),
            })
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.journal.push(DeviceEvent::DestroyBuffer(buffer));
        }
    }

    fn create_image(&mut self, desc: &ImageDesc<'_>) -> Result<ImageHandle, GpuError> {
        if self.fail_allocations || desc.extent.is_empty() {
            return Err(GpuError::Allocation {
                what: desc.label.to_string(),
                size: u64::from(desc.extent.width) * u64::from(desc.extent.height),
            });
        }

        let handle = ImageHandle::from_raw(self.next_raw());
        self.images.insert(
            handle,
            HeadlessImage {
                extent: desc.extent,
                format: desc.format,
                layout: ImageLayout::Undefined,
            },
        );
        self.journal.push(DeviceEvent::CreateImage {
            image: handle,
            extent: desc.extent,
        });
        Ok(handle)
    }

    fn destroy_image(&mut self, image: ImageHandle) {
        if self.images.remove(&image).is_some() {
            self.journal.push(DeviceEvent::DestroyImage(image));
        }
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineHandle, GpuError> {
        if desc.stages.is_empty() {
            return Err(GpuError::PipelineCreation(format!(
                "{}: no shader stages",
                desc.label
            )));
        }
        let handle = PipelineHandle::from_raw(self.next_raw());
        self.pipelines.insert(handle);
        self.journal.push(DeviceEvent::CreatePipeline(handle));
        Ok(handle)
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle) {
        if self.pipelines.remove(&pipeline) {
            self.journal.push(DeviceEvent::DestroyPipeline(pipeline));
        }
    }

    fn submit(&mut self, commands: CommandList) -> Result<(), GpuError> {
        self.validate(&commands)?;
        self.journal.push(DeviceEvent::Submit {
            commands: commands.len(),
        });
        self.submitted.push(commands);
        Ok(())
    }

    fn drain(&mut self) -> Result<(), GpuError> {
        self.journal.push(DeviceEvent::Drain);
        Ok(())
    }

    fn clip_space(&self) -> ClipSpace {
        if self.y_up { ClipSpace::YUp } else { ClipSpace::YDown }
    }
}
