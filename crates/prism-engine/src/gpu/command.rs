use super::desc::Extent2d;
use super::handle::{BufferHandle, ImageHandle, PipelineHandle};

/// Pipeline stages named in a barrier.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct PipelineStages {
    pub transfer: bool,
    pub compute: bool,
    pub all_graphics: bool,
}

impl PipelineStages {
    pub const NONE: Self = Self {
        transfer: false,
        compute: false,
        all_graphics: false,
    };

    pub const TRANSFER: Self = Self {
        transfer: true,
        compute: false,
        all_graphics: false,
    };

    pub const ALL_GRAPHICS: Self = Self {
        transfer: false,
        compute: false,
        all_graphics: true,
    };

    pub const SHADERS: Self = Self {
        transfer: false,
        compute: true,
        all_graphics: true,
    };

    #[inline]
    pub const fn is_empty(self) -> bool {
        !(self.transfer || self.compute || self.all_graphics)
    }
}

/// Memory access kinds named in a barrier.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Access {
    pub transfer_write: bool,
    pub memory_read: bool,
    pub memory_write: bool,
}

impl Access {
    pub const NONE: Self = Self {
        transfer_write: false,
        memory_read: false,
        memory_write: false,
    };

    pub const TRANSFER_WRITE: Self = Self {
        transfer_write: true,
        memory_read: false,
        memory_write: false,
    };

    pub const MEMORY_READ_WRITE: Self = Self {
        transfer_write: false,
        memory_read: true,
        memory_write: true,
    };
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ImageLayout {
    Undefined,
    General,
}

/// Global execution + memory dependency.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MemoryBarrier {
    pub src_stages: PipelineStages,
    pub src_access: Access,
    pub dst_stages: PipelineStages,
    pub dst_access: Access,
}

impl MemoryBarrier {
    /// Orders clears (transfer writes) before any graphics-stage access.
    pub const CLEAR_TO_DRAW: Self = Self {
        src_stages: PipelineStages::TRANSFER,
        src_access: Access::TRANSFER_WRITE,
        dst_stages: PipelineStages::ALL_GRAPHICS,
        dst_access: Access::MEMORY_READ_WRITE,
    };
}

/// Dependency scoped to one image, optionally transitioning its layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ImageBarrier {
    pub image: ImageHandle,
    pub src_stages: PipelineStages,
    pub src_access: Access,
    pub dst_stages: PipelineStages,
    pub dst_access: Access,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
}

impl ImageBarrier {
    /// First-use transition for a freshly allocated image: nothing to wait
    /// on, every shader stage may read or write afterwards.
    pub const fn initial_transition(image: ImageHandle) -> Self {
        Self {
            image,
            src_stages: PipelineStages::NONE,
            src_access: Access::NONE,
            dst_stages: PipelineStages::SHADERS,
            dst_access: Access::MEMORY_READ_WRITE,
            old_layout: ImageLayout::Undefined,
            new_layout: ImageLayout::General,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

/// Attachments of a rendering scope.
///
/// The viewport is dynamic: it always covers `extent`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RenderTargets {
    pub color: ImageHandle,
    pub depth: Option<ImageHandle>,
    pub extent: Extent2d,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawIndexed {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

impl DrawIndexed {
    /// One instance of `index_count` indices starting at index 0.
    pub const fn single(index_count: u32) -> Self {
        Self {
            index_count,
            instance_count: 1,
            first_index: 0,
            vertex_offset: 0,
            first_instance: 0,
        }
    }
}

/// A recorded GPU command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ImageBarrier(ImageBarrier),
    MemoryBarrier(MemoryBarrier),
    ClearColor { image: ImageHandle, color: [f32; 4] },
    ClearDepth { image: ImageHandle, depth: f32 },
    BeginRendering(RenderTargets),
    BindPipeline(PipelineHandle),
    BindIndexBuffer {
        buffer: BufferHandle,
        format: IndexFormat,
    },
    /// Inline constant data. Overwrites the constant block in place, so it
    /// must be recorded right before the draw that consumes it.
    PushConstants {
        pipeline: PipelineHandle,
        offset: u32,
        data: Vec<u8>,
    },
    DrawIndexed(DrawIndexed),
    EndRendering,
}

/// Payload-free discriminant of [`Command`], handy for logs and assertions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CommandKind {
    ImageBarrier,
    MemoryBarrier,
    ClearColor,
    ClearDepth,
    BeginRendering,
    BindPipeline,
    BindIndexBuffer,
    PushConstants,
    DrawIndexed,
    EndRendering,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::ImageBarrier(_) => CommandKind::ImageBarrier,
            Command::MemoryBarrier(_) => CommandKind::MemoryBarrier,
            Command::ClearColor { .. } => CommandKind::ClearColor,
            Command::ClearDepth { .. } => CommandKind::ClearDepth,
            Command::BeginRendering(_) => CommandKind::BeginRendering,
            Command::BindPipeline(_) => CommandKind::BindPipeline,
            Command::BindIndexBuffer { .. } => CommandKind::BindIndexBuffer,
            Command::PushConstants { .. } => CommandKind::PushConstants,
            Command::DrawIndexed(_) => CommandKind::DrawIndexed,
            Command::EndRendering => CommandKind::EndRendering,
        }
    }

    /// Pipeline referenced by this command, if any.
    pub fn pipeline(&self) -> Option<PipelineHandle> {
        match self {
            Command::BindPipeline(p) => Some(*p),
            Command::PushConstants { pipeline, .. } => Some(*pipeline),
            _ => None,
        }
    }
}

/// Ordered command recording for one frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommandList {
    commands: Vec<Command>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    /// Records `body` inside a rendering scope on `targets`.
    ///
    /// `EndRendering` is always recorded after `body`, including when it
    /// returns an error, so a partially recorded list stays well formed.
    pub fn with_render_targets<T, E>(
        &mut self,
        targets: RenderTargets,
        body: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        self.push(Command::BeginRendering(targets));
        let out = body(self);
        self.push(Command::EndRendering);
        out
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    pub fn kinds(&self) -> Vec<CommandKind> {
        self.commands.iter().map(Command::kind).collect()
    }

    pub fn count(&self, kind: CommandKind) -> usize {
        self.commands.iter().filter(|c| c.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl IntoIterator for CommandList {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
