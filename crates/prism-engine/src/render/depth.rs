use crate::gpu::{
    Command, CommandList, Extent2d, GpuBackend, GpuError, ImageBarrier, ImageDesc, ImageFormat,
    ImageHandle, ImageUsage,
};

/// Depth image matching the current output extent.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DepthAttachment {
    pub image: ImageHandle,
    pub extent: Extent2d,
    pub format: ImageFormat,
}

/// Keeps a depth attachment sized to the output.
#[derive(Debug)]
pub struct DepthManager {
    format: ImageFormat,
    current: Option<DepthAttachment>,
}

impl DepthManager {
    pub fn new(format: ImageFormat) -> Self {
        debug_assert!(format.is_depth(), "{format:?} is not a depth format");
        Self {
            format,
            current: None,
        }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn current(&self) -> Option<&DepthAttachment> {
        self.current.as_ref()
    }

    /// Returns an attachment of exactly `extent`, (re)allocating if needed.
    ///
    /// A reallocation destroys the previous image first and records one
    /// initial layout transition for the new one into `cmds`. Nothing is
    /// recorded when the extent already matches.
    ///
    /// Returns the attachment and whether it was reallocated.
    pub fn ensure(
        &mut self,
        backend: &mut impl GpuBackend,
        extent: Extent2d,
        cmds: &mut CommandList,
    ) -> Result<(DepthAttachment, bool), GpuError> {
        if let Some(depth) = self.current.filter(|d| d.extent == extent) {
            return Ok((depth, false));
        }

        if let Some(old) = self.current.take() {
            backend.destroy_image(old.image);
        }

        let image = backend.create_image(&ImageDesc {
            label: "depth attachment",
            extent,
            format: self.format,
            usage: ImageUsage::DEPTH_TARGET,
        })?;
        cmds.push(Command::ImageBarrier(ImageBarrier::initial_transition(image)));

        log::debug!(
            "depth attachment allocated: {}x{} {:?}",
            extent.width,
            extent.height,
            self.format
        );

        let depth = DepthAttachment {
            image,
            extent,
            format: self.format,
        };
        self.current = Some(depth);
        Ok((depth, true))
    }

    /// Destroys the attachment, if any. The device must already be drained.
    pub fn destroy(&mut self, backend: &mut impl GpuBackend) {
        if let Some(depth) = self.current.take() {
            backend.destroy_image(depth.image);
        }
    }
}

impl Default for DepthManager {
    fn default() -> Self {
        Self::new(ImageFormat::Depth32Float)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{CommandKind, DeviceEvent, HeadlessBackend, ImageLayout};

    #[test]
    fn first_call_allocates_and_transitions() {
        let mut backend = HeadlessBackend::new();
        let mut depth = DepthManager::default();
        let mut cmds = CommandList::new();

        let (att, fresh) = depth.ensure(&mut backend, Extent2d::new(800, 600), &mut cmds).unwrap();

        assert!(fresh);
        assert_eq!(att.extent, Extent2d::new(800, 600));
        assert_eq!(depth.format(), ImageFormat::Depth32Float);
        assert_eq!(backend.image_format(att.image), Some(depth.format()));
        assert_eq!(backend.image_extent(att.image), Some(att.extent));
        assert_eq!(cmds.len(), 1);
        match &cmds.commands()[0] {
            Command::ImageBarrier(b) => {
                assert_eq!(b.image, att.image);
                assert_eq!(b.old_layout, ImageLayout::Undefined);
                assert_eq!(b.new_layout, ImageLayout::General);
            }
            other => panic!("expected a layout transition, got {other:?}"),
        }
    }

    #[test]
    fn matching_extent_is_a_no_op() {
        let mut backend = HeadlessBackend::new();
        let mut depth = DepthManager::default();
        let mut cmds = CommandList::new();
        let (first, _) = depth.ensure(&mut backend, Extent2d::new(64, 64), &mut cmds).unwrap();

        backend.clear_journal();
        let mut cmds = CommandList::new();
        let (second, fresh) = depth.ensure(&mut backend, Extent2d::new(64, 64), &mut cmds).unwrap();

        assert!(!fresh);
        assert_eq!(first, second);
        assert!(cmds.is_empty());
        assert!(backend.journal().is_empty());
    }

    #[test]
    fn resize_destroys_before_allocating() {
        let mut backend = HeadlessBackend::new();
        let mut depth = DepthManager::default();
        let mut cmds = CommandList::new();
        let (old, _) = depth.ensure(&mut backend, Extent2d::new(800, 600), &mut cmds).unwrap();

        backend.clear_journal();
        let mut cmds = CommandList::new();
        let (new, fresh) = depth.ensure(&mut backend, Extent2d::new(1024, 768), &mut cmds).unwrap();

        assert!(fresh);
        assert_eq!(new.extent, Extent2d::new(1024, 768));
        assert_eq!(
            backend.journal(),
            &[
                DeviceEvent::DestroyImage(old.image),
                DeviceEvent::CreateImage { image: new.image, extent: new.extent },
            ]
        );
        assert_eq!(cmds.count(CommandKind::ImageBarrier), 1);
        assert_eq!(backend.live_images(), 1);
    }

    #[test]
    fn failed_allocation_leaves_no_attachment() {
        let mut backend = HeadlessBackend::new();
        let mut depth = DepthManager::default();
        let mut cmds = CommandList::new();
        depth.ensure(&mut backend, Extent2d::new(8, 8), &mut cmds).unwrap();

        backend.fail_allocations(true);
        let err = depth.ensure(&mut backend, Extent2d::new(16, 16), &mut cmds);
        assert!(matches!(err, Err(GpuError::Allocation { .. })));
        assert!(depth.current().is_none());
        assert_eq!(backend.live_images(), 0);
    }
}
