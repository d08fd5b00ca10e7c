use crate::gpu::GpuError;

/// Sub-allocation alignment inside the address space.
///
/// Covers `COPY_BUFFER_ALIGNMENT`, index-buffer offsets and `vec4<u32>`
/// storage reads.
pub const ALIGN: u64 = 16;

/// Bytes kept unused at the start so that address 0 stays null.
pub const RESERVED: u64 = 256;

/// A sub-allocated byte range.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Range {
    pub offset: u64,
    /// Requested size, unaligned.
    pub size: u64,
}

impl Range {
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    #[inline]
    fn footprint(&self) -> u64 {
        self.size.next_multiple_of(ALIGN).max(ALIGN)
    }
}

/// First-fit range allocator over one device buffer.
///
/// Offsets double as device addresses, so no range ever starts at 0.
/// Freed ranges are coalesced with their neighbours.
#[derive(Debug)]
pub struct AddressSpace {
    capacity: u64,
    /// Sorted, non-overlapping, non-adjacent free ranges `(offset, len)`.
    free: Vec<(u64, u64)>,
}

impl AddressSpace {
    pub fn new(capacity: u64) -> Self {
        let free = if capacity > RESERVED {
            vec![(RESERVED, capacity - RESERVED)]
        } else {
            Vec::new()
        };
        Self { capacity, free }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn available(&self) -> u64 {
        self.free.iter().map(|(_, len)| len).sum()
    }

    pub fn allocate(&mut self, size: u64) -> Result<Range, GpuError> {
        let footprint = size.next_multiple_of(ALIGN).max(ALIGN);

        let slot = self
            .free
            .iter()
            .position(|&(_, len)| len >= footprint)
            .ok_or(GpuError::OutOfAddressSpace {
                requested: size,
                available: self.available(),
            })?;

        let (offset, len) = self.free[slot];
        if len == footprint {
            self.free.remove(slot);
        } else {
            self.free[slot] = (offset + footprint, len - footprint);
        }
        Ok(Range { offset, size })
    }

    pub fn release(&mut self, range: Range) {
        let (offset, len) = (range.offset, range.footprint());
        let at = self.free.partition_point(|&(o, _)| o < offset);
        self.free.insert(at, (offset, len));

        // Merge with the following range, then with the preceding one.
        if at + 1 < self.free.len() && offset + len == self.free[at + 1].0 {
            self.free[at].1 += self.free[at + 1].1;
            self.free.remove(at + 1);
        }
        if at > 0 && self.free[at - 1].0 + self.free[at - 1].1 == offset {
            self.free[at - 1].1 += self.free[at].1;
            self.free.remove(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_allocation_skips_the_null_page() {
        let mut space = AddressSpace::new(4096);
        let a = space.allocate(168).unwrap();
        assert_eq!(a.offset, RESERVED);
        assert_eq!(a.size, 168);

        let b = space.allocate(144).unwrap();
        assert_eq!(b.offset, RESERVED + 176);
        assert_eq!(b.offset % ALIGN, 0);
    }

    #[test]
    fn exhaustion_is_reported() {
        let mut space = AddressSpace::new(RESERVED + 64);
        space.allocate(48).unwrap();
        let err = space.allocate(32).unwrap_err();
        assert!(matches!(
            err,
            GpuError::OutOfAddressSpace { requested: 32, available: 16 }
        ));
    }

    #[test]
    fn released_ranges_coalesce() {
        let mut space = AddressSpace::new(RESERVED + 96);
        let a = space.allocate(32).unwrap();
        let b = space.allocate(32).unwrap();
        let c = space.allocate(32).unwrap();
        assert_eq!(space.available(), 0);

        space.release(a);
        space.release(c);
        space.release(b);
        assert_eq!(space.available(), 96);

        // One contiguous range again.
        let big = space.allocate(96).unwrap();
        assert_eq!(big.offset, RESERVED);
    }

    #[test]
    fn zero_sized_allocations_still_get_a_unique_address() {
        let mut space = AddressSpace::new(1024);
        let a = space.allocate(0).unwrap();
        let b = space.allocate(0).unwrap();
        assert_ne!(a.offset, b.offset);
    }

    #[test]
    fn tiny_capacity_has_no_room() {
        let mut space = AddressSpace::new(RESERVED);
        assert_eq!(space.capacity(), RESERVED);
        assert_eq!(space.available(), 0);
        assert!(space.allocate(4).is_err());
    }
}
