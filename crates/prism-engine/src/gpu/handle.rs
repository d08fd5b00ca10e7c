use std::fmt;

/// Buffer handle issued by a [`GpuBackend`](super::GpuBackend).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BufferHandle(u32);

/// Image handle issued by a [`GpuBackend`](super::GpuBackend).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ImageHandle(u32);

/// Graphics pipeline handle issued by a [`GpuBackend`](super::GpuBackend).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PipelineHandle(u32);

macro_rules! raw_handle {
    ($($ty:ident),*) => {$(
        impl $ty {
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    )*};
}

raw_handle!(BufferHandle, ImageHandle, PipelineHandle);

/// Shader-visible address of a buffer.
///
/// Zero is never a valid address; backends reserve it so an unset field in a
/// push-constant block is detectable.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct DeviceAddress(pub u64);

impl DeviceAddress {
    pub const NULL: Self = Self(0);

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
