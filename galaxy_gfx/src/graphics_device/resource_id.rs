/// Bindless resource IDs
///
/// Small integers indexing the global descriptor arrays. Each resource kind
/// has its own newtype so a sampler slot can never be used as a texture slot.

use std::fmt;

/// Raw value reserved as "no resource"; never handed out by a pool
pub const INVALID_RESOURCE_ID: u32 = u32::MAX;

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Wrap a raw slot index, rejecting the invalid sentinel
            pub fn new(index: u32) -> Option<Self> {
                if index == INVALID_RESOURCE_ID {
                    None
                } else {
                    Some(Self(index))
                }
            }

            /// Slot index inside the descriptor array (what shaders receive)
            pub fn index(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

resource_id!(
    /// Slot in the storage-buffer array (binding 0)
    BufferId
);
resource_id!(
    /// Slot in the sampled/storage texture arrays (bindings 2 and 3)
    TextureId
);
resource_id!(
    /// Slot in the sampler array (binding 1)
    SamplerId
);

/// Fixed binding numbers of the global bindless descriptor set
pub mod bindings {
    /// Storage buffers (`BufferId`)
    pub const STORAGE_BUFFERS: u32 = 0;
    /// Samplers (`SamplerId`)
    pub const SAMPLERS: u32 = 1;
    /// Sampled textures (`TextureId`)
    pub const SAMPLED_TEXTURES: u32 = 2;
    /// Storage textures (`TextureId`)
    pub const STORAGE_TEXTURES: u32 = 3;
}
