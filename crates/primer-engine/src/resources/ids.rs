//! Typed indices into a scene's resource tables.
//!
//! Ids are handed out by [`SceneDesc`](super::SceneDesc) in declaration order and
//! resolve against the matching [`SceneResources`](super::SceneResources) table.

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(pub(crate) usize);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

resource_id!(
    /// A WGSL module.
    ShaderId
);
resource_id!(
    /// A render pipeline.
    PipelineId
);
resource_id!(
    /// A vertex, index, instance, uniform or storage buffer.
    BufferId
);
resource_id!(
    /// A sampled image or offscreen render target.
    TextureId
);
resource_id!(SamplerId);
resource_id!(BindGroupId);
