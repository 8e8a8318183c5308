//! Scene description, validation and one-time GPU resource creation.

mod attachments;
mod bind;
mod desc;
mod ids;
mod image;
mod initializer;
mod manifest;
mod transform;

pub use attachments::{Attachments, GpuTexture, DEPTH_FORMAT};
pub use desc::{
    AttachmentConfig, BindGroupDesc, BindingRef, BufferContents, BufferDesc, BufferKind, PipelineDesc,
    PipelineTarget, SamplerDesc, SceneDesc, ShaderDesc, StageRef, TextureDesc, TextureSource,
};
pub use ids::{BindGroupId, BufferId, PipelineId, SamplerId, ShaderId, TextureId};
pub use image::ImageSource;
pub use initializer::{ResourceInitializer, SceneResources};
pub use manifest::{BindGroupInfo, BufferClass, BufferInfo, PipelineInfo, ResourceManifest, TextureInfo};
pub use transform::{TransformBlock, TransformSlot};
