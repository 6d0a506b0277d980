//! CPU side of the SDF raymarcher: packs the collected scene shapes into the
//! `_Shapes` structured buffer and keeps it, the shape count and the frame
//! uniforms bound for the shader.

pub mod backend;
pub mod binding;
pub mod camera;
pub mod error;
pub mod gpu_types;
pub mod layout;
pub mod manager;
pub mod packer;
pub mod wgpu_backend;

pub use backend::{BackendStats, HostBackend, HostBuffer, ShapeBufferBackend, WriteRecord};
pub use binding::{BoundValue, HostShapeBinding, ShapeBinding};
pub use camera::{DirectionalLight, FrameCamera};
pub use error::RenderError;
pub use gpu_types::{FrameUniforms, ShapeCount, ShapeGpu};
pub use packer::{
    pack_records, records_as_bytes, refresh_records, refresh_transforms, BufferState,
    ShapeBufferPacker, SyncOutcome,
};
pub use manager::{FrameReport, FrameStatus, SceneManager};
pub use wgpu_backend::{request_headless_device, WgpuShapeBackend, WgpuShapeBinding};
