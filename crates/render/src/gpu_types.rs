//! GPU-compatible type definitions for the raymarcher
//!
//! This module contains the buffer structures handed to the WGSL shaders.
//! All types must be Pod and their layout must match `shaders/shapes.wgsl`;
//! [`crate::layout`] asserts this at compile time.

use bytemuck::{Pod, Zeroable};
use scene::ResolvedShape;

/// One record of the `_Shapes` structured buffer.
///
/// Field order is the shader contract. Every member is 4-byte aligned, so the
/// record is tightly packed and exactly 80 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ShapeGpu {
    /// World-space position
    pub position: [f32; 3],
    /// Effective scale, already multiplied by ancestor shapes
    pub scale: [f32; 3],
    /// Linear RGBA
    pub color: [f32; 4],
    /// Euler angles in radians
    pub rotation: [f32; 3],
    pub shape_type: i32,
    pub operation: i32,
    pub blend_strength: f32,
    /// Fractal power for Mandelbulb
    pub special_param1: f32,
    /// Fractal iterations for Mandelbulb
    pub special_param2: f32,
    /// Number of following records folded into this one
    pub num_children: i32,
    pub padding: f32,
}

impl ShapeGpu {
    /// True when anything other than position and scale differs.
    ///
    /// Those two can be rewritten alone; any other difference means the whole
    /// record is rewritten.
    #[must_use]
    pub fn differs_beyond_transform(&self, other: &Self) -> bool {
        let strip = |r: &Self| Self {
            position: [0.0; 3],
            scale: [0.0; 3],
            ..*r
        };
        bytemuck::bytes_of(&strip(self)) != bytemuck::bytes_of(&strip(other))
    }
}

impl From<&ResolvedShape> for ShapeGpu {
    fn from(shape: &ResolvedShape) -> Self {
        Self {
            position: shape.position.to_array(),
            scale: shape.scale.to_array(),
            color: shape.color.to_array(),
            rotation: shape.rotation.to_array(),
            shape_type: shape.shape_type.code(),
            operation: shape.operation.code(),
            blend_strength: shape.blend_strength,
            special_param1: shape.special_params[0],
            special_param2: shape.special_params[1],
            num_children: i32::try_from(shape.num_children).unwrap_or(i32::MAX),
            padding: 0.0,
        }
    }
}

/// Per-frame camera and light uniforms.
///
/// Bound as `_CameraToWorld`, `_CameraInverseProjection`, `_CameraPosition`,
/// `_LightDirection` and `_LightColor`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub camera_to_world: [[f32; 4]; 4],
    pub camera_inverse_projection: [[f32; 4]; 4],
    /// Camera position in world coordinates, w unused
    pub camera_position: [f32; 4],
    /// Direction the light travels in, w unused
    pub light_direction: [f32; 4],
    /// Light color premultiplied by intensity
    pub light_color: [f32; 4],
}

/// Keeps track of how many records the shader may read from `_Shapes`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct ShapeCount {
    pub count: u32,
    pub _pad: [u32; 3],
}

impl ShapeCount {
    #[must_use]
    pub const fn new(count: u32) -> Self {
        Self { count, _pad: [0; 3] }
    }
}
