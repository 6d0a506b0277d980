//! Record descriptor shared between the packer and the shader.
//!
//! The shader side declares the same layout in `shaders/shapes.wgsl`
//! ([`SHAPES_WGSL`]); the compile-time checks below keep [`ShapeGpu`] and the
//! descriptor in step, and the shader test keeps the WGSL in step.

use std::mem::{offset_of, size_of};
use std::ops::Range;

use crate::gpu_types::{FrameUniforms, ShapeCount, ShapeGpu};

/// WGSL declarations of the shape record, frame uniforms and bindings.
/// Prepended to the raymarch shader by the consumer.
pub const SHAPES_WGSL: &str = include_str!("../shaders/shapes.wgsl");

// Binding names understood by the shader-binding layer.
pub const SHAPES: &str = "_Shapes";
pub const NUM_SHAPES: &str = "_NumShapes";
pub const CAMERA_TO_WORLD: &str = "_CameraToWorld";
pub const CAMERA_INVERSE_PROJECTION: &str = "_CameraInverseProjection";
pub const CAMERA_POSITION: &str = "_CameraPosition";
pub const LIGHT_DIRECTION: &str = "_LightDirection";
pub const LIGHT_COLOR: &str = "_LightColor";

// Bind group 0 slots.
pub const FRAME_BINDING: u32 = 0;
pub const COUNT_BINDING: u32 = 1;
pub const SHAPES_BINDING: u32 = 2;

/// Alignment structured-buffer records are padded to.
pub const GPU_RECORD_ALIGN: usize = 16;
pub const SHAPE_RECORD_SIZE: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDesc {
    pub name: &'static str,
    pub offset: usize,
    pub size: usize,
}

impl FieldDesc {
    const fn new(name: &'static str, offset: usize, size: usize) -> Self {
        Self { name, offset, size }
    }

    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Ordered fields of one `_Shapes` record.
pub const SHAPE_RECORD_FIELDS: [FieldDesc; 11] = [
    FieldDesc::new("position", 0, 12),
    FieldDesc::new("scale", 12, 12),
    FieldDesc::new("color", 24, 16),
    FieldDesc::new("rotation", 40, 12),
    FieldDesc::new("shape_type", 52, 4),
    FieldDesc::new("operation", 56, 4),
    FieldDesc::new("blend_strength", 60, 4),
    FieldDesc::new("special_param1", 64, 4),
    FieldDesc::new("special_param2", 68, 4),
    FieldDesc::new("num_children", 72, 4),
    FieldDesc::new("padding", 76, 4),
];

/// Byte span inside a record rewritten by in-place transform updates.
pub const TRANSFORM_SPAN: Range<usize> =
    SHAPE_RECORD_FIELDS[0].offset..SHAPE_RECORD_FIELDS[1].end();

const fn is_contiguous(fields: &[FieldDesc], size: usize) -> bool {
    let mut cursor = 0;
    let mut i = 0;
    while i < fields.len() {
        if fields[i].offset != cursor {
            return false;
        }
        cursor += fields[i].size;
        i += 1;
    }
    cursor == size
}

const _: () = assert!(is_contiguous(&SHAPE_RECORD_FIELDS, SHAPE_RECORD_SIZE));
const _: () = assert!(size_of::<ShapeGpu>() == SHAPE_RECORD_SIZE);
const _: () = assert!(SHAPE_RECORD_SIZE % GPU_RECORD_ALIGN == 0);
const _: () = assert!(size_of::<FrameUniforms>() % GPU_RECORD_ALIGN == 0);
const _: () = assert!(size_of::<ShapeCount>() == GPU_RECORD_ALIGN);

const _: () = assert!(offset_of!(ShapeGpu, position) == SHAPE_RECORD_FIELDS[0].offset);
const _: () = assert!(offset_of!(ShapeGpu, scale) == SHAPE_RECORD_FIELDS[1].offset);
const _: () = assert!(offset_of!(ShapeGpu, color) == SHAPE_RECORD_FIELDS[2].offset);
const _: () = assert!(offset_of!(ShapeGpu, rotation) == SHAPE_RECORD_FIELDS[3].offset);
const _: () = assert!(offset_of!(ShapeGpu, shape_type) == SHAPE_RECORD_FIELDS[4].offset);
const _: () = assert!(offset_of!(ShapeGpu, operation) == SHAPE_RECORD_FIELDS[5].offset);
const _: () = assert!(offset_of!(ShapeGpu, blend_strength) == SHAPE_RECORD_FIELDS[6].offset);
const _: () = assert!(offset_of!(ShapeGpu, special_param1) == SHAPE_RECORD_FIELDS[7].offset);
const _: () = assert!(offset_of!(ShapeGpu, special_param2) == SHAPE_RECORD_FIELDS[8].offset);
const _: () = assert!(offset_of!(ShapeGpu, num_children) == SHAPE_RECORD_FIELDS[9].offset);
const _: () = assert!(offset_of!(ShapeGpu, padding) == SHAPE_RECORD_FIELDS[10].offset);

/// Looks up a field of the shape record by name.
#[must_use]
pub fn field(name: &str) -> Option<&'static FieldDesc> {
    SHAPE_RECORD_FIELDS.iter().find(|f| f.name == name)
}

/// Byte offset of record `index` inside the `_Shapes` buffer.
#[must_use]
pub const fn record_offset(index: usize) -> u64 {
    (index * SHAPE_RECORD_SIZE) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_span_covers_position_and_scale() {
        assert_eq!(TRANSFORM_SPAN, 0..24);
    }

    #[test]
    fn field_lookup() {
        let f = field("num_children").unwrap();
        assert_eq!((f.offset, f.size), (72, 4));
        assert!(field("missing").is_none());
    }

    #[test]
    fn record_offsets_are_strided() {
        assert_eq!(record_offset(0), 0);
        assert_eq!(record_offset(3), 240);
    }
}
