//! Shader binding layer
//!
//! The packer only produces buffers; something else has to hand them to the
//! shader together with the shape count and the frame uniforms. That layer is
//! abstracted by [`ShapeBinding`] so the frame driver works the same with a
//! real device or headless.

use std::collections::BTreeMap;

use crate::gpu_types::FrameUniforms;
use crate::layout;

/// Receives the shape buffer and frame uniforms each frame.
pub trait ShapeBinding<Buf: ?Sized> {
    /// False while the consumer cannot accept data (e.g. no material or
    /// pipeline yet). The frame is skipped and retried next frame.
    fn is_ready(&self) -> bool;

    /// Binds the shape buffer and count. `None` with a count of 0 means the
    /// shader must draw nothing from `_Shapes`.
    fn bind_shapes(&mut self, buffer: Option<&Buf>, count: u32);

    fn bind_frame(&mut self, uniforms: &FrameUniforms);
}

/// Value bound under one shader property name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundValue {
    /// Identifier of a host buffer
    Buffer(u64),
    Int(i32),
    Matrix([[f32; 4]; 4]),
    Vector([f32; 4]),
}

/// Records bindings by property name, like a material would.
#[derive(Debug, Default, Clone)]
pub struct HostShapeBinding {
    ready: bool,
    values: BTreeMap<&'static str, BoundValue>,
    shape_binds: u64,
}

impl HostShapeBinding {
    /// A binding that accepts data immediately.
    pub fn new() -> Self {
        Self {
            ready: true,
            ..Self::default()
        }
    }

    /// A binding with no material assigned yet.
    pub fn unassigned() -> Self {
        Self::default()
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn get(&self, name: &str) -> Option<BoundValue> {
        self.values.get(name).copied()
    }

    /// Id of the bound `_Shapes` buffer.
    pub fn bound_buffer(&self) -> Option<u64> {
        match self.get(layout::SHAPES) {
            Some(BoundValue::Buffer(id)) => Some(id),
            _ => None,
        }
    }

    pub fn num_shapes(&self) -> Option<i32> {
        match self.get(layout::NUM_SHAPES) {
            Some(BoundValue::Int(n)) => Some(n),
            _ => None,
        }
    }

    /// How many times the shape buffer binding was replaced.
    pub fn shape_binds(&self) -> u64 {
        self.shape_binds
    }
}

impl ShapeBinding<crate::backend::HostBuffer> for HostShapeBinding {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn bind_shapes(&mut self, buffer: Option<&crate::backend::HostBuffer>, count: u32) {
        self.shape_binds += 1;
        match buffer {
            Some(buffer) if count > 0 => {
                self.values.insert(layout::SHAPES, BoundValue::Buffer(buffer.id()));
            }
            _ => {
                self.values.remove(layout::SHAPES);
            }
        }
        let count = if buffer.is_some() { count } else { 0 };
        self.values.insert(
            layout::NUM_SHAPES,
            BoundValue::Int(i32::try_from(count).unwrap_or(i32::MAX)),
        );
    }

    fn bind_frame(&mut self, uniforms: &FrameUniforms) {
        self.values.insert(layout::CAMERA_TO_WORLD, BoundValue::Matrix(uniforms.camera_to_world));
        self.values.insert(
            layout::CAMERA_INVERSE_PROJECTION,
            BoundValue::Matrix(uniforms.camera_inverse_projection),
        );
        self.values.insert(layout::CAMERA_POSITION, BoundValue::Vector(uniforms.camera_position));
        self.values.insert(layout::LIGHT_DIRECTION, BoundValue::Vector(uniforms.light_direction));
        self.values.insert(layout::LIGHT_COLOR, BoundValue::Vector(uniforms.light_color));
    }
}
