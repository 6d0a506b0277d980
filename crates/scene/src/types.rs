//! Primitive identifiers shared by the scene graph, the collector and the
//! GPU record layout.

use serde::Deserialize;

/// Handle of an entity living in the host scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// SDF primitive evaluated by the shader.
///
/// The discriminant is the integer code written into each record, so the
/// order of variants is part of the shader contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum ShapeType {
    #[default]
    Sphere = 0,
    Cube = 1,
    Torus = 2,
    Cylinder = 3,
    Prism = 4,
    Mandelbulb = 5,
}

impl ShapeType {
    /// Code consumed by the shader's primitive switch.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Compositing operation applied when a shape is merged with the shapes
/// evaluated before it.
///
/// Ordering follows the shader's evaluation order and is used as the sort key
/// for top-level shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum Operation {
    #[default]
    Union = 0,
    Blend = 1,
    Cut = 2,
    Mask = 3,
}

impl Operation {
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_order_matches_shader_codes() {
        let mut ops = vec![Operation::Mask, Operation::Union, Operation::Cut, Operation::Blend];
        ops.sort();
        let codes: Vec<i32> = ops.iter().map(|op| op.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn shape_codes_are_stable() {
        assert_eq!(ShapeType::Sphere.code(), 0);
        assert_eq!(ShapeType::Torus.code(), 2);
        assert_eq!(ShapeType::Mandelbulb.code(), 5);
    }
}
