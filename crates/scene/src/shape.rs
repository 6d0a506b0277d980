//! Shape components and the registry that holds them.

use glam::Vec4;

use crate::types::{EntityId, Operation, ShapeType};

/// Blend strength accepted by the shader's smooth-min.
pub const BLEND_STRENGTH_RANGE: (f32, f32) = (0.0, 1.0);
/// Fractal power range for parametrized shapes.
pub const POWER_RANGE: (f32, f32) = (1.0, 16.0);
/// Fractal iteration range for parametrized shapes.
pub const ITERATIONS_RANGE: (f32, f32) = (1.0, 20.0);

/// Renderable SDF primitive attached to a scene-graph entity.
///
/// Transform data is not stored here: position, rotation and scale are read
/// from the [`SceneGraph`](crate::SceneGraph) every time shapes are collected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub shape_type: ShapeType,
    pub operation: Operation,
    /// Linear RGBA.
    pub color: Vec4,
    blend_strength: f32,
    special_params: [f32; 2],
    /// Number of direct child shapes folded into this one. Written by
    /// [`collect`](crate::collect).
    pub num_children: u32,
}

impl Default for Shape {
    fn default() -> Self {
        Self {
            shape_type: ShapeType::Sphere,
            operation: Operation::Union,
            color: Vec4::ONE,
            blend_strength: 0.5,
            special_params: [8.0, 10.0],
            num_children: 0,
        }
    }
}

impl Shape {
    #[must_use]
    pub fn new(shape_type: ShapeType, operation: Operation) -> Self {
        Self {
            shape_type,
            operation,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_blend_strength(mut self, strength: f32) -> Self {
        self.set_blend_strength(strength);
        self
    }

    /// Sets fractal power and iteration count. Only Mandelbulb reads them.
    #[must_use]
    pub fn with_fractal(mut self, power: f32, iterations: f32) -> Self {
        self.set_fractal(power, iterations);
        self
    }

    pub fn set_blend_strength(&mut self, strength: f32) {
        self.blend_strength = strength.clamp(BLEND_STRENGTH_RANGE.0, BLEND_STRENGTH_RANGE.1);
    }

    pub fn set_fractal(&mut self, power: f32, iterations: f32) {
        self.special_params = [
            power.clamp(POWER_RANGE.0, POWER_RANGE.1),
            iterations.clamp(ITERATIONS_RANGE.0, ITERATIONS_RANGE.1),
        ];
    }

    #[must_use]
    pub fn blend_strength(&self) -> f32 {
        self.blend_strength
    }

    /// `[power, iterations]`.
    #[must_use]
    pub fn special_params(&self) -> [f32; 2] {
        self.special_params
    }
}

/// Insertion-ordered set of shapes keyed by entity.
///
/// Iteration order is the pre-sort order the collector starts from, so
/// replacing an existing entry keeps its position.
#[derive(Debug, Default, Clone)]
pub struct ShapeSet {
    entries: Vec<(EntityId, Shape)>,
}

impl ShapeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the shape for `entity`. Returns the previous shape.
    pub fn insert(&mut self, entity: EntityId, shape: Shape) -> Option<Shape> {
        match self.position(entity) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, shape)),
            None => {
                self.entries.push((entity, shape));
                None
            }
        }
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<Shape> {
        let idx = self.position(entity)?;
        Some(self.entries.remove(idx).1)
    }

    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&Shape> {
        self.entries.iter().find(|(id, _)| *id == entity).map(|(_, s)| s)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut Shape> {
        self.entries
            .iter_mut()
            .find(|(id, _)| *id == entity)
            .map(|(_, s)| s)
    }

    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.position(entity).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Shape)> {
        self.entries.iter().map(|(id, s)| (*id, s))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, entity: EntityId) -> Option<usize> {
        self.entries.iter().position(|(id, _)| *id == entity)
    }
}
