//! Scene shape collection
//!
//! Turns the unordered set of shapes present in the scene into the flat,
//! fold-ordered list the shader walks: every top-level shape is followed by
//! its direct child shapes, and top-level shapes are stably ordered by their
//! compositing operation.

use glam::{Vec3, Vec4};
use tracing::{debug, warn};

use crate::error::FoldOrderError;
use crate::graph::SceneGraph;
use crate::shape::ShapeSet;
use crate::types::{EntityId, Operation, ShapeType};

/// Snapshot of one shape with its transform resolved for this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedShape {
    pub entity: EntityId,
    pub shape_type: ShapeType,
    pub operation: Operation,
    /// World-space position.
    pub position: Vec3,
    /// Effective scale, inherited from ancestor shapes.
    pub scale: Vec3,
    /// Euler angles in radians.
    pub rotation: Vec3,
    pub color: Vec4,
    pub blend_strength: f32,
    pub special_params: [f32; 2],
    /// Count of direct child records that immediately follow this one.
    pub num_children: u32,
}

fn parent_shape<G: SceneGraph + ?Sized>(
    graph: &G,
    shapes: &ShapeSet,
    entity: EntityId,
) -> Option<EntityId> {
    graph.parent(entity).filter(|p| shapes.contains(*p))
}

/// Local scale of `entity` multiplied by the effective scale of its parent
/// shape, recursively up the chain of shape-bearing parents.
///
/// The chain stops at the first parent that carries no shape or whose
/// transform is gone. Returns `None` when `entity` itself has no transform.
pub fn effective_scale<G: SceneGraph + ?Sized>(
    graph: &G,
    shapes: &ShapeSet,
    entity: EntityId,
) -> Option<Vec3> {
    let mut scale = graph.world_transform(entity)?.local_scale;
    let mut cursor = parent_shape(graph, shapes, entity);
    // Bounded by the shape count so a malformed host graph cannot loop forever.
    let mut remaining = shapes.len();
    while let (Some(parent), true) = (cursor, remaining > 0) {
        let Some(transform) = graph.world_transform(parent) else {
            break;
        };
        scale *= transform.local_scale;
        cursor = parent_shape(graph, shapes, parent);
        remaining -= 1;
    }
    Some(scale)
}

fn resolve<G: SceneGraph + ?Sized>(
    graph: &G,
    shapes: &ShapeSet,
    entity: EntityId,
) -> Option<ResolvedShape> {
    let shape = shapes.get(entity)?;
    let transform = graph.world_transform(entity)?;
    let scale = effective_scale(graph, shapes, entity)?;
    Some(ResolvedShape {
        entity,
        shape_type: shape.shape_type,
        operation: shape.operation,
        position: transform.position,
        scale,
        rotation: transform.rotation_degrees * (std::f32::consts::PI / 180.0),
        color: shape.color,
        blend_strength: shape.blend_strength(),
        special_params: shape.special_params(),
        num_children: 0,
    })
}

/// Collects the shapes present in `graph` into fold order.
///
/// Top-level shapes (whose parent entity carries no shape) are stably sorted
/// by [`Operation`]. Each is emitted followed by its direct child shapes in
/// scene order, and its `num_children` is set to the number of children
/// emitted. The counts are also written back into `shapes`.
///
/// Shapes whose transform is missing are skipped. Grandchild shapes are not
/// emitted since the shader folds a single level.
pub fn collect<G: SceneGraph + ?Sized>(shapes: &mut ShapeSet, graph: &G) -> Vec<ResolvedShape> {
    let present: &ShapeSet = shapes;
    let mut top_level: Vec<(EntityId, Operation)> = present
        .iter()
        .filter(|(id, _)| parent_shape(graph, present, *id).is_none())
        .map(|(id, shape)| (id, shape.operation))
        .collect();
    top_level.sort_by_key(|(_, op)| *op);

    let mut ordered = Vec::with_capacity(present.len());
    let mut counts = Vec::with_capacity(present.len());

    for (id, _) in top_level {
        let Some(root) = resolve(graph, present, id) else {
            warn!("Skipping shape {id:?}: transform is missing");
            continue;
        };
        let root_index = ordered.len();
        ordered.push(root);

        let mut num_children = 0_u32;
        for child in graph.children(id) {
            if !present.contains(child) {
                continue;
            }
            if graph.parent(child) != Some(id) {
                debug!("Shape {child:?} is listed under {id:?} but parented elsewhere, not folded");
                continue;
            }
            let Some(resolved) = resolve(graph, present, child) else {
                warn!("Skipping child shape {child:?} of {id:?}: transform is missing");
                continue;
            };
            let nested = graph
                .children(child)
                .into_iter()
                .filter(|g| present.contains(*g))
                .count();
            if nested > 0 {
                debug!("Shape {child:?} has {nested} nested shapes that are not folded");
            }
            ordered.push(resolved);
            counts.push((child, 0));
            num_children += 1;
        }

        ordered[root_index].num_children = num_children;
        counts.push((id, num_children));
    }

    for (id, n) in counts {
        if let Some(shape) = shapes.get_mut(id) {
            shape.num_children = n;
        }
    }

    debug!("Collected {} of {} shapes", ordered.len(), shapes.len());
    ordered
}

/// Checks the fold contract: each top-level record is followed by exactly
/// `num_children` child records, and child records declare no children.
pub fn validate_fold_order(records: &[ResolvedShape]) -> Result<(), FoldOrderError> {
    let mut index = 0;
    while index < records.len() {
        let declared = records[index].num_children;
        let children = &records[index + 1..];
        let well_formed = children
            .iter()
            .take(declared as usize)
            .take_while(|r| r.num_children == 0)
            .count();
        if well_formed < declared as usize {
            return Err(FoldOrderError {
                index,
                num_children: declared,
                available: well_formed,
            });
        }
        index += 1 + declared as usize;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeGraph;
    use crate::shape::Shape;

    fn shape(op: Operation) -> Shape {
        Shape::new(ShapeType::Sphere, op)
    }

    #[test]
    fn empty_scene_collects_nothing() {
        let mut shapes = ShapeSet::new();
        let graph = NodeGraph::new();
        assert!(collect(&mut shapes, &graph).is_empty());
    }

    #[test]
    fn unshaped_parent_makes_child_top_level() {
        let mut graph = NodeGraph::new();
        let group = graph.spawn("group");
        graph.set_scale(group, Vec3::splat(4.0)).unwrap();
        let child = graph.spawn_child(group, "child").unwrap();
        graph.set_scale(child, Vec3::splat(0.5)).unwrap();

        let mut shapes = ShapeSet::new();
        shapes.insert(child, shape(Operation::Union));

        let out = collect(&mut shapes, &graph);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].scale, Vec3::splat(0.5));
        assert_eq!(out[0].num_children, 0);
    }

    #[test]
    fn rotation_is_converted_to_radians() {
        let mut graph = NodeGraph::new();
        let id = graph.spawn("a");
        graph.set_rotation_degrees(id, Vec3::new(90.0, 0.0, 0.0)).unwrap();
        let mut shapes = ShapeSet::new();
        shapes.insert(id, shape(Operation::Union));

        let out = collect(&mut shapes, &graph);
        assert!((out[0].rotation.x - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn fold_validation_detects_short_block() {
        let mut graph = NodeGraph::new();
        let id = graph.spawn("a");
        let mut shapes = ShapeSet::new();
        shapes.insert(id, shape(Operation::Union));
        let mut out = collect(&mut shapes, &graph);
        assert!(validate_fold_order(&out).is_ok());

        out[0].num_children = 2;
        assert_eq!(
            validate_fold_order(&out),
            Err(FoldOrderError { index: 0, num_children: 2, available: 0 })
        );
    }
}
