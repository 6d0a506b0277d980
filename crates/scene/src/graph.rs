//! Read-only view of the host scene graph and an in-memory implementation.
//!
//! The collector never owns transforms. It asks a [`SceneGraph`] for the
//! world transform and the parent/child relation of each entity once per
//! collection pass, so any engine can plug in by implementing the trait.

use std::collections::HashMap;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::error::SceneError;
use crate::types::EntityId;

/// Transform facts the collector needs for one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    /// World-space position.
    pub position: Vec3,
    /// World-space Euler angles (XYZ order) in degrees.
    pub rotation_degrees: Vec3,
    /// Scale relative to the parent entity.
    pub local_scale: Vec3,
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation_degrees: Vec3::ZERO,
            local_scale: Vec3::ONE,
        }
    }
}

/// Adapter over whatever scene representation the host provides.
pub trait SceneGraph {
    /// `None` when the entity has been destroyed or never existed.
    fn world_transform(&self, entity: EntityId) -> Option<WorldTransform>;

    /// Direct parent of `entity`, if any.
    fn parent(&self, entity: EntityId) -> Option<EntityId>;

    /// Direct children of `entity` in scene order.
    fn children(&self, entity: EntityId) -> Vec<EntityId>;
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
}

impl Node {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent: None,
            children: Vec::new(),
        }
    }

    fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    #[must_use]
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }
}

/// Simple transform hierarchy kept in memory.
///
/// Used by the runtime to host scenes loaded from disk and by tests.
#[derive(Debug, Default, Clone)]
pub struct NodeGraph {
    nodes: HashMap<EntityId, Node>,
    roots: Vec<EntityId>,
    next_id: u64,
}

impl NodeGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a root node at the origin.
    pub fn spawn(&mut self, name: &str) -> EntityId {
        let id = self.allocate_id();
        self.nodes.insert(id, Node::new(name));
        self.roots.push(id);
        id
    }

    /// Creates a node as the last child of `parent`.
    pub fn spawn_child(&mut self, parent: EntityId, name: &str) -> Result<EntityId, SceneError> {
        if !self.nodes.contains_key(&parent) {
            return Err(SceneError::UnknownEntity(parent));
        }
        let id = self.allocate_id();
        let mut node = Node::new(name);
        node.parent = Some(parent);
        self.nodes.insert(id, node);
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Moves `child` under `parent`, or to the root list when `parent` is `None`.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> Result<(), SceneError> {
        if !self.nodes.contains_key(&child) {
            return Err(SceneError::UnknownEntity(child));
        }
        if let Some(parent) = parent {
            if !self.nodes.contains_key(&parent) {
                return Err(SceneError::UnknownEntity(parent));
            }
            if self.is_ancestor_or_self(child, parent) {
                return Err(SceneError::HierarchyCycle { child, parent });
            }
        }

        self.detach(child);
        match parent {
            Some(p) => {
                if let Some(node) = self.nodes.get_mut(&p) {
                    node.children.push(child);
                }
            }
            None => self.roots.push(child),
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = parent;
        }
        Ok(())
    }

    /// Removes `entity` and its whole subtree. Returns every removed id,
    /// `entity` first.
    pub fn despawn(&mut self, entity: EntityId) -> Result<Vec<EntityId>, SceneError> {
        if !self.nodes.contains_key(&entity) {
            return Err(SceneError::UnknownEntity(entity));
        }
        self.detach(entity);

        let mut removed = Vec::new();
        let mut stack = vec![entity];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                stack.extend(node.children.iter().rev());
                removed.push(id);
            }
        }
        Ok(removed)
    }

    pub fn set_translation(&mut self, entity: EntityId, translation: Vec3) -> Result<(), SceneError> {
        self.node_mut(entity)?.translation = translation;
        Ok(())
    }

    /// Sets the local rotation from XYZ Euler angles in degrees.
    pub fn set_rotation_degrees(&mut self, entity: EntityId, degrees: Vec3) -> Result<(), SceneError> {
        let radians = degrees * std::f32::consts::PI / 180.0;
        self.node_mut(entity)?.rotation =
            Quat::from_euler(EulerRot::XYZ, radians.x, radians.y, radians.z);
        Ok(())
    }

    pub fn set_scale(&mut self, entity: EntityId, scale: Vec3) -> Result<(), SceneError> {
        self.node_mut(entity)?.scale = scale;
        Ok(())
    }

    #[must_use]
    pub fn node(&self, entity: EntityId) -> Option<&Node> {
        self.nodes.get(&entity)
    }

    /// First node with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.iter_depth_first().find(|id| {
            self.nodes
                .get(id)
                .is_some_and(|node| node.name == name)
        })
    }

    #[must_use]
    pub fn roots(&self) -> &[EntityId] {
        &self.roots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order walk from the roots, in scene order.
    pub fn iter_depth_first(&self) -> impl Iterator<Item = EntityId> + '_ {
        let mut stack: Vec<EntityId> = self.roots.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev());
            }
            Some(id)
        })
    }

    /// World matrix from composing every ancestor's local transform.
    #[must_use]
    pub fn world_matrix(&self, entity: EntityId) -> Option<Mat4> {
        let mut matrix = self.nodes.get(&entity)?.local_matrix();
        let mut cursor = self.nodes.get(&entity)?.parent;
        while let Some(id) = cursor {
            let node = self.nodes.get(&id)?;
            matrix = node.local_matrix() * matrix;
            cursor = node.parent;
        }
        Some(matrix)
    }

    fn world_rotation(&self, entity: EntityId) -> Option<Quat> {
        let mut rotation = self.nodes.get(&entity)?.rotation;
        let mut cursor = self.nodes.get(&entity)?.parent;
        while let Some(id) = cursor {
            let node = self.nodes.get(&id)?;
            rotation = node.rotation * rotation;
            cursor = node.parent;
        }
        Some(rotation)
    }

    fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    fn node_mut(&mut self, entity: EntityId) -> Result<&mut Node, SceneError> {
        self.nodes
            .get_mut(&entity)
            .ok_or(SceneError::UnknownEntity(entity))
    }

    fn is_ancestor_or_self(&self, ancestor: EntityId, entity: EntityId) -> bool {
        let mut cursor = Some(entity);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    fn detach(&mut self, entity: EntityId) {
        let parent = self.nodes.get(&entity).and_then(|n| n.parent);
        match parent {
            Some(p) => {
                if let Some(node) = self.nodes.get_mut(&p) {
                    node.children.retain(|c| *c != entity);
                }
            }
            None => self.roots.retain(|r| *r != entity),
        }
    }
}

impl SceneGraph for NodeGraph {
    fn world_transform(&self, entity: EntityId) -> Option<WorldTransform> {
        let node = self.nodes.get(&entity)?;
        let position = self.world_matrix(entity)?.transform_point3(Vec3::ZERO);
        let (x, y, z) = self.world_rotation(entity)?.to_euler(EulerRot::XYZ);
        Some(WorldTransform {
            position,
            rotation_degrees: Vec3::new(x, y, z) * 180.0 / std::f32::consts::PI,
            local_scale: node.scale,
        })
    }

    fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.nodes.get(&entity).and_then(|n| n.parent)
    }

    fn children(&self, entity: EntityId) -> Vec<EntityId> {
        self.nodes
            .get(&entity)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }
}
