//! TOML scene description
//!
//! ```toml
//! [camera]
//! position = [0.0, 2.0, 10.0]
//! target = [0.0, 0.0, 0.0]
//!
//! [light]
//! direction = [-0.4, -1.0, -0.3]
//!
//! [[node]]
//! name = "body"
//! position = [0.0, 1.0, 0.0]
//! [node.shape]
//! type = "cube"
//!
//! [[node]]
//! name = "head"
//! parent = "body"
//! position = [0.0, 1.2, 0.0]
//! [node.shape]
//! type = "sphere"
//! operation = "blend"
//! ```
//!
//! Nodes are created in file order. A node may name a parent declared
//! anywhere in the file; nodes without a `[node.shape]` table only carry a
//! transform.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::{Vec3, Vec4};
use render::{DirectionalLight, FrameCamera};
use scene::{NodeGraph, Operation, SceneError, Shape, ShapeSet, ShapeType};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraDesc {
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Vertical field of view in degrees
    pub fov: f32,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self {
            position: [0.0, 2.0, 10.0],
            target: [0.0; 3],
            fov: 45.0,
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightDesc {
    pub direction: [f32; 3],
    #[serde(default = "white")]
    pub color: [f32; 3],
    #[serde(default = "one")]
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShapeDesc {
    #[serde(rename = "type")]
    pub shape_type: ShapeType,
    #[serde(default)]
    pub operation: Operation,
    #[serde(default = "opaque_white")]
    pub color: [f32; 4],
    #[serde(default = "half")]
    pub blend_strength: f32,
    /// Mandelbulb exponent
    #[serde(default = "default_power")]
    pub power: f32,
    /// Mandelbulb iteration count
    #[serde(default = "default_iterations")]
    pub iterations: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDesc {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub position: [f32; 3],
    /// Euler angles in degrees, XYZ order
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub shape: Option<ShapeDesc>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDesc {
    #[serde(default)]
    pub camera: CameraDesc,
    #[serde(default)]
    pub light: Option<LightDesc>,
    #[serde(default, rename = "node")]
    pub nodes: Vec<NodeDesc>,
}

fn white() -> [f32; 3] {
    [1.0; 3]
}

fn opaque_white() -> [f32; 4] {
    [1.0; 4]
}

fn unit_scale() -> [f32; 3] {
    [1.0; 3]
}

fn one() -> f32 {
    1.0
}

fn half() -> f32 {
    0.5
}

fn default_power() -> f32 {
    8.0
}

fn default_iterations() -> f32 {
    10.0
}

/// Everything the frame loop needs from a scene file.
#[derive(Debug, Clone)]
pub struct LoadedScene {
    pub graph: NodeGraph,
    pub shapes: ShapeSet,
    pub camera: FrameCamera,
    pub light: Option<DirectionalLight>,
}

impl ShapeDesc {
    fn to_shape(&self) -> Shape {
        Shape::new(self.shape_type, self.operation)
            .with_color(Vec4::from_array(self.color))
            .with_blend_strength(self.blend_strength)
            .with_fractal(self.power, self.iterations)
    }
}

impl CameraDesc {
    fn to_camera(&self) -> FrameCamera {
        let mut camera = FrameCamera::looking_at(
            Vec3::from_array(self.position),
            Vec3::from_array(self.target),
            self.width,
            self.height,
        );
        camera.fovy = self.fov.to_radians();
        camera
    }
}

impl SceneDesc {
    /// # Errors
    ///
    /// Returns the parse error for malformed TOML, unknown keys, or unknown
    /// shape types and operations.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Instantiates the described nodes and shapes.
    ///
    /// # Errors
    ///
    /// [`SceneError::DuplicateNode`] when two nodes share a name,
    /// [`SceneError::UnknownParent`] when a parent name matches no node and
    /// [`SceneError::HierarchyCycle`] when the parent links form a loop.
    pub fn build(&self) -> Result<LoadedScene, SceneError> {
        let mut graph = NodeGraph::new();
        let mut by_name = HashMap::with_capacity(self.nodes.len());
        let mut ids = Vec::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let id = graph.spawn(&node.name);
            if by_name.insert(node.name.as_str(), id).is_some() {
                return Err(SceneError::DuplicateNode(node.name.clone()));
            }
            graph.set_translation(id, Vec3::from_array(node.position))?;
            graph.set_rotation_degrees(id, Vec3::from_array(node.rotation))?;
            graph.set_scale(id, Vec3::from_array(node.scale))?;
            ids.push(id);
        }

        for (node, &id) in self.nodes.iter().zip(&ids) {
            let Some(parent_name) = &node.parent else {
                continue;
            };
            let parent = by_name
                .get(parent_name.as_str())
                .copied()
                .ok_or_else(|| SceneError::UnknownParent {
                    node: node.name.clone(),
                    parent: parent_name.clone(),
                })?;
            graph.set_parent(id, Some(parent))?;
        }

        let mut shapes = ShapeSet::new();
        for (node, &id) in self.nodes.iter().zip(&ids) {
            if let Some(shape) = &node.shape {
                shapes.insert(id, shape.to_shape());
            }
        }

        let light = self.light.as_ref().map(|light| DirectionalLight {
            direction: Vec3::from_array(light.direction),
            color: Vec3::from_array(light.color),
            intensity: light.intensity,
        });

        Ok(LoadedScene {
            graph,
            shapes,
            camera: self.camera.to_camera(),
            light,
        })
    }
}

/// Reads, parses and builds the scene at `path`.
///
/// # Errors
///
/// Fails if the file cannot be read, is not a valid scene description, or
/// describes an invalid hierarchy.
pub fn load_scene(path: &Path) -> Result<LoadedScene> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read scene {}", path.display()))?;
    let desc = SceneDesc::from_toml_str(&content)
        .with_context(|| format!("failed to parse scene {}", path.display()))?;
    let loaded = desc
        .build()
        .with_context(|| format!("invalid hierarchy in scene {}", path.display()))?;
    info!(
        "Loaded scene {:?}: {} nodes, {} shapes",
        path,
        loaded.graph.len(),
        loaded.shapes.len()
    );
    Ok(loaded)
}
