//! Scene-side data model for the SDF raymarcher.
//!
//! Shapes are components attached to entities of a host scene graph. The
//! graph itself stays external and is reached through the [`SceneGraph`]
//! trait; [`NodeGraph`] is a small in-memory implementation. [`collect`]
//! produces the fold-ordered shape list that the render crate packs into a
//! GPU buffer.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod collector;
pub mod error;
pub mod graph;
pub mod shape;
pub mod types;

pub use collector::{collect, effective_scale, validate_fold_order, ResolvedShape};
pub use error::{FoldOrderError, SceneError};
pub use graph::{Node, NodeGraph, SceneGraph, WorldTransform};
pub use shape::{Shape, ShapeSet};
pub use types::{EntityId, Operation, ShapeType};
