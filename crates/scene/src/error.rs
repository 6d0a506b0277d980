use thiserror::Error;

use crate::types::EntityId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),
    #[error("parenting {child:?} under {parent:?} would create a cycle")]
    HierarchyCycle { child: EntityId, parent: EntityId },
    #[error("node '{node}' names unknown parent '{parent}'")]
    UnknownParent { node: String, parent: String },
    #[error("node name '{0}' is used more than once")]
    DuplicateNode(String),
}

/// Raised when a record sequence breaks the parent-then-children fold contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("record {index} declares {num_children} children but only {available} well-formed records follow")]
pub struct FoldOrderError {
    pub index: usize,
    pub num_children: u32,
    pub available: usize,
}
