//! # Raymarch runtime
//!
//! Loads a scene described in TOML, keeps the SDF raymarcher's `_Shapes`
//! buffer in step with it every frame and hot-reloads the file on change.
//!
//! - [`config`]: runtime settings (`raymarch.toml`)
//! - [`scene_file`]: scene description format and its conversion into a
//!   [`scene::NodeGraph`] plus [`scene::ShapeSet`]
//! - [`animation`]: procedural motion used to exercise in-place updates

pub mod animation;
pub mod config;
pub mod scene_file;

pub use render;
pub use scene;
