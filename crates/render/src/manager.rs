//! Scene management and GPU buffer updates
//!
//! [`SceneManager`] runs one collect/pack/bind cycle per frame: it collects
//! the shapes present in the scene graph, brings the `_Shapes` buffer up to
//! date through the packer, rebinds it when it was reallocated or the
//! binding may have missed the last bind, and uploads the frame uniforms.

use scene::{collect, validate_fold_order, EntityId, SceneGraph, Shape, ShapeSet};
use tracing::{debug, warn};

use crate::backend::ShapeBufferBackend;
use crate::binding::ShapeBinding;
use crate::error::RenderError;
use crate::gpu_types::FrameUniforms;
use crate::packer::{BufferState, ShapeBufferPacker, SyncOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The binding was not ready; nothing was collected or uploaded.
    Skipped,
    Synced(SyncOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub status: FrameStatus,
    /// Records visible to the shader after this frame.
    pub shape_count: usize,
}

/// Per-frame driver that keeps the shader's view of the scene current.
pub struct SceneManager<B: ShapeBufferBackend> {
    packer: ShapeBufferPacker<B>,
    scene_changed: bool,
    /// The binding may not hold the current buffer and count.
    needs_rebind: bool,
    frame: u64,
}

impl<B: ShapeBufferBackend> SceneManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            packer: ShapeBufferPacker::new(backend),
            scene_changed: true,
            needs_rebind: true,
            frame: 0,
        }
    }

    pub fn packer(&self) -> &ShapeBufferPacker<B> {
        &self.packer
    }

    pub fn packer_mut(&mut self) -> &mut ShapeBufferPacker<B> {
        &mut self.packer
    }

    /// Forces a full repack on the next frame.
    pub fn notify_scene_changed(&mut self) {
        self.scene_changed = true;
    }

    /// Rebinds the current buffer on the next ready frame. Call after
    /// swapping or recreating the shader binding.
    pub fn notify_binding_changed(&mut self) {
        self.needs_rebind = true;
    }

    /// Registers `shape` on `entity` and schedules a repack.
    pub fn add_shape(&mut self, shapes: &mut ShapeSet, entity: EntityId, shape: Shape) {
        shapes.insert(entity, shape);
        self.notify_scene_changed();
    }

    /// Removes the shape on `entity`, scheduling a repack if there was one.
    pub fn remove_shape(&mut self, shapes: &mut ShapeSet, entity: EntityId) -> Option<Shape> {
        let removed = shapes.remove(entity);
        if removed.is_some() {
            self.notify_scene_changed();
        }
        removed
    }

    /// Runs one frame.
    ///
    /// Skips the frame (no collection, no upload) while `binding` is not
    /// ready; a pending scene change stays pending until a frame runs. The
    /// first ready frame after a skip rebinds `_Shapes` even if the buffer
    /// was not reallocated.
    ///
    /// # Errors
    ///
    /// Propagates allocation failures. The binding is then pointed at an
    /// empty shape set so it never keeps a released buffer.
    pub fn frame<G, S>(
        &mut self,
        shapes: &mut ShapeSet,
        graph: &G,
        binding: &mut S,
        uniforms: &FrameUniforms,
    ) -> Result<FrameReport, RenderError>
    where
        G: SceneGraph + ?Sized,
        S: ShapeBinding<B::Buffer> + ?Sized,
    {
        self.frame += 1;
        if !binding.is_ready() {
            debug!("Frame {}: shader binding not ready, skipping", self.frame);
            self.needs_rebind = true;
            return Ok(FrameReport {
                frame: self.frame,
                status: FrameStatus::Skipped,
                shape_count: self.packer.count(),
            });
        }

        let resolved = collect(shapes, graph);
        debug_assert!(validate_fold_order(&resolved).is_ok());

        let result = if self.scene_changed {
            self.packer.pack(&resolved)
        } else {
            self.packer.sync(&resolved)
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Frame {}: shape buffer upload failed: {e}", self.frame);
                binding.bind_shapes(None, 0);
                self.needs_rebind = true;
                return Err(e);
            }
        };
        self.scene_changed = false;

        let count = self.packer.count();
        if outcome.reallocated() || self.needs_rebind {
            binding.bind_shapes(self.packer.buffer(), u32::try_from(count).unwrap_or(u32::MAX));
            self.needs_rebind = false;
        }
        binding.bind_frame(uniforms);
        self.packer.backend_mut().flush();

        if self.packer.state() == BufferState::Empty && outcome.reallocated() {
            debug!("Frame {}: scene has no shapes", self.frame);
        }
        Ok(FrameReport {
            frame: self.frame,
            status: FrameStatus::Synced(outcome),
            shape_count: count,
        })
    }

    /// Releases the shape buffer and points `binding` at an empty shape set,
    /// so it never holds a released buffer. The next frame repacks from
    /// scratch.
    pub fn shutdown<S>(&mut self, binding: &mut S)
    where
        S: ShapeBinding<B::Buffer> + ?Sized,
    {
        self.packer.release();
        binding.bind_shapes(None, 0);
        self.scene_changed = true;
        self.needs_rebind = true;
        debug!("Shape buffer released, binding cleared");
    }
}
