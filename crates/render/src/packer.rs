//! Shape buffer packing
//!
//! Converts the collector's fold-ordered shapes into `_Shapes` records and
//! keeps one GPU buffer in step with them. A buffer is reallocated only when
//! the record count changes. Moving shapes only rewrites the position and
//! scale bytes of the records that moved; any other field change rewrites
//! that whole record in place.

use std::ops::Range;

use glam::Vec3;
use scene::ResolvedShape;
use tracing::debug;

use crate::backend::ShapeBufferBackend;
use crate::error::RenderError;
use crate::gpu_types::ShapeGpu;
use crate::layout::{record_offset, SHAPE_RECORD_SIZE, TRANSFORM_SPAN};

/// Squared distance under which a position or scale counts as unchanged.
pub const TRANSFORM_EPSILON_SQ: f32 = 1e-10;

/// Builds one record per shape, in order.
#[must_use]
pub fn pack_records(shapes: &[ResolvedShape]) -> Vec<ShapeGpu> {
    shapes.iter().map(ShapeGpu::from).collect()
}

#[must_use]
pub fn records_as_bytes(records: &[ShapeGpu]) -> &[u8] {
    bytemuck::cast_slice(records)
}

fn moved(previous: [f32; 3], current: Vec3) -> bool {
    (Vec3::from(previous) - current).length_squared() >= TRANSFORM_EPSILON_SQ
}

/// Copies current positions and scales into `records`.
///
/// Only records whose position or scale moved are touched. Returns their
/// indices. `shapes` and `records` are matched by index.
pub fn refresh_transforms(shapes: &[ResolvedShape], records: &mut [ShapeGpu]) -> Vec<usize> {
    let mut changed = Vec::new();
    for (index, (shape, record)) in shapes.iter().zip(records.iter_mut()).enumerate() {
        if moved(record.position, shape.position) || moved(record.scale, shape.scale) {
            record.position = shape.position.to_array();
            record.scale = shape.scale.to_array();
            changed.push(index);
        }
    }
    changed
}

/// Brings `records` in line with `shapes`, matched by index.
///
/// A record whose non-transform fields changed is replaced whole; one whose
/// position or scale moved gets only those two fields. Returns the index and
/// byte span (within the record) of every record touched.
pub fn refresh_records(
    shapes: &[ResolvedShape],
    records: &mut [ShapeGpu],
) -> Vec<(usize, Range<usize>)> {
    let mut changed = Vec::new();
    for (index, (shape, record)) in shapes.iter().zip(records.iter_mut()).enumerate() {
        let fresh = ShapeGpu::from(shape);
        if record.differs_beyond_transform(&fresh) {
            *record = fresh;
            changed.push((index, 0..SHAPE_RECORD_SIZE));
        } else if moved(record.position, shape.position) || moved(record.scale, shape.scale) {
            record.position = fresh.position;
            record.scale = fresh.scale;
            changed.push((index, TRANSFORM_SPAN));
        }
    }
    changed
}

/// Lifecycle of the packer's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Nothing packed yet.
    Uninitialized,
    /// Packed with zero shapes: no buffer exists and the shader sees a count of 0.
    Empty,
    /// A buffer holding `count` records is live.
    Packed { count: usize },
    /// The last buffer was released, or an allocation failed, and nothing
    /// replaced it.
    Released,
}

/// What a pack or sync did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The old buffer (if any) was released and a new one packed.
    Repacked { count: usize },
    /// `records` records had their transform rewritten in place.
    Updated { records: usize },
    /// Nothing changed, nothing uploaded.
    Unchanged,
}

impl SyncOutcome {
    /// True when the buffer handle changed and bindings must be refreshed.
    #[must_use]
    pub fn reallocated(&self) -> bool {
        matches!(self, SyncOutcome::Repacked { .. })
    }

    /// True when any bytes were sent to the device.
    #[must_use]
    pub fn uploaded(&self) -> bool {
        !matches!(self, SyncOutcome::Unchanged | SyncOutcome::Repacked { count: 0 })
    }
}

/// Owns the `_Shapes` buffer and the CPU copy of its records.
///
/// The buffer is released exactly once: before every reallocation, on
/// [`release`](Self::release) or when the packer is dropped.
pub struct ShapeBufferPacker<B: ShapeBufferBackend> {
    backend: B,
    buffer: Option<B::Buffer>,
    records: Vec<ShapeGpu>,
    state: BufferState,
    generation: u64,
}

impl<B: ShapeBufferBackend> ShapeBufferPacker<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            buffer: None,
            records: Vec::new(),
            state: BufferState::Uninitialized,
            generation: 0,
        }
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Record count the shader should be told about.
    pub fn count(&self) -> usize {
        match self.state {
            BufferState::Packed { count } => count,
            _ => 0,
        }
    }

    /// The live buffer, `None` unless [`BufferState::Packed`].
    pub fn buffer(&self) -> Option<&B::Buffer> {
        self.buffer.as_ref()
    }

    /// CPU copy of the packed records.
    pub fn records(&self) -> &[ShapeGpu] {
        &self.records
    }

    /// Incremented on every allocation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Releases the current buffer and packs `shapes` into a new one.
    ///
    /// Zero shapes allocate nothing and leave the packer [`BufferState::Empty`].
    ///
    /// # Errors
    ///
    /// Propagates allocation failures from the backend. The previous buffer,
    /// if any, is already released at that point and the state is
    /// [`BufferState::Released`].
    pub fn pack(&mut self, shapes: &[ResolvedShape]) -> Result<SyncOutcome, RenderError> {
        self.release();

        let records = pack_records(shapes);
        if records.is_empty() {
            self.state = BufferState::Empty;
            debug!("Packed empty shape list, no buffer allocated");
            return Ok(SyncOutcome::Repacked { count: 0 });
        }

        let buffer = match self.backend.create_buffer("shapes", records_as_bytes(&records)) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.state = BufferState::Released;
                return Err(e);
            }
        };
        let count = records.len();
        self.buffer = Some(buffer);
        self.records = records;
        self.generation += 1;
        self.state = BufferState::Packed { count };
        debug!("Packed {count} shape records (generation {})", self.generation);
        Ok(SyncOutcome::Repacked { count })
    }

    /// Rewrites position and scale of the records whose shape moved.
    ///
    /// Returns `true` when anything was uploaded. Valid only while the record
    /// count matches the packed one.
    ///
    /// # Errors
    ///
    /// [`RenderError::NotPacked`] before the first pack or after a release,
    /// [`RenderError::RecordCountMismatch`] when the shape count differs from
    /// the packed record count.
    pub fn update_positions(&mut self, shapes: &[ResolvedShape]) -> Result<bool, RenderError> {
        if !self.check_in_place(shapes.len())? {
            return Ok(false);
        }
        let changed: Vec<(usize, Range<usize>)> = refresh_transforms(shapes, &mut self.records)
            .into_iter()
            .map(|index| (index, TRANSFORM_SPAN))
            .collect();
        self.upload(&changed);
        Ok(!changed.is_empty())
    }

    /// Brings the buffer in line with `shapes` using the cheapest path.
    ///
    /// Repacks when nothing is packed yet or the count changed. Otherwise
    /// rewrites changed records in place: only position and scale for moved
    /// shapes, the whole record when any other field changed.
    ///
    /// # Errors
    ///
    /// Propagates allocation failures from [`pack`](Self::pack).
    pub fn sync(&mut self, shapes: &[ResolvedShape]) -> Result<SyncOutcome, RenderError> {
        let needs_repack = match self.state {
            BufferState::Uninitialized | BufferState::Released => true,
            BufferState::Empty => !shapes.is_empty(),
            BufferState::Packed { count } => count != shapes.len(),
        };
        if needs_repack {
            return self.pack(shapes);
        }
        if !self.check_in_place(shapes.len())? {
            return Ok(SyncOutcome::Unchanged);
        }

        let changed = refresh_records(shapes, &mut self.records);
        self.upload(&changed);
        match changed.len() {
            0 => Ok(SyncOutcome::Unchanged),
            records => Ok(SyncOutcome::Updated { records }),
        }
    }

    /// Releases the buffer, if any. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.backend.release_buffer(buffer);
            debug!("Released shape buffer (generation {})", self.generation);
            self.state = BufferState::Released;
        } else if self.state == BufferState::Empty {
            self.state = BufferState::Released;
        }
        self.records.clear();
    }

    /// Whether an in-place write of `len` records is valid. `Ok(false)` means
    /// there is nothing to write (empty and staying empty).
    fn check_in_place(&self, len: usize) -> Result<bool, RenderError> {
        match self.state {
            BufferState::Packed { count } if count == len => Ok(true),
            BufferState::Empty if len == 0 => Ok(false),
            BufferState::Packed { count } => Err(RenderError::RecordCountMismatch {
                expected: count,
                actual: len,
            }),
            BufferState::Empty => Err(RenderError::RecordCountMismatch {
                expected: 0,
                actual: len,
            }),
            BufferState::Uninitialized | BufferState::Released => Err(RenderError::NotPacked),
        }
    }

    /// Writes the given byte span of each listed record to the live buffer.
    fn upload(&mut self, changed: &[(usize, Range<usize>)]) {
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        for (index, span) in changed {
            let bytes = &bytemuck::bytes_of(&self.records[*index])[span.clone()];
            let offset = record_offset(*index) + span.start as u64;
            self.backend.write_buffer(buffer, offset, bytes);
        }
        if !changed.is_empty() {
            debug!("Rewrote {} shape records in place", changed.len());
        }
    }
}

impl<B: ShapeBufferBackend> Drop for ShapeBufferPacker<B> {
    fn drop(&mut self) {
        self.release();
    }
}
