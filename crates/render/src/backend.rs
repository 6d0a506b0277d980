//! Buffer backends the packer allocates and writes through.
//!
//! [`HostBackend`] keeps buffers in host memory. It backs headless runs and
//! tests, and records every allocation, release and write so the buffer
//! lifecycle can be checked.

use std::collections::HashSet;

use crate::error::RenderError;
use crate::gpu_types::ShapeGpu;
use crate::layout::SHAPE_RECORD_SIZE;

/// Allocation and upload primitives for the `_Shapes` buffer.
///
/// `release_buffer` takes the buffer by value: once released, a handle can
/// neither be written nor released again.
pub trait ShapeBufferBackend {
    type Buffer;

    /// Allocates a buffer initialised with `contents`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::EmptyAllocation`] for empty contents and
    /// [`RenderError::BufferTooLarge`] when the device cannot bind the result.
    fn create_buffer(&mut self, label: &str, contents: &[u8]) -> Result<Self::Buffer, RenderError>;

    /// Overwrites `bytes.len()` bytes at `offset`.
    fn write_buffer(&mut self, buffer: &mut Self::Buffer, offset: u64, bytes: &[u8]);

    fn release_buffer(&mut self, buffer: Self::Buffer);

    /// Submits queued writes. Called once at the end of every frame.
    fn flush(&mut self) {}
}

/// Host-memory stand-in for a GPU structured buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct HostBuffer {
    id: u64,
    bytes: Vec<u8>,
}

impl HostBuffer {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decodes the buffer contents back into records.
    #[must_use]
    pub fn records(&self) -> Vec<ShapeGpu> {
        self.bytes
            .chunks_exact(SHAPE_RECORD_SIZE)
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackendStats {
    pub allocations: u64,
    pub releases: u64,
    pub writes: u64,
    pub bytes_written: u64,
    pub flushes: u64,
}

/// One call to [`ShapeBufferBackend::write_buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRecord {
    pub buffer: u64,
    pub offset: u64,
    pub len: usize,
}

#[derive(Debug, Default)]
pub struct HostBackend {
    next_id: u64,
    live: HashSet<u64>,
    stats: BackendStats,
    writes: Vec<WriteRecord>,
    limit: Option<u64>,
}

impl HostBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects allocations above `bytes`, like a device binding limit.
    #[must_use]
    pub fn with_limit(mut self, bytes: u64) -> Self {
        self.limit = Some(bytes);
        self
    }

    #[must_use]
    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Buffers allocated and not yet released.
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn writes(&self) -> &[WriteRecord] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }
}

impl ShapeBufferBackend for HostBackend {
    type Buffer = HostBuffer;

    fn create_buffer(&mut self, label: &str, contents: &[u8]) -> Result<HostBuffer, RenderError> {
        if contents.is_empty() {
            return Err(RenderError::EmptyAllocation);
        }
        let bytes = contents.len() as u64;
        if let Some(limit) = self.limit.filter(|limit| bytes > *limit) {
            return Err(RenderError::BufferTooLarge { bytes, limit });
        }

        self.next_id += 1;
        self.live.insert(self.next_id);
        self.stats.allocations += 1;
        tracing::debug!("Allocated host buffer '{label}' #{} ({bytes} bytes)", self.next_id);
        Ok(HostBuffer {
            id: self.next_id,
            bytes: contents.to_vec(),
        })
    }

    fn write_buffer(&mut self, buffer: &mut HostBuffer, offset: u64, bytes: &[u8]) {
        let Ok(start) = usize::try_from(offset) else {
            return;
        };
        let end = start + bytes.len();
        if end > buffer.bytes.len() {
            tracing::error!(
                "Write of {} bytes at {offset} overruns host buffer #{} ({} bytes)",
                bytes.len(),
                buffer.id,
                buffer.bytes.len()
            );
            return;
        }
        buffer.bytes[start..end].copy_from_slice(bytes);
        self.stats.writes += 1;
        self.stats.bytes_written += bytes.len() as u64;
        self.writes.push(WriteRecord {
            buffer: buffer.id,
            offset,
            len: bytes.len(),
        });
    }

    fn release_buffer(&mut self, buffer: HostBuffer) {
        if self.live.remove(&buffer.id) {
            self.stats.releases += 1;
        } else {
            tracing::error!("Host buffer #{} released but was never live", buffer.id);
        }
    }

    fn flush(&mut self) {
        self.stats.flushes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allocation_is_rejected() {
        let mut backend = HostBackend::new();
        assert_eq!(
            backend.create_buffer("shapes", &[]),
            Err(RenderError::EmptyAllocation)
        );
        assert_eq!(backend.stats().allocations, 0);
    }

    #[test]
    fn limit_is_enforced() {
        let mut backend = HostBackend::new().with_limit(80);
        assert!(backend.create_buffer("shapes", &[0u8; 80]).is_ok());
        assert_eq!(
            backend.create_buffer("shapes", &[0u8; 160]),
            Err(RenderError::BufferTooLarge { bytes: 160, limit: 80 })
        );
    }

    #[test]
    fn writes_land_at_offset() {
        let mut backend = HostBackend::new();
        let mut buffer = backend.create_buffer("shapes", &[0u8; 8]).unwrap();
        backend.write_buffer(&mut buffer, 4, &[1, 2, 3, 4]);
        assert_eq!(buffer.bytes(), &[0, 0, 0, 0, 1, 2, 3, 4]);

        // Overruns are dropped.
        backend.write_buffer(&mut buffer, 6, &[9, 9, 9, 9]);
        assert_eq!(buffer.bytes(), &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(backend.stats().writes, 1);

        backend.release_buffer(buffer);
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.stats().releases, 1);
    }
}
