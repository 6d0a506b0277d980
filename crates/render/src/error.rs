use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("refusing to allocate an empty shape buffer")]
    EmptyAllocation,
    #[error("shape buffer of {bytes} bytes exceeds the binding limit of {limit} bytes")]
    BufferTooLarge { bytes: u64, limit: u64 },
    #[error("in-place update expects {expected} records, got {actual}")]
    RecordCountMismatch { expected: usize, actual: usize },
    #[error("no shape buffer has been packed")]
    NotPacked,
}
