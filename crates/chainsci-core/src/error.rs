#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: u64,
        len: u64,
    },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("worker pool: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn out_of_range(what: &'static str, index: u64, len: u64) -> Self {
        Self::OutOfRange { what, index, len }
    }
}

/// The `u32` number the next entry of a collection of `len` entries gets.
///
/// `u32::MAX` itself is never handed out, so a full collection's length
/// still fits in a `u32`.
pub(crate) fn next_number(what: &'static str, len: usize) -> Result<u32, CoreError> {
    u32::try_from(len)
        .ok()
        .filter(|&n| n < u32::MAX)
        .ok_or_else(|| CoreError::Storage(format!("{what} numbering exhausted at {len} entries")))
}
