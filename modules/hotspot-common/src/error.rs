use thiserror::Error;

/// Result type alias for hotspot operations.
pub type Result<T> = std::result::Result<T, HotspotError>;

#[derive(Error, Debug)]
pub enum HotspotError {
    /// Missing or invalid tunable. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// One ingested row could not be used. The row is dropped, the cycle continues.
    #[error("Input data error: {0}")]
    InputData(String),

    /// A shadow table from an aborted cycle is still present.
    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    /// Source or sink unreachable. Not retried.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl HotspotError {
    /// True for errors that only invalidate a single input row.
    pub fn is_input_error(&self) -> bool {
        matches!(self, HotspotError::InputData(_))
    }
}
