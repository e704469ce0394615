use hotspot_common::HotspotError;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Shadow table conflict: {0}")]
    Conflict(String),

    #[error("Timestamp out of range: {0}")]
    Timestamp(i64),
}

impl From<StoreError> for HotspotError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => HotspotError::StorageConflict(msg),
            StoreError::Timestamp(secs) => HotspotError::InputData(format!("timestamp out of range: {secs}")),
            other => HotspotError::StorageUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_conflicts_map_to_storage_conflict() {
        let err: HotspotError = StoreError::Conflict("events_new exists".into()).into();
        assert!(matches!(err, HotspotError::StorageConflict(msg) if msg == "events_new exists"));
    }

    #[test]
    fn database_failures_map_to_storage_unavailable() {
        let err: HotspotError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, HotspotError::StorageUnavailable(_)));
    }

    #[test]
    fn bad_timestamps_map_to_input_data() {
        let err: HotspotError = StoreError::Timestamp(i64::MAX).into();
        assert!(err.is_input_error());
    }
}
