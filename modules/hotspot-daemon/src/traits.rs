// Seams between the cycle runner and its storage.
//
// The runner only sees these traits, so it can be driven by the in-memory
// doubles in `testing` without a database. Postgres failures are classified
// as `HotspotError` before they reach the runner.

use anyhow::Result;
use async_trait::async_trait;

use hotspot_common::{ClusterSummary, HotspotError, RawMessage};
use hotspot_store::{PgCheckpointStore, PgClusterSink, PgMessageSource};

#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Messages with `start <= time < end`, oldest first.
    async fn fetch_window(&self, start: i64, end: i64) -> Result<Vec<RawMessage>>;
}

#[async_trait]
pub trait ClusterSink: Send + Sync {
    /// Atomically replace the published cluster set.
    async fn replace_clusters(&self, summaries: &[ClusterSummary]) -> Result<()>;
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self) -> Result<Option<i64>>;
    async fn save(&self, boundary: i64) -> Result<()>;
}

#[async_trait]
impl MessageSource for PgMessageSource {
    async fn fetch_window(&self, start: i64, end: i64) -> Result<Vec<RawMessage>> {
        Ok(self.fetch_window(start, end).await.map_err(HotspotError::from)?)
    }
}

#[async_trait]
impl ClusterSink for PgClusterSink {
    async fn replace_clusters(&self, summaries: &[ClusterSummary]) -> Result<()> {
        Ok(self.replace_clusters(summaries).await.map_err(HotspotError::from)?)
    }
}

#[async_trait]
impl CheckpointStore for PgCheckpointStore {
    async fn load(&self) -> Result<Option<i64>> {
        Ok(self.load().await.map_err(HotspotError::from)?)
    }

    async fn save(&self, boundary: i64) -> Result<()> {
        Ok(self.save(boundary).await.map_err(HotspotError::from)?)
    }
}
