// In-memory doubles for the storage traits.

use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use hotspot_common::{ClusterSummary, RawMessage};

use crate::traits::{CheckpointStore, ClusterSink, MessageSource};

/// Serves messages from a fixed list, filtered by window.
#[derive(Default)]
pub struct MockSource {
    messages: Vec<RawMessage>,
    /// Windows requested so far, in order.
    pub requested: Mutex<Vec<(i64, i64)>>,
}

impl MockSource {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self {
            messages,
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MessageSource for MockSource {
    async fn fetch_window(&self, start: i64, end: i64) -> Result<Vec<RawMessage>> {
        self.requested.lock().unwrap().push((start, end));
        let mut batch: Vec<RawMessage> = self
            .messages
            .iter()
            .filter(|m| m.time >= start && m.time < end)
            .cloned()
            .collect();
        batch.sort_by_key(|m| m.time);
        Ok(batch)
    }
}

/// Keeps every published cluster set. Fails while `fail` is set.
#[derive(Default)]
pub struct MockSink {
    pub published: Mutex<Vec<Vec<ClusterSummary>>>,
    pub fail: Mutex<bool>,
}

impl MockSink {
    pub fn latest(&self) -> Option<Vec<ClusterSummary>> {
        self.published.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ClusterSink for MockSink {
    async fn replace_clusters(&self, summaries: &[ClusterSummary]) -> Result<()> {
        if *self.fail.lock().unwrap() {
            bail!("sink unavailable");
        }
        self.published.lock().unwrap().push(summaries.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockCheckpoint {
    pub boundary: Mutex<Option<i64>>,
}

impl MockCheckpoint {
    pub fn at(boundary: i64) -> Self {
        Self {
            boundary: Mutex::new(Some(boundary)),
        }
    }
}

#[async_trait]
impl CheckpointStore for MockCheckpoint {
    async fn load(&self) -> Result<Option<i64>> {
        Ok(*self.boundary.lock().unwrap())
    }

    async fn save(&self, boundary: i64) -> Result<()> {
        *self.boundary.lock().unwrap() = Some(boundary);
        Ok(())
    }
}
