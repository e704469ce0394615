use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use hotspot_engine::{CycleReport, Engine};

use crate::traits::{CheckpointStore, ClusterSink, MessageSource};

/// Drives the engine one period at a time: fetch the window after the
/// checkpoint, run the cycle, publish the clusters, advance the checkpoint.
pub struct Runner {
    engine: Engine,
    source: Arc<dyn MessageSource>,
    sink: Arc<dyn ClusterSink>,
    checkpoint_store: Arc<dyn CheckpointStore>,
    period: i64,
    checkpoint: i64,
    /// Set when a cycle failed after the engine already took in its window.
    poisoned: bool,
}

impl Runner {
    /// Resume from the persisted checkpoint, or from `start` on first run.
    pub async fn resume(
        engine: Engine,
        source: Arc<dyn MessageSource>,
        sink: Arc<dyn ClusterSink>,
        checkpoint_store: Arc<dyn CheckpointStore>,
        period: i64,
        start: i64,
    ) -> Result<Self> {
        let checkpoint = match checkpoint_store.load().await.context("Failed to load checkpoint")? {
            Some(boundary) => {
                info!(boundary, "Resuming from checkpoint");
                boundary
            }
            None => {
                info!(start, "No checkpoint stored, starting fresh");
                start
            }
        };

        Ok(Self {
            engine,
            source,
            sink,
            checkpoint_store,
            period,
            checkpoint,
            poisoned: false,
        })
    }

    pub fn checkpoint(&self) -> i64 {
        self.checkpoint
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Boundary of the next window to process.
    pub fn next_boundary(&self) -> i64 {
        self.checkpoint + self.period
    }

    /// Process the window `[checkpoint, checkpoint + period)`.
    ///
    /// The checkpoint only advances after the clusters were published, so a
    /// failed cycle is redone in full after a restart. A failure after the
    /// window reached the engine leaves this runner unusable: every later call
    /// fails instead of admitting the same window twice. Drop it and resume a
    /// fresh one from the stored checkpoint.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        if self.poisoned {
            bail!("Runner state is stale after a failed cycle at {}; resume a new runner", self.checkpoint);
        }
        let start = self.checkpoint;
        let end = self.next_boundary();

        let batch = self
            .source
            .fetch_window(start, end)
            .await
            .with_context(|| format!("Failed to fetch messages in [{start}, {end})"))?;

        self.poisoned = true;
        let outcome = self.engine.run_cycle(end, batch);

        self.sink
            .replace_clusters(&outcome.summaries)
            .await
            .context("Failed to publish clusters")?;
        self.checkpoint_store
            .save(end)
            .await
            .context("Failed to save checkpoint")?;
        self.checkpoint = end;
        self.poisoned = false;

        info!(report = %outcome.report, "Cycle complete");
        Ok(outcome.report)
    }

    /// Run every cycle whose window has fully elapsed by `now`.
    pub async fn run_pending(&mut self, now: i64) -> Result<Vec<CycleReport>> {
        let mut reports = Vec::new();
        while self.next_boundary() <= now {
            reports.push(self.run_cycle().await?);
        }
        if reports.len() > 1 {
            warn!(cycles = reports.len(), checkpoint = self.checkpoint, "Caught up on missed cycles");
        }
        Ok(reports)
    }

    /// Poll the wall clock until ctrl-c, running cycles as their windows close.
    pub async fn run(&mut self) -> Result<()> {
        info!(checkpoint = self.checkpoint, period = self.period, "Runner started");
        loop {
            self.run_pending(chrono::Utc::now().timestamp()).await?;

            let wait = (self.next_boundary() - chrono::Utc::now().timestamp()).max(1) as u64;
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!(checkpoint = self.checkpoint, "Shutdown requested");
                    return Ok(());
                }
                _ = tokio::time::sleep(Duration::from_secs(wait)) => {}
            }
        }
    }
}
