use std::fmt;
use std::time::Instant;

use hotspot_common::{ClusterSummary, FileConfig, RawMessage, Result};
use tracing::{info, warn};

use crate::extract::{Cluster, ClusterExtractor};
use crate::graph::NeighborGraph;
use crate::grid::SpatialGrid;
use crate::message::{MessageId, Messages};
use crate::optics::OpticsIndex;
use crate::plot::{PlotBuilder, ReachabilityPlot};
use crate::store::MessageStore;
use crate::summary;

/// The clustering context: grid, message window, neighbor graph and the
/// OPTICS/extraction parameters. Built once at startup and mutated in place
/// by a single writer, one cycle at a time.
pub struct Engine {
    grid: SpatialGrid,
    store: MessageStore,
    graph: NeighborGraph,
    optics: OpticsIndex,
    plot_builder: PlotBuilder,
    extractor: ClusterExtractor,
    history: i64,
}

/// Counters for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub boundary: i64,
    pub admitted: usize,
    /// Messages with no tokens after cleaning.
    pub empty: usize,
    /// Messages dropped as malformed input.
    pub rejected: usize,
    pub evicted: usize,
    pub recomputed: usize,
    pub window: usize,
    pub plot_len: usize,
    pub trees: usize,
    pub clusters: usize,
    pub published: usize,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "boundary={} admitted={} empty={} rejected={} evicted={} recomputed={} window={} plot={} trees={} clusters={} published={}",
            self.boundary,
            self.admitted,
            self.empty,
            self.rejected,
            self.evicted,
            self.recomputed,
            self.window,
            self.plot_len,
            self.trees,
            self.clusters,
            self.published
        )
    }
}

/// Everything one cycle produced.
pub struct CycleOutcome {
    pub report: CycleReport,
    pub plot: ReachabilityPlot,
    pub clusters: Vec<Cluster>,
    /// Multi-author clusters, summarised for the sink.
    pub summaries: Vec<ClusterSummary>,
}

impl Engine {
    pub fn new(config: &FileConfig) -> Result<Self> {
        config.validate()?;
        let o = &config.optics;
        let grid = SpatialGrid::from_config(&config.grid)?;
        info!(
            width = grid.width(),
            height = grid.height(),
            cell_size = grid.cell_size(),
            epsilon = o.epsilon,
            min_pts = o.minimum_points,
            "Spatial grid built"
        );

        Ok(Self {
            grid,
            store: MessageStore::new(o.max_messages, o.epsilon),
            graph: NeighborGraph::new(o.epsilon),
            optics: OpticsIndex::new(o.epsilon, o.minimum_points),
            plot_builder: PlotBuilder::new(o.epsilon, o.reachability_threshold),
            extractor: ClusterExtractor::new(o.reachability_threshold, o.minimum_cluster_size),
            history: config.timing.history,
        })
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn graph(&self) -> &NeighborGraph {
        &self.graph
    }

    pub fn messages(&self) -> &Messages {
        self.store.messages()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn admit(&mut self, raw: &RawMessage) -> Result<Option<MessageId>> {
        self.store.admit(raw, &mut self.grid, &mut self.graph)
    }

    /// Trim the window back to capacity, oldest first.
    pub fn evict_overflow(&mut self) -> usize {
        self.store.evict_oldest(&mut self.grid, &mut self.graph)
    }

    /// Drop messages that fell out of the recall scope ending at `boundary`.
    pub fn evict_expired(&mut self, boundary: i64) -> usize {
        self.store
            .evict_before(boundary - self.history, &mut self.grid, &mut self.graph)
    }

    /// Recompute core and reachability distances of dirty messages only.
    pub fn recompute(&mut self) -> usize {
        self.optics.recompute(&mut self.graph, self.store.messages_mut())
    }

    pub fn plot(&self) -> ReachabilityPlot {
        self.plot_builder.build(self.store.messages())
    }

    pub fn extract(&self, plot: &ReachabilityPlot) -> Vec<Cluster> {
        self.extractor.extract(plot, self.store.messages())
    }

    /// Run one full cycle for the window ending at `boundary`: expire, admit,
    /// trim, recompute, plot, extract and summarise. Malformed messages are
    /// skipped; nothing in a cycle aborts it.
    pub fn run_cycle(&mut self, boundary: i64, batch: impl IntoIterator<Item = RawMessage>) -> CycleOutcome {
        let mut report = CycleReport {
            boundary,
            ..Default::default()
        };

        let started = Instant::now();
        report.evicted += self.evict_expired(boundary);
        for raw in batch {
            match self.admit(&raw) {
                Ok(Some(_)) => report.admitted += 1,
                Ok(None) => report.empty += 1,
                Err(e) => {
                    warn!(author = raw.author.as_str(), time = raw.time, error = %e, "Skipping message");
                    report.rejected += 1;
                }
            }
        }
        report.evicted += self.evict_overflow();
        report.window = self.len();
        let admit_ms = started.elapsed().as_millis() as u64;

        let started = Instant::now();
        report.recomputed = self.recompute();
        let recompute_ms = started.elapsed().as_millis() as u64;

        let started = Instant::now();
        let plot = self.plot();
        report.plot_len = plot.len();
        report.trees = plot.trees();
        let plot_ms = started.elapsed().as_millis() as u64;

        let started = Instant::now();
        let clusters = self.extract(&plot);
        let summaries = summary::publishable(&clusters, self.store.messages());
        report.clusters = clusters.len();
        report.published = summaries.len();
        let extract_ms = started.elapsed().as_millis() as u64;

        info!(
            boundary,
            admitted = report.admitted,
            rejected = report.rejected,
            evicted = report.evicted,
            recomputed = report.recomputed,
            window = report.window,
            clusters = report.clusters,
            published = report.published,
            admit_ms,
            recompute_ms,
            plot_ms,
            extract_ms,
            "Cycle computed"
        );

        CycleOutcome {
            report,
            plot,
            clusters,
            summaries,
        }
    }
}
