use crate::message::{MessageId, Messages};
use crate::plot::{PlotEntry, ReachabilityPlot};

/// Message ids of one contiguous low-reachability run, in plot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub members: Vec<MessageId>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Cuts the reachability plot into clusters.
pub struct ClusterExtractor {
    threshold: f64,
    min_size: usize,
}

impl ClusterExtractor {
    pub fn new(threshold: f64, min_size: usize) -> Self {
        Self { threshold, min_size }
    }

    /// A run opens at the first entry with reachability `<= threshold` and
    /// closes at the next entry above it or at the end of the plot. Runs with
    /// more than `min_size` members are kept. Delimiters always close a run.
    pub fn extract(&self, plot: &ReachabilityPlot, arena: &Messages) -> Vec<Cluster> {
        let mut clusters = Vec::new();
        let mut run: Vec<MessageId> = Vec::new();

        for entry in plot.entries() {
            let below = match entry {
                PlotEntry::Delimiter => false,
                PlotEntry::Message(_) => plot.reachability(*entry, arena) <= self.threshold,
            };

            match (below, entry) {
                (true, PlotEntry::Message(id)) => run.push(*id),
                _ => self.close(&mut run, &mut clusters),
            }
        }
        self.close(&mut run, &mut clusters);

        clusters
    }

    fn close(&self, run: &mut Vec<MessageId>, clusters: &mut Vec<Cluster>) {
        let members = std::mem::take(run);
        if members.len() > self.min_size {
            clusters.push(Cluster { members });
        }
    }
}
