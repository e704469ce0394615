//! Reachability plot: non-noise messages ordered into density-connected trees.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap};

use crate::message::{Message, MessageId, Messages};

/// One slot in the plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotEntry {
    /// Separates two independent traversal trees.
    Delimiter,
    Message(MessageId),
}

#[derive(Debug, Clone, Default)]
pub struct ReachabilityPlot {
    entries: Vec<PlotEntry>,
    delimiter_reachability: f64,
}

impl ReachabilityPlot {
    pub fn entries(&self) -> &[PlotEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of traversal trees (one delimiter opens each).
    pub fn trees(&self) -> usize {
        self.entries.iter().filter(|e| matches!(e, PlotEntry::Delimiter)).count()
    }

    /// Message ids in plot order, delimiters skipped.
    pub fn message_ids(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.entries.iter().filter_map(|e| match e {
            PlotEntry::Message(id) => Some(*id),
            PlotEntry::Delimiter => None,
        })
    }

    /// Reachability of a plot entry. Delimiters sit above both the acceptance
    /// radius and the cluster threshold.
    pub fn reachability(&self, entry: PlotEntry, arena: &Messages) -> f64 {
        match entry {
            PlotEntry::Delimiter => self.delimiter_reachability,
            PlotEntry::Message(id) => arena
                .get(id)
                .map(|m| m.reachability)
                .unwrap_or(self.delimiter_reachability),
        }
    }
}

/// Deterministic ordering key: smallest reachability first, then lowest grid
/// coordinate, earliest arrival, earliest admission.
#[derive(Debug, Clone, Copy)]
struct OrderKey {
    reachability: f64,
    x: usize,
    y: usize,
    time: i64,
    id: MessageId,
}

impl OrderKey {
    fn of(message: &Message) -> Self {
        Self {
            reachability: message.reachability,
            x: message.cell.x,
            y: message.cell.y,
            time: message.time,
            id: message.id,
        }
    }
}

impl PartialEq for OrderKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderKey {}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.reachability
            .total_cmp(&other.reachability)
            .then_with(|| self.x.cmp(&other.x))
            .then_with(|| self.y.cmp(&other.y))
            .then_with(|| self.time.cmp(&other.time))
            .then_with(|| self.id.cmp(&other.id))
    }
}

pub struct PlotBuilder {
    epsilon: f64,
    delimiter_reachability: f64,
}

impl PlotBuilder {
    /// `cluster_threshold` only fixes the delimiter's reachability so that it
    /// can never fall inside a cluster run.
    pub fn new(epsilon: f64, cluster_threshold: f64) -> Self {
        Self {
            epsilon,
            delimiter_reachability: epsilon.max(cluster_threshold) + 1.0,
        }
    }

    pub fn delimiter_reachability(&self) -> f64 {
        self.delimiter_reachability
    }

    pub fn build(&self, arena: &Messages) -> ReachabilityPlot {
        let mut unprocessed: BTreeSet<OrderKey> = arena
            .iter()
            .filter(|m| m.reachability <= self.epsilon)
            .map(OrderKey::of)
            .collect();

        let mut entries = Vec::with_capacity(unprocessed.len() + 1);
        let mut frontier: BinaryHeap<Reverse<OrderKey>> = BinaryHeap::new();

        while let Some(seed) = unprocessed.first().copied() {
            entries.push(PlotEntry::Delimiter);
            frontier.push(Reverse(seed));

            while let Some(Reverse(key)) = frontier.pop() {
                // The same message can be queued from several core neighbors.
                if !unprocessed.remove(&key) {
                    continue;
                }
                entries.push(PlotEntry::Message(key.id));

                let Some(message) = arena.get(key.id) else {
                    continue;
                };
                // Border objects are acquired but never expanded through.
                if !message.is_core(self.epsilon) {
                    continue;
                }
                for neighbor in message.neighbors() {
                    if let Some(other) = arena.get(neighbor.id) {
                        let other_key = OrderKey::of(other);
                        if unprocessed.contains(&other_key) {
                            frontier.push(Reverse(other_key));
                        }
                    }
                }
            }
        }

        ReachabilityPlot {
            entries,
            delimiter_reachability: self.delimiter_reachability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NeighborGraph;
    use crate::grid::CellCoord;
    use crate::optics::OpticsIndex;
    use std::collections::HashMap;

    fn blank(id: u64) -> Message {
        Message {
            id: MessageId(id),
            time: 100 + id as i64,
            lat: 0.0,
            lon: 0.0,
            cell: CellCoord { x: 0, y: 0 },
            words: BTreeSet::new(),
            author: format!("u{id}"),
            exact: false,
            text: String::new(),
            regional_rates: HashMap::new(),
            core_distance: 1.5,
            reachability: 1.5,
            distances: HashMap::new(),
            neighbors: BTreeSet::new(),
        }
    }

    fn clustered(n: u64, pairs: &[(u64, u64, f64)], min_pts: usize) -> Messages {
        let mut arena = Messages::default();
        let mut graph = NeighborGraph::new(0.5);
        for id in 1..=n {
            arena.insert(blank(id));
            graph.mark_dirty(MessageId(id));
        }
        for (a, b, d) in pairs {
            graph.record_pair(&mut arena, MessageId(*a), MessageId(*b), *d);
        }
        OpticsIndex::new(0.5, min_pts).recompute(&mut graph, &mut arena);
        arena
    }

    fn ids(plot: &ReachabilityPlot) -> Vec<Option<u64>> {
        plot.entries()
            .iter()
            .map(|e| match e {
                PlotEntry::Delimiter => None,
                PlotEntry::Message(id) => Some(id.0),
            })
            .collect()
    }

    #[test]
    fn empty_arena_gives_empty_plot() {
        let plot = PlotBuilder::new(0.5, 0.3).build(&Messages::default());
        assert!(plot.is_empty());
    }

    #[test]
    fn noise_is_left_out() {
        let arena = clustered(3, &[(1, 2, 0.1)], 1);
        let plot = PlotBuilder::new(0.5, 0.3).build(&arena);
        assert_eq!(plot.message_ids().count(), 2);
        assert!(!plot.message_ids().any(|id| id == MessageId(3)));
    }

    #[test]
    fn independent_components_are_separated_by_delimiters() {
        let arena = clustered(4, &[(1, 2, 0.1), (3, 4, 0.2)], 1);
        let plot = PlotBuilder::new(0.5, 0.3).build(&arena);

        assert_eq!(plot.trees(), 2);
        // Tighter pair seeds first.
        assert_eq!(ids(&plot), vec![None, Some(1), Some(2), None, Some(3), Some(4)]);
    }

    #[test]
    fn expansion_is_smallest_reachability_first() {
        // Star around 1 with min_pts = 1: reachabilities 2 -> 0.3, 3 -> 0.1, 4 -> 0.2.
        let arena = clustered(4, &[(1, 2, 0.3), (1, 3, 0.1), (1, 4, 0.2)], 1);
        let plot = PlotBuilder::new(0.5, 0.3).build(&arena);
        assert_eq!(ids(&plot), vec![None, Some(1), Some(3), Some(4), Some(2)]);
    }

    #[test]
    fn every_non_noise_message_appears_once() {
        let arena = clustered(
            6,
            &[(1, 2, 0.1), (2, 3, 0.1), (1, 3, 0.2), (4, 5, 0.3), (5, 6, 0.05)],
            1,
        );
        let plot = PlotBuilder::new(0.5, 0.3).build(&arena);
        let mut seen: Vec<_> = plot.message_ids().collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), plot.message_ids().count());
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn delimiter_reachability_exceeds_epsilon_and_threshold() {
        let builder = PlotBuilder::new(0.5, 1.25);
        assert_eq!(builder.delimiter_reachability(), 2.25);
        let plot = builder.build(&Messages::default());
        assert_eq!(plot.reachability(PlotEntry::Delimiter, &Messages::default()), 2.25);
    }
}
