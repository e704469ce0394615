use tracing::debug;

use crate::graph::NeighborGraph;
use crate::message::{MessageId, Messages};

/// Core-distance and reachability maintenance for dirty messages.
///
/// Non-core objects carry `core_distance = epsilon + 1`; noise carries
/// `reachability = epsilon + 1`.
pub struct OpticsIndex {
    epsilon: f64,
    min_pts: usize,
}

impl OpticsIndex {
    pub fn new(epsilon: f64, min_pts: usize) -> Self {
        Self {
            epsilon,
            min_pts: min_pts.max(1),
        }
    }

    pub fn noise(&self) -> f64 {
        self.epsilon + 1.0
    }

    /// Drain the dirty work-list and recompute those messages only.
    ///
    /// Phase one settles every core distance before phase two computes any
    /// reachability, since reachability reads the neighbors' core distances.
    /// Returns how many messages were recomputed.
    pub fn recompute(&self, graph: &mut NeighborGraph, arena: &mut Messages) -> usize {
        let work: Vec<MessageId> = graph
            .take_dirty()
            .into_iter()
            .filter(|id| arena.contains(*id))
            .collect();

        for id in &work {
            let core = self.core_distance(arena, *id);
            if let Some(message) = arena.get_mut(*id) {
                message.core_distance = core;
            }
        }

        for id in &work {
            let reachability = self.smallest_reachability(arena, *id);
            if let Some(message) = arena.get_mut(*id) {
                message.reachability = reachability;
            }
        }

        debug!(recomputed = work.len(), "OPTICS distances refreshed");
        work.len()
    }

    /// Distance of the `min_pts`-th closest accepted neighbor, or the noise
    /// marker when there are fewer than `min_pts` neighbors.
    pub fn core_distance(&self, arena: &Messages, id: MessageId) -> f64 {
        arena
            .get(id)
            .and_then(|m| m.neighbors().nth(self.min_pts - 1))
            .map(|n| n.distance)
            .unwrap_or_else(|| self.noise())
    }

    /// Smallest `max(d(m, q), core(q))` over core neighbors `q`.
    pub fn smallest_reachability(&self, arena: &Messages, id: MessageId) -> f64 {
        let Some(message) = arena.get(id) else {
            return self.noise();
        };

        let mut smallest = self.noise();
        for neighbor in message.neighbors() {
            let Some(q) = arena.get(neighbor.id) else {
                continue;
            };
            if !q.is_core(self.epsilon) {
                continue;
            }
            let reachability = neighbor.distance.max(q.core_distance);
            if reachability < smallest {
                smallest = reachability;
            }
        }
        smallest
    }
}
