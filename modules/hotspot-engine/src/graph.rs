//! Symmetric neighbor bookkeeping between messages in the arena.
//!
//! Messages reference each other by [`MessageId`] only. Every mutation that can
//! change a message's core or reachability distance puts it on the dirty
//! work-list, which [`crate::optics::OpticsIndex`] drains.

use std::collections::BTreeSet;

use crate::message::{Message, MessageId, Messages, Neighbor};

pub struct NeighborGraph {
    epsilon: f64,
    dirty: BTreeSet<MessageId>,
}

impl NeighborGraph {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            dirty: BTreeSet::new(),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Cache `distance` in both messages. Within the acceptance radius the
    /// pair also becomes mutual neighbors and both are marked dirty.
    pub fn record_pair(&mut self, arena: &mut Messages, a: MessageId, b: MessageId, distance: f64) {
        if a == b || !arena.contains(a) || !arena.contains(b) {
            return;
        }
        let accepted = distance <= self.epsilon;

        for (this, other) in [(a, b), (b, a)] {
            if let Some(message) = arena.get_mut(this) {
                message.distances.insert(other, distance);
                if accepted {
                    message.neighbors.insert(Neighbor { distance, id: other });
                }
            }
        }

        if accepted {
            self.dirty.insert(a);
            self.dirty.insert(b);
        }
    }

    /// Detach a message that has already been taken out of the arena: drop the
    /// one matching `(distance, id)` entry from every neighbor, forget its cached
    /// distances, and mark former neighbors dirty. Entries that are already gone
    /// are skipped, so calling this twice or in any order is harmless.
    pub fn remove(&mut self, arena: &mut Messages, removed: &Message) {
        let key = |distance: f64| Neighbor {
            distance,
            id: removed.id,
        };

        for neighbor in &removed.neighbors {
            if let Some(other) = arena.get_mut(neighbor.id) {
                if !other.neighbors.remove(&key(neighbor.distance)) {
                    // Distances are cached symmetrically, but fall back to a scan
                    // rather than leave a dangling entry.
                    other.neighbors.retain(|n| n.id != removed.id);
                }
                self.dirty.insert(neighbor.id);
            }
        }

        for peer in removed.distances.keys() {
            if let Some(other) = arena.get_mut(*peer) {
                other.distances.remove(&removed.id);
            }
        }

        self.dirty.remove(&removed.id);
    }

    pub fn mark_dirty(&mut self, id: MessageId) {
        self.dirty.insert(id);
    }

    pub fn is_dirty(&self, id: MessageId) -> bool {
        self.dirty.contains(&id)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Hand the current work-list to the caller, leaving it empty.
    pub fn take_dirty(&mut self) -> BTreeSet<MessageId> {
        std::mem::take(&mut self.dirty)
    }
}

/// Verify the neighbor relation is symmetric across the whole arena.
/// Returns the first offending pair, if any.
pub fn find_asymmetry(arena: &Messages) -> Option<(MessageId, MessageId)> {
    for message in arena.iter() {
        for neighbor in message.neighbors() {
            let back = arena
                .get(neighbor.id)
                .map(|other| other.neighbors.contains(&Neighbor { distance: neighbor.distance, id: message.id }))
                .unwrap_or(false);
            if !back {
                return Some((message.id, neighbor.id));
            }
        }
    }
    None
}
