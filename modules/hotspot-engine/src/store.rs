use std::collections::{BTreeSet, HashMap};

use hotspot_common::{text, HotspotError, RawMessage, Result};
use tracing::debug;

use crate::graph::NeighborGraph;
use crate::grid::SpatialGrid;
use crate::message::{Message, MessageId, Messages, Neighbor};
use crate::similarity;

/// FIFO window of admitted messages. Owns the arena; the grid index and the
/// neighbor graph are updated alongside every admission and eviction.
pub struct MessageStore {
    arena: Messages,
    next_id: u64,
    capacity: usize,
    epsilon: f64,
}

impl MessageStore {
    pub fn new(capacity: usize, epsilon: f64) -> Self {
        Self {
            arena: Messages::default(),
            next_id: 0,
            capacity: capacity.max(1),
            epsilon,
        }
    }

    pub fn messages(&self) -> &Messages {
        &self.arena
    }

    pub(crate) fn messages_mut(&mut self) -> &mut Messages {
        &mut self.arena
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admit one raw message.
    ///
    /// Returns `Ok(None)` when nothing is left after cleaning, and
    /// [`HotspotError::InputData`] when the message cannot be placed on the grid.
    /// Regional word rates are taken from the grid before the message itself
    /// is indexed, and stay frozen afterwards.
    pub fn admit(
        &mut self,
        raw: &RawMessage,
        grid: &mut SpatialGrid,
        graph: &mut NeighborGraph,
    ) -> Result<Option<MessageId>> {
        raw.validate()?;
        let words: BTreeSet<String> = text::tokenize(&raw.text);
        if words.is_empty() {
            debug!(author = raw.author.as_str(), time = raw.time, "Dropping message with no tokens");
            return Ok(None);
        }
        let cell = grid.locate(raw.lat, raw.lon).ok_or_else(|| {
            HotspotError::InputData(format!("({}, {}) is outside the grid", raw.lat, raw.lon))
        })?;

        let regional_rates: HashMap<String, f64> = grid.regional_rates(cell, &words);

        let id = MessageId(self.next_id);
        self.next_id += 1;
        grid.insert(cell, id, &words);

        let mut candidates = BTreeSet::new();
        for word in &words {
            candidates.extend(grid.candidates_for(cell, word));
        }
        candidates.remove(&id);

        let noise = self.epsilon + 1.0;
        self.arena.insert(Message {
            id,
            time: raw.time,
            lat: raw.lat,
            lon: raw.lon,
            cell,
            words,
            author: raw.author.clone(),
            exact: raw.exact,
            text: text::clean(&raw.text).trim().to_string(),
            regional_rates,
            core_distance: noise,
            reachability: noise,
            distances: HashMap::new(),
            neighbors: BTreeSet::<Neighbor>::new(),
        });
        graph.mark_dirty(id);

        for other in candidates {
            let distance = match (self.arena.get(id), self.arena.get(other)) {
                (Some(a), Some(b)) if a.cached_distance(other).is_none() => {
                    similarity::distance(a, b, self.epsilon)
                }
                _ => continue,
            };
            graph.record_pair(&mut self.arena, id, other, distance);
        }

        Ok(Some(id))
    }

    /// Evict the earliest admitted messages until the window fits its capacity.
    pub fn evict_oldest(&mut self, grid: &mut SpatialGrid, graph: &mut NeighborGraph) -> usize {
        let mut evicted = 0;
        while self.arena.len() > self.capacity {
            let Some(oldest) = self.arena.oldest().map(|m| m.id) else {
                break;
            };
            if self.evict(oldest, grid, graph) {
                evicted += 1;
            }
        }
        evicted
    }

    /// Evict messages that arrived before `cutoff`, oldest first. Stops at the
    /// first message that is recent enough.
    pub fn evict_before(&mut self, cutoff: i64, grid: &mut SpatialGrid, graph: &mut NeighborGraph) -> usize {
        let mut evicted = 0;
        while let Some(oldest) = self.arena.oldest() {
            if oldest.time >= cutoff {
                break;
            }
            let id = oldest.id;
            if self.evict(id, grid, graph) {
                evicted += 1;
            }
        }
        evicted
    }

    fn evict(&mut self, id: MessageId, grid: &mut SpatialGrid, graph: &mut NeighborGraph) -> bool {
        let Some(message) = self.arena.remove(id) else {
            return false;
        };
        grid.remove(message.cell, id, &message.words);
        graph.remove(&mut self.arena, &message);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::find_asymmetry;
    use crate::grid::BoundingBox;

    fn grid() -> SpatialGrid {
        let bounds = BoundingBox {
            min_lat: 40.0,
            max_lat: 41.0,
            min_lon: -74.5,
            max_lon: -73.5,
        };
        SpatialGrid::build(bounds, 0.1, 0.1).unwrap()
    }

    fn raw(time: i64, text: &str, author: &str) -> RawMessage {
        RawMessage {
            time,
            lat: 40.75,
            lon: -73.95,
            text: text.into(),
            author: author.into(),
            exact: true,
        }
    }

    #[test]
    fn empty_messages_are_not_admitted() {
        let (mut grid, mut graph) = (grid(), NeighborGraph::new(0.5));
        let mut store = MessageStore::new(10, 0.5);
        let admitted = store.admit(&raw(1, "@user http://x.com", "a"), &mut grid, &mut graph).unwrap();
        assert!(admitted.is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn out_of_grid_messages_are_input_errors() {
        let (mut grid, mut graph) = (grid(), NeighborGraph::new(0.5));
        let mut store = MessageStore::new(10, 0.5);
        let mut far = raw(1, "fire downtown", "a");
        far.lat = 10.0;
        let err = store.admit(&far, &mut grid, &mut graph).unwrap_err();
        assert!(err.is_input_error());
        assert!(store.is_empty());
    }

    #[test]
    fn regional_rates_are_frozen_before_self_indexing() {
        let (mut grid, mut graph) = (grid(), NeighborGraph::new(0.5));
        let mut store = MessageStore::new(10, 0.5);
        let first = store.admit(&raw(1, "fire truck", "a"), &mut grid, &mut graph).unwrap().unwrap();
        let second = store.admit(&raw(2, "fire rain", "b"), &mut grid, &mut graph).unwrap().unwrap();

        let first = store.messages().get(first).unwrap();
        assert_eq!(first.regional_rates["fire"], 0.0);
        let second = store.messages().get(second).unwrap();
        assert_eq!(second.regional_rates["fire"], 1.0);
        assert_eq!(second.regional_rates["rain"], 0.0);
    }

    #[test]
    fn stored_text_is_cleaned() {
        let (mut grid, mut graph) = (grid(), NeighborGraph::new(0.5));
        let mut store = MessageStore::new(10, 0.5);
        let id = store
            .admit(&raw(1, "@bob Fire truck, Main St! http://x.com/1", "a"), &mut grid, &mut graph)
            .unwrap()
            .unwrap();
        assert_eq!(store.messages().get(id).unwrap().text, "Fire truck Main St");
    }

    #[test]
    fn new_messages_are_dirty() {
        let (mut grid, mut graph) = (grid(), NeighborGraph::new(0.5));
        let mut store = MessageStore::new(10, 0.5);
        let id = store.admit(&raw(1, "fire", "a"), &mut grid, &mut graph).unwrap().unwrap();
        assert!(graph.is_dirty(id));
    }

    #[test]
    fn capacity_eviction_is_fifo_and_clean() {
        let (mut grid, mut graph) = (grid(), NeighborGraph::new(0.5));
        let mut store = MessageStore::new(3, 0.5);
        for i in 0..20 {
            store.admit(&raw(i, &format!("noise{i} filler{i} pad{i}"), "x"), &mut grid, &mut graph).unwrap();
        }
        let ids: Vec<_> = (0..4)
            .map(|i| {
                store
                    .admit(&raw(100 + i, "fire truck main street", &format!("u{i}")), &mut grid, &mut graph)
                    .unwrap()
                    .unwrap()
            })
            .collect();
        assert!(store.messages().get(ids[3]).unwrap().has_neighbor(ids[0]));

        let evicted = store.evict_oldest(&mut grid, &mut graph);
        assert_eq!(evicted, 21);
        assert_eq!(store.len(), 3);
        assert!(!store.messages().contains(ids[0]));
        for id in &ids[1..] {
            let m = store.messages().get(*id).unwrap();
            assert!(!m.has_neighbor(ids[0]));
            assert_eq!(m.cached_distance(ids[0]), None);
            assert_eq!(m.neighbor_count(), 2);
        }
        assert_eq!(find_asymmetry(store.messages()), None);

        let cell = grid.locate(40.75, -73.95).unwrap();
        assert_eq!(grid.cell(cell).count(), 3);
        assert_eq!(grid.cell(cell).messages_with("fire").map(|s| s.len()), Some(3));
        assert!(grid.cell(cell).messages_with("noise0").is_none());
    }

    #[test]
    fn evict_before_stops_at_first_recent_message() {
        let (mut grid, mut graph) = (grid(), NeighborGraph::new(0.5));
        let mut store = MessageStore::new(10, 0.5);
        for t in [10, 20, 30, 40] {
            store.admit(&raw(t, "fire", "a"), &mut grid, &mut graph).unwrap();
        }
        assert_eq!(store.evict_before(30, &mut grid, &mut graph), 2);
        let times: Vec<_> = store.messages().iter().map(|m| m.time).collect();
        assert_eq!(times, vec![30, 40]);
    }
}
