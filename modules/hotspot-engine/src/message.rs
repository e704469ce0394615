use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::grid::CellCoord;

/// Stable arena key. Ids are handed out in admission order and never reused,
/// so comparing ids compares admission sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// An accepted neighbor: `(distance, id)`. Ordered by distance ascending,
/// then by id, so equal distances never collide and removal hits exactly one slot.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub distance: f64,
    pub id: MessageId,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// One admitted message and its OPTICS bookkeeping.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub time: i64,
    pub lat: f64,
    pub lon: f64,
    pub cell: CellCoord,
    pub words: BTreeSet<String>,
    pub author: String,
    pub exact: bool,
    /// Text with mentions, URLs and punctuation stripped, case kept.
    pub text: String,
    /// Background rate of each of `words` in the message's region, frozen at admission.
    pub regional_rates: HashMap<String, f64>,
    pub core_distance: f64,
    pub reachability: f64,
    pub(crate) distances: HashMap<MessageId, f64>,
    pub(crate) neighbors: BTreeSet<Neighbor>,
}

impl Message {
    /// Accepted neighbors, closest first.
    pub fn neighbors(&self) -> impl Iterator<Item = &Neighbor> {
        self.neighbors.iter()
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors.len()
    }

    pub fn has_neighbor(&self, id: MessageId) -> bool {
        self.neighbors.iter().any(|n| n.id == id)
    }

    /// Cached distance to a previously compared message.
    pub fn cached_distance(&self, other: MessageId) -> Option<f64> {
        self.distances.get(&other).copied()
    }

    pub fn compared_count(&self) -> usize {
        self.distances.len()
    }

    /// Core objects have their `min_pts`-th neighbor within `epsilon`.
    pub fn is_core(&self, epsilon: f64) -> bool {
        self.core_distance <= epsilon
    }
}

/// Arena of live messages keyed by [`MessageId`]. Iteration follows admission order.
#[derive(Debug, Default)]
pub struct Messages {
    by_id: BTreeMap<MessageId, Message>,
}

impl Messages {
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.by_id.get(&id)
    }

    pub fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.by_id.get_mut(&id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.by_id.values()
    }

    pub fn oldest(&self) -> Option<&Message> {
        self.by_id.values().next()
    }

    pub(crate) fn insert(&mut self, message: Message) {
        self.by_id.insert(message.id, message);
    }

    pub(crate) fn remove(&mut self, id: MessageId) -> Option<Message> {
        self.by_id.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_with_equal_distance_are_distinct() {
        let mut set = BTreeSet::new();
        set.insert(Neighbor { distance: 0.2, id: MessageId(1) });
        set.insert(Neighbor { distance: 0.2, id: MessageId(2) });
        set.insert(Neighbor { distance: 0.1, id: MessageId(3) });
        assert_eq!(set.len(), 3);

        assert!(set.remove(&Neighbor { distance: 0.2, id: MessageId(2) }));
        let ids: Vec<_> = set.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![MessageId(3), MessageId(1)]);
    }

    #[test]
    fn core_status_includes_the_epsilon_boundary() {
        let mut m = Message {
            id: MessageId(1),
            time: 0,
            lat: 0.0,
            lon: 0.0,
            cell: CellCoord { x: 0, y: 0 },
            words: BTreeSet::new(),
            author: "a".into(),
            exact: false,
            text: String::new(),
            regional_rates: HashMap::new(),
            core_distance: 0.5,
            reachability: 0.5,
            distances: HashMap::new(),
            neighbors: BTreeSet::new(),
        };
        assert!(m.is_core(0.5));
        m.core_distance = 1.5;
        assert!(!m.is_core(0.5));
    }

    #[test]
    fn neighbors_order_by_distance_first() {
        let near = Neighbor { distance: 0.05, id: MessageId(9) };
        let far = Neighbor { distance: 0.4, id: MessageId(1) };
        assert!(near < far);
    }
}
