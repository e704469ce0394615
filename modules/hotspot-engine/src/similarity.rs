use crate::message::Message;

/// Below this many combined regional-rate entries there is not enough local
/// vocabulary to judge two messages.
pub const MIN_RATE_EVIDENCE: usize = 5;

/// Text distance between two messages in `[0, epsilon + 1]`.
///
/// Shared words are weighted by how rare they are in each message's own region
/// (`1 - regional_rate`); the more distinctive of the two weights counts. The
/// accumulated similarity is normalised by the larger vocabulary, and the
/// distance is `1 - similarity`. `epsilon + 1` means "not a neighbor".
///
/// Symmetric and never negative.
pub fn distance(a: &Message, b: &Message, epsilon: f64) -> f64 {
    let ceiling = epsilon + 1.0;

    if a.regional_rates.len() + b.regional_rates.len() < MIN_RATE_EVIDENCE {
        return ceiling;
    }

    let size = a.words.len().max(b.words.len()) as f64;
    let mut similarity = 0.0;
    for word in a.words.intersection(&b.words) {
        let weight_a = 1.0 - a.regional_rates.get(word).copied().unwrap_or(0.0);
        let weight_b = 1.0 - b.regional_rates.get(word).copied().unwrap_or(0.0);
        similarity += weight_a.max(weight_b) / size;
    }

    if similarity <= 0.0 {
        return ceiling;
    }

    (1.0 - similarity).clamp(0.0, ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellCoord;
    use crate::message::MessageId;
    use std::collections::{BTreeSet, HashMap};

    fn message(id: u64, rates: &[(&str, f64)]) -> Message {
        Message {
            id: MessageId(id),
            time: 0,
            lat: 0.0,
            lon: 0.0,
            cell: CellCoord { x: 0, y: 0 },
            words: rates.iter().map(|(w, _)| w.to_string()).collect::<BTreeSet<_>>(),
            author: "a".into(),
            exact: false,
            text: String::new(),
            regional_rates: rates.iter().map(|(w, r)| (w.to_string(), *r)).collect::<HashMap<_, _>>(),
            core_distance: 0.0,
            reachability: 0.0,
            distances: HashMap::new(),
            neighbors: BTreeSet::new(),
        }
    }

    #[test]
    fn insufficient_evidence_is_not_a_neighbor() {
        let a = message(1, &[("fire", 0.0), ("truck", 0.0)]);
        let b = message(2, &[("fire", 0.0), ("truck", 0.0)]);
        assert_eq!(distance(&a, &b, 0.5), 1.5);
    }

    #[test]
    fn identical_rare_vocabulary_is_distance_zero() {
        let words = [("fire", 0.0), ("truck", 0.0), ("main", 0.0)];
        let a = message(1, &words);
        let b = message(2, &words);
        assert!(distance(&a, &b, 0.5).abs() < 1e-12);
    }

    #[test]
    fn disjoint_vocabulary_is_ceiling() {
        let a = message(1, &[("fire", 0.0), ("truck", 0.0), ("main", 0.0)]);
        let b = message(2, &[("rain", 0.0), ("cold", 0.0), ("wind", 0.0)]);
        assert_eq!(distance(&a, &b, 0.5), 1.5);
    }

    #[test]
    fn shared_words_that_are_locally_common_everywhere_do_not_count() {
        let a = message(1, &[("the", 1.0), ("fire", 0.0), ("x", 0.0)]);
        let b = message(2, &[("the", 1.0), ("rain", 0.0), ("y", 0.0)]);
        assert_eq!(distance(&a, &b, 0.5), 1.5);
    }

    #[test]
    fn more_distinctive_weight_dominates() {
        // "fire" is common around a, rare around b: b's weight (0.9) wins.
        let a = message(1, &[("fire", 0.8), ("one", 0.0)]);
        let b = message(2, &[("fire", 0.1), ("two", 0.0), ("three", 0.0)]);
        let expected = 1.0 - 0.9 / 3.0;
        assert!((distance(&a, &b, 0.5) - expected).abs() < 1e-12);
    }

    #[test]
    fn distance_is_symmetric_and_non_negative() {
        let cases = [
            (
                message(1, &[("a", 0.3), ("b", 0.7), ("c", 0.1)]),
                message(2, &[("a", 0.5), ("c", 0.9), ("d", 0.2), ("e", 0.0)]),
            ),
            (
                message(3, &[("a", 0.0), ("b", 0.0)]),
                message(4, &[("a", 0.0), ("b", 0.0), ("c", 0.0)]),
            ),
            (
                message(5, &[("q", 0.99), ("r", 0.98), ("s", 0.97)]),
                message(6, &[("q", 0.2), ("r", 0.4)]),
            ),
        ];
        for (a, b) in &cases {
            let ab = distance(a, b, 0.5);
            let ba = distance(b, a, 0.5);
            assert!((ab - ba).abs() < 1e-12, "asymmetric: {ab} vs {ba}");
            assert!(ab >= 0.0);
        }
    }
}
