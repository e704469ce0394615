//! Cluster summaries handed to the persistence sink.

use std::collections::HashSet;

use hotspot_common::{ClusterMember, ClusterSummary};

use crate::extract::Cluster;
use crate::message::{Message, Messages};

/// Centroid, time span, distinct authors and per-message detail of a cluster.
/// Returns `None` for an empty cluster.
pub fn summarize(cluster: &Cluster, arena: &Messages) -> Option<ClusterSummary> {
    let messages: Vec<&Message> = cluster.members.iter().filter_map(|id| arena.get(*id)).collect();
    if messages.is_empty() {
        return None;
    }

    let n = messages.len() as f64;
    let lon = messages.iter().map(|m| m.lon).sum::<f64>() / n;
    let lat = messages.iter().map(|m| m.lat).sum::<f64>() / n;
    let start_time = messages.iter().map(|m| m.time).min()?;
    let end_time = messages.iter().map(|m| m.time).max()?;
    let authors = messages.iter().map(|m| m.author.as_str()).collect::<HashSet<_>>().len();

    let members = messages
        .iter()
        .map(|m| ClusterMember {
            time: m.time,
            lat: m.lat,
            lon: m.lon,
            exact: m.exact,
            text: m.text.clone(),
        })
        .collect();

    Some(ClusterSummary {
        lon,
        lat,
        start_time,
        end_time,
        authors,
        members,
    })
}

/// Summaries of every cluster with more than one distinct author.
/// Single-author runs are one person talking to themselves, not an event.
pub fn publishable(clusters: &[Cluster], arena: &Messages) -> Vec<ClusterSummary> {
    clusters
        .iter()
        .filter_map(|cluster| summarize(cluster, arena))
        .filter(|summary| summary.authors > 1)
        .collect()
}
