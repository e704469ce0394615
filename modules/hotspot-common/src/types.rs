use serde::{Deserialize, Serialize};

use crate::error::{HotspotError, Result};

/// One geotagged message as delivered by the ingestion source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Arrival time, epoch seconds.
    pub time: i64,
    pub lat: f64,
    pub lon: f64,
    pub text: String,
    pub author: String,
    /// True when the location came from device GPS rather than a place centroid.
    pub exact: bool,
}

impl RawMessage {
    /// Build a message from untyped fields, as a source without typed columns
    /// would deliver them. Any malformed field is an [`HotspotError::InputData`].
    pub fn parse(time: &str, lat: &str, lon: &str, text: &str, author: &str, exact: &str) -> Result<Self> {
        let time = time
            .trim()
            .parse::<i64>()
            .map_err(|_| HotspotError::InputData(format!("non-numeric time {time:?}")))?;
        let lat = parse_coordinate("latitude", lat)?;
        let lon = parse_coordinate("longitude", lon)?;
        let exact = match exact.trim() {
            "1" | "true" | "t" => true,
            "0" | "false" | "f" => false,
            other => return Err(HotspotError::InputData(format!("invalid exact flag {other:?}"))),
        };
        let message = Self {
            time,
            lat,
            lon,
            text: text.to_string(),
            author: author.to_string(),
            exact,
        };
        message.validate()?;
        Ok(message)
    }

    /// Reject coordinates that cannot be projected onto the globe.
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(HotspotError::InputData(format!("latitude out of range: {}", self.lat)));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(HotspotError::InputData(format!("longitude out of range: {}", self.lon)));
        }
        if self.time < 0 {
            return Err(HotspotError::InputData(format!("negative time: {}", self.time)));
        }
        Ok(())
    }
}

fn parse_coordinate(name: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| HotspotError::InputData(format!("non-numeric {name} {raw:?}")))
}

/// A detected event ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Centroid longitude (mean over members).
    pub lon: f64,
    /// Centroid latitude (mean over members).
    pub lat: f64,
    pub start_time: i64,
    pub end_time: i64,
    /// Distinct author count.
    pub authors: usize,
    pub members: Vec<ClusterMember>,
}

/// Per-message detail stored alongside a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub time: i64,
    pub lat: f64,
    pub lon: f64,
    pub exact: bool,
    pub text: String,
}
