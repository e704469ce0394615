use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::error::{HotspotError, Result};

/// Upper bound on the number of grid cells. Every cell is allocated up front,
/// so an oversized grid is rejected as a configuration error.
pub const MAX_GRID_CELLS: usize = 16_000_000;

/// TOML-backed tunables loaded from disk.
/// Secrets (DB URL) stay as env vars, see [`AppConfig`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub timing: TimingConfig,
    pub grid: GridConfig,
    pub optics: OpticsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    /// Recall scope in seconds. Messages older than this relative to the
    /// current cycle boundary are evicted.
    pub history: i64,
    /// Cycle period in seconds.
    pub period: i64,
    /// Initial checkpoint (epoch seconds) used when none has been persisted.
    pub start: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Cell edge length in degrees.
    pub cell_size: f64,
    /// Radius (degrees, per axis) of the region around each cell.
    pub regional_radius: f64,
    #[serde(default = "default_min_lat")]
    pub min_lat: f64,
    #[serde(default = "default_max_lat")]
    pub max_lat: f64,
    #[serde(default = "default_min_lon")]
    pub min_lon: f64,
    #[serde(default = "default_max_lon")]
    pub max_lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpticsConfig {
    /// Acceptance radius: maximum distance at which two messages are neighbors.
    pub epsilon: f64,
    pub minimum_points: usize,
    pub reachability_threshold: f64,
    /// Runs must be strictly longer than this to become clusters.
    pub minimum_cluster_size: usize,
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

fn default_min_lat() -> f64 {
    -90.0
}

fn default_max_lat() -> f64 {
    90.0
}

fn default_min_lon() -> f64 {
    -180.0
}

fn default_max_lon() -> f64 {
    180.0
}

fn default_max_messages() -> usize {
    200_000
}

impl GridConfig {
    /// Grid dimensions (columns along longitude, rows along latitude).
    pub fn dimensions(&self) -> (usize, usize) {
        let width = ((self.max_lon - self.min_lon) / self.cell_size).ceil().max(1.0) as usize;
        let height = ((self.max_lat - self.min_lat) / self.cell_size).ceil().max(1.0) as usize;
        (width, height)
    }
}

impl FileConfig {
    /// Check every tunable. Any failure is a fatal [`HotspotError::Config`].
    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;
        if t.period <= 0 {
            return Err(invalid("timing.period", "must be > 0"));
        }
        if t.history <= 0 {
            return Err(invalid("timing.history", "must be > 0"));
        }
        if t.start < 0 {
            return Err(invalid("timing.start", "must be >= 0"));
        }

        let g = &self.grid;
        if !(g.cell_size.is_finite() && g.cell_size > 0.0) {
            return Err(invalid("grid.cell_size", "must be > 0"));
        }
        if !(g.regional_radius.is_finite() && g.regional_radius > 0.0) {
            return Err(invalid("grid.regional_radius", "must be > 0"));
        }
        if !(-90.0..=90.0).contains(&g.min_lat)
            || !(-90.0..=90.0).contains(&g.max_lat)
            || g.min_lat >= g.max_lat
        {
            return Err(invalid("grid.min_lat/max_lat", "must satisfy -90 <= min < max <= 90"));
        }
        if !(-180.0..=180.0).contains(&g.min_lon)
            || !(-180.0..=180.0).contains(&g.max_lon)
            || g.min_lon >= g.max_lon
        {
            return Err(invalid("grid.min_lon/max_lon", "must satisfy -180 <= min < max <= 180"));
        }
        let (width, height) = g.dimensions();
        if width.saturating_mul(height) > MAX_GRID_CELLS {
            return Err(HotspotError::Config(format!(
                "grid of {width}x{height} cells exceeds the {MAX_GRID_CELLS} cell limit; raise grid.cell_size or shrink the bounding box"
            )));
        }

        let o = &self.optics;
        if !(o.epsilon.is_finite() && o.epsilon > 0.0) {
            return Err(invalid("optics.epsilon", "must be > 0"));
        }
        if o.minimum_points == 0 {
            return Err(invalid("optics.minimum_points", "must be >= 1"));
        }
        if !(o.reachability_threshold.is_finite() && o.reachability_threshold >= 0.0) {
            return Err(invalid("optics.reachability_threshold", "must be >= 0"));
        }
        if o.max_messages == 0 {
            return Err(invalid("optics.max_messages", "must be >= 1"));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> HotspotError {
    HotspotError::Config(format!("{key} {reason}"))
}

/// Load, parse and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        HotspotError::Config(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    let config = parse_config(&content)
        .map_err(|e| HotspotError::Config(format!("{} ({})", e, path.display())))?;
    Ok(config)
}

/// Parse and validate config from a TOML string.
pub fn parse_config(content: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(content)
        .map_err(|e| HotspotError::Config(format!("Failed to parse config: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Secrets and env-specific values. Tunables live in the TOML [`FileConfig`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| HotspotError::Config("DATABASE_URL environment variable is required".into()))?;
        let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse().map_err(|_| {
                HotspotError::Config(format!("DATABASE_MAX_CONNECTIONS must be a number, got {raw:?}"))
            })?,
            Err(_) => 4,
        };

        let config = Self {
            database_url,
            max_connections,
        };
        config.log_redacted();
        Ok(config)
    }

    fn log_redacted(&self) {
        let host = self
            .database_url
            .rsplit_once('@')
            .map(|(_, host)| host)
            .unwrap_or("<unparsed>");
        info!(database = host, max_connections = self.max_connections, "Loaded environment config");
    }
}
