//! Uniform lat/lon grid with precomputed per-cell regions.
//!
//! Every cell of the bounding box is allocated once at startup. A cell's region
//! is the axis-aligned block of cells within `regional_radius / cell_size`
//! cells of it, clipped at the grid edges (no wraparound at the date line or
//! the poles). Regions never change after [`SpatialGrid::build`].

use std::collections::{BTreeSet, HashMap};

use hotspot_common::{GridConfig, HotspotError, Result};

use crate::message::MessageId;

/// Integer grid coordinates. `x` runs along longitude, `y` along latitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellCoord {
    pub x: usize,
    pub y: usize,
}

/// Geographic extent covered by the grid, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn globe() -> Self {
        Self {
            min_lat: -90.0,
            max_lat: 90.0,
            min_lon: -180.0,
            max_lon: 180.0,
        }
    }
}

/// Inclusive, already clipped block of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
}

/// One grid square.
#[derive(Debug, Clone)]
pub struct Cell {
    pub coord: CellCoord,
    count: usize,
    by_word: HashMap<String, BTreeSet<MessageId>>,
    region: Region,
}

impl Cell {
    /// Messages currently located in this cell.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Messages in this cell whose tokens contain `word`.
    pub fn messages_with(&self, word: &str) -> Option<&BTreeSet<MessageId>> {
        self.by_word.get(word)
    }

    /// Number of distinct words indexed in this cell.
    pub fn indexed_words(&self) -> usize {
        self.by_word.len()
    }
}

pub struct SpatialGrid {
    bounds: BoundingBox,
    cell_size: f64,
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl SpatialGrid {
    pub fn from_config(config: &GridConfig) -> Result<Self> {
        let bounds = BoundingBox {
            min_lat: config.min_lat,
            max_lat: config.max_lat,
            min_lon: config.min_lon,
            max_lon: config.max_lon,
        };
        Self::build(bounds, config.cell_size, config.regional_radius)
    }

    /// Allocate every cell covering `bounds` and precompute each cell's region.
    pub fn build(bounds: BoundingBox, cell_size: f64, regional_radius: f64) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(HotspotError::Config(format!("cell size must be > 0, got {cell_size}")));
        }
        if !(regional_radius.is_finite() && regional_radius > 0.0) {
            return Err(HotspotError::Config(format!(
                "regional radius must be > 0, got {regional_radius}"
            )));
        }
        if bounds.min_lat >= bounds.max_lat || bounds.min_lon >= bounds.max_lon {
            return Err(HotspotError::Config(format!("empty bounding box: {bounds:?}")));
        }

        let width = ((bounds.max_lon - bounds.min_lon) / cell_size).ceil().max(1.0) as usize;
        let height = ((bounds.max_lat - bounds.min_lat) / cell_size).ceil().max(1.0) as usize;
        let radius = regional_radius / cell_size;

        let mut cells = Vec::with_capacity(width * height);
        for x in 0..width {
            for y in 0..height {
                cells.push(Cell {
                    coord: CellCoord { x, y },
                    count: 0,
                    by_word: HashMap::new(),
                    region: clip_region(x, y, radius, width, height),
                });
            }
        }

        Ok(Self {
            bounds,
            cell_size,
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Floor projection of a coordinate into grid indices. Returns `None` when
    /// the point falls outside the bounding box. The far edges are inclusive.
    pub fn locate(&self, lat: f64, lon: f64) -> Option<CellCoord> {
        let b = &self.bounds;
        if !(lat >= b.min_lat && lat <= b.max_lat && lon >= b.min_lon && lon <= b.max_lon) {
            return None;
        }
        let x = ((lon - b.min_lon) / self.cell_size).floor() as usize;
        let y = ((lat - b.min_lat) / self.cell_size).floor() as usize;
        Some(CellCoord {
            x: x.min(self.width - 1),
            y: y.min(self.height - 1),
        })
    }

    pub fn cell(&self, coord: CellCoord) -> &Cell {
        &self.cells[self.index(coord)]
    }

    /// Coordinates of every cell in `coord`'s region, including `coord` itself.
    pub fn region(&self, coord: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        let r = self.cell(coord).region;
        (r.min_x..=r.max_x).flat_map(move |x| (r.min_y..=r.max_y).map(move |y| CellCoord { x, y }))
    }

    /// Every message in `coord`'s region whose tokens contain `word`.
    pub fn candidates_for(&self, coord: CellCoord, word: &str) -> BTreeSet<MessageId> {
        let mut candidates = BTreeSet::new();
        for neighbor in self.region(coord) {
            if let Some(ids) = self.cell(neighbor).messages_with(word) {
                candidates.extend(ids.iter().copied());
            }
        }
        candidates
    }

    /// Background frequency of each word among the messages currently in the
    /// region of `coord`. Words never seen (or an empty region) rate 0.
    pub fn regional_rates<'w>(
        &self,
        coord: CellCoord,
        words: impl IntoIterator<Item = &'w String>,
    ) -> HashMap<String, f64> {
        let words: Vec<&String> = words.into_iter().collect();
        let mut total = 0usize;
        let mut counts: HashMap<&str, usize> = words.iter().map(|w| (w.as_str(), 0)).collect();

        for neighbor in self.region(coord) {
            let cell = self.cell(neighbor);
            total += cell.count;
            for word in &words {
                if let Some(ids) = cell.by_word.get(word.as_str()) {
                    *counts.entry(word.as_str()).or_insert(0) += ids.len();
                }
            }
        }

        words
            .into_iter()
            .map(|word| {
                let rate = if total == 0 {
                    0.0
                } else {
                    counts.get(word.as_str()).copied().unwrap_or(0) as f64 / total as f64
                };
                (word.clone(), rate)
            })
            .collect()
    }

    /// Register a message in its cell's word index and count.
    pub fn insert<'w>(&mut self, coord: CellCoord, id: MessageId, words: impl IntoIterator<Item = &'w String>) {
        let index = self.index(coord);
        let cell = &mut self.cells[index];
        cell.count += 1;
        for word in words {
            cell.by_word.entry(word.clone()).or_default().insert(id);
        }
    }

    /// Undo [`SpatialGrid::insert`], pruning word entries that become empty.
    /// Removing an id that is not indexed is a no-op for that word.
    pub fn remove<'w>(&mut self, coord: CellCoord, id: MessageId, words: impl IntoIterator<Item = &'w String>) {
        let index = self.index(coord);
        let cell = &mut self.cells[index];
        cell.count = cell.count.saturating_sub(1);
        for word in words {
            if let Some(ids) = cell.by_word.get_mut(word.as_str()) {
                ids.remove(&id);
                if ids.is_empty() {
                    cell.by_word.remove(word.as_str());
                }
            }
        }
    }

    fn index(&self, coord: CellCoord) -> usize {
        coord.x * self.height + coord.y
    }
}

fn clip_region(x: usize, y: usize, radius: f64, width: usize, height: usize) -> Region {
    let clip = |center: usize, len: usize| {
        let lo = (center as f64 - radius).floor().max(0.0) as usize;
        let hi = ((center as f64 + radius).ceil() as usize).min(len - 1);
        (lo, hi)
    };
    let (min_x, max_x) = clip(x, width);
    let (min_y, max_y) = clip(y, height);
    Region {
        min_x,
        max_x,
        min_y,
        max_y,
    }
}
