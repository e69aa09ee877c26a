//! Zoom-level assignment under a per-tile occupancy cap
//!
//! Bounding intervals are visited from most to least important. Each one goes to
//! the coarsest zoom level where every tile it touches still has room; its
//! member records inherit that zoom. Groups that fit nowhere are dropped.

use crate::types::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_TILE_SIZE: GenomicPos = 1024;
pub const DEFAULT_MAX_PER_TILE: u32 = 5;

/// Zoom levels past this would overflow tile widths.
const MAX_ZOOM_LIMIT: ZoomLevel = 62;

/// Tile widths of a 1-D pyramid: `tile_base_size * 2^(max_zoom - zoom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidGeometry {
    pub tile_base_size: GenomicPos,
    pub max_zoom: ZoomLevel,
}

impl PyramidGeometry {
    pub fn new(tile_base_size: GenomicPos, max_zoom: ZoomLevel) -> Self {
        Self {
            tile_base_size,
            max_zoom: max_zoom.min(MAX_ZOOM_LIMIT),
        }
    }

    /// Smallest pyramid whose finest tiles cover `assembly_length`:
    /// `max_zoom = ceil(log2(assembly_length / tile_base_size))`, never below 0.
    pub fn for_assembly(assembly_length: GenomicPos, tile_base_size: GenomicPos) -> Self {
        let ratio = assembly_length as f64 / tile_base_size as f64;
        let max_zoom = if ratio <= 1.0 {
            0
        } else {
            ratio.log2().ceil() as ZoomLevel
        };
        Self::new(tile_base_size, max_zoom)
    }

    pub fn tile_width(&self, zoom: ZoomLevel) -> GenomicPos {
        let shift = self.max_zoom.saturating_sub(zoom);
        self.tile_base_size.saturating_mul(1i64 << shift)
    }

    /// Width of the single tile at zoom 0.
    pub fn max_width(&self) -> GenomicPos {
        self.tile_width(0)
    }

    /// `[start, end)` covered by tile `index` at `zoom`.
    pub fn tile_bounds(&self, zoom: ZoomLevel, index: TileIndex) -> (GenomicPos, GenomicPos) {
        let width = self.tile_width(zoom);
        let start = index.saturating_mul(width);
        (start, start.saturating_add(width))
    }

    /// Tiles touched by `[start, end]` at `zoom`, sampled every tile width from
    /// `start`. Always yields at least the tile holding `start`.
    pub fn spanned_tiles(&self, zoom: ZoomLevel, start: GenomicPos, end: GenomicPos) -> Vec<TileKey> {
        let width = self.tile_width(zoom);
        let mut tiles = Vec::new();
        let mut pos = start;
        loop {
            tiles.push(TileKey::new(zoom, pos.div_euclid(width)));
            pos = pos.saturating_add(width);
            if pos >= end {
                break;
            }
        }
        tiles
    }
}

/// Count of groups placed in each `(zoom, tile)`. Lives for one packing run.
#[derive(Debug, Clone, Default)]
pub struct TileOccupancy {
    counts: HashMap<TileKey, u32>,
}

impl TileOccupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &TileKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn has_room(&self, tiles: &[TileKey], capacity: u32) -> bool {
        tiles.iter().all(|t| self.get(t) < capacity)
    }

    pub fn commit(&mut self, tiles: &[TileKey]) {
        for tile in tiles {
            *self.counts.entry(*tile).or_insert(0) += 1;
        }
    }
}

/// Where a group ended up. `group` indexes the packed (sorted) interval list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub group: usize,
    pub zoom: ZoomLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackStats {
    pub groups_placed: usize,
    /// Groups with no zoom level left that had room for them.
    pub groups_dropped: usize,
    pub records_placed: usize,
    pub records_dropped: usize,
    /// Records placed per zoom level.
    pub per_zoom: BTreeMap<ZoomLevel, usize>,
}

pub struct ZoomTilePacker {
    geometry: PyramidGeometry,
    max_per_tile: u32,
    occupancy: TileOccupancy,
    stats: PackStats,
}

impl ZoomTilePacker {
    pub fn new(geometry: PyramidGeometry, max_per_tile: u32) -> Self {
        Self {
            geometry,
            max_per_tile,
            occupancy: TileOccupancy::new(),
            stats: PackStats::default(),
        }
    }

    /// Try zoom levels from coarsest to finest and commit the first with room.
    pub fn place(&mut self, interval: &BoundingInterval) -> Option<ZoomLevel> {
        for zoom in 0..=self.geometry.max_zoom {
            let tiles = self
                .geometry
                .spanned_tiles(zoom, interval.min_start, interval.max_end);

            if self.occupancy.has_room(&tiles, self.max_per_tile) {
                self.occupancy.commit(&tiles);
                return Some(zoom);
            }
        }
        None
    }

    /// Sort `intervals` by importance (descending, ties keep input order), place
    /// each one and stamp the chosen zoom on its member records.
    ///
    /// Returns placements in placement order.
    pub fn pack(
        &mut self,
        intervals: &mut [BoundingInterval],
        records: &mut [IntervalRecord],
    ) -> Vec<Placement> {
        intervals.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        let mut placements = Vec::with_capacity(intervals.len());
        for (idx, interval) in intervals.iter().enumerate() {
            match self.place(interval) {
                Some(zoom) => {
                    for &member in &interval.members {
                        records[member].zoom_level = Some(zoom);
                    }
                    self.stats.groups_placed += 1;
                    self.stats.records_placed += interval.members.len();
                    *self.stats.per_zoom.entry(zoom).or_insert(0) += interval.members.len();
                    placements.push(Placement { group: idx, zoom });
                }
                None => {
                    log::debug!(
                        "No room for {} [{}, {}] at any zoom level; dropping {} records",
                        interval.group_key,
                        interval.min_start,
                        interval.max_end,
                        interval.members.len()
                    );
                    self.stats.groups_dropped += 1;
                    self.stats.records_dropped += interval.members.len();
                }
            }
        }

        placements
    }

    pub fn geometry(&self) -> &PyramidGeometry {
        &self.geometry
    }

    pub fn occupancy(&self) -> &TileOccupancy {
        &self.occupancy
    }

    pub fn stats(&self) -> &PackStats {
        &self.stats
    }
}
