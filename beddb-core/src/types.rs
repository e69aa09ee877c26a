use serde::{Deserialize, Serialize};

/// Linear genome coordinate. Signed so a negative global offset stays representable
/// and values map directly onto SQLite INTEGER columns.
pub type GenomicPos = i64;
pub type TileIndex = i64;
pub type ZoomLevel = u32;

/// Index of a record within the run's record list.
pub type RecordId = usize;

/// One parsed input line, placed on the linear genome coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalRecord {
    pub start_pos: GenomicPos,
    pub end_pos: GenomicPos,
    pub uid: String,
    pub name: String,
    /// Genome coordinate of local position 0 on `chromosome`.
    pub chr_offset: GenomicPos,
    pub group_key: String,
    /// Original line, tab-joined.
    pub fields: String,
    pub importance: f64,
    pub chromosome: String,
    /// Assigned by the packer; `None` means the record is not written.
    pub zoom_level: Option<ZoomLevel>,
}

/// Extent covering every record of one group (all transcripts of a gene).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingInterval {
    pub group_key: String,
    pub min_start: GenomicPos,
    pub max_end: GenomicPos,
    pub importance: f64,
    /// Members in input order.
    pub members: Vec<RecordId>,
}

/// Packed `(zoom, tile)` key for occupancy bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub zoom: ZoomLevel,
    pub index: TileIndex,
}

impl TileKey {
    pub fn new(zoom: ZoomLevel, index: TileIndex) -> Self {
        Self { zoom, index }
    }
}
