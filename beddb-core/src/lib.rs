//! beddb Core Library
//!
//! Coordinate mapping, gene aggregation, zoom tile packing and the SQLite
//! tileset store behind `beddb`.

pub mod types;
pub mod error;
pub mod config;
pub mod coords;
pub mod record;
pub mod io;
pub mod aggregate;
pub mod tiles;
pub mod store;
pub mod pipeline;

// Re-export commonly used types and functions
pub use types::{BoundingInterval, GenomicPos, IntervalRecord, TileKey, ZoomLevel};
pub use error::{BeddbError, BeddbResult};
pub use config::{AggregateConfig, ImportanceColumn};
pub use coords::{ChromSizes, CoordinateMapper};
pub use aggregate::{GeneAggregator, ImportanceFold};
pub use tiles::{PackStats, PyramidGeometry, ZoomTilePacker};
pub use store::{StoredInterval, TileIndexWriter, TilesetMetadata, TilesetReader};
pub use pipeline::{aggregate_file, RunSummary};

/// Version information for the beddb core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
