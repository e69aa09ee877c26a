//! Tileset database (.beddb)
//!
//! A SQLite file with three tables:
//! - `tileset_info`   one row of pyramid metadata
//! - `intervals`      every placed record, keyed by sequential id
//! - `position_index` R*Tree over `(zoom, zoom, startPos, endPos)` per id
//!
//! The writer builds into a temporary file next to the destination and only
//! renames it into place once everything is committed.

use crate::error::{BeddbError, BeddbResult};
use crate::tiles::PyramidGeometry;
use crate::types::*;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Format version written to `tileset_info.version`.
pub const BEDDB_VERSION: &str = "3";

const PROGRESS_INTERVAL: i64 = 1000;

const CREATE_TILESET_INFO: &str = "CREATE TABLE tileset_info
    (
        zoom_step INT,
        max_length INT,
        assembly text,
        chrom_names text,
        chrom_sizes text,
        tile_size REAL,
        max_zoom INT,
        max_width REAL,
        header text,
        version text
    )";

const CREATE_INTERVALS: &str = "CREATE TABLE intervals
    (
        id int PRIMARY KEY,
        zoomLevel int,
        importance real,
        startPos int,
        endPos int,
        chrOffset int,
        uid text,
        name text,
        fields text
    )";

const CREATE_POSITION_INDEX: &str = "CREATE VIRTUAL TABLE position_index USING rtree(
        id,
        rStartZoomLevel, rEndZoomLevel, rStartPos, rEndPos
    )";

const INTERVAL_COLUMNS: &str =
    "intervals.id, zoomLevel, importance, startPos, endPos, chrOffset, uid, name, fields";

/// Pyramid description stored once per tileset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetMetadata {
    pub zoom_step: u32,
    /// Assembly length (sum of chromosome sizes plus one).
    pub max_length: GenomicPos,
    pub assembly: Option<String>,
    pub chrom_names: Vec<String>,
    pub chrom_sizes: Vec<GenomicPos>,
    pub tile_size: f64,
    pub max_zoom: ZoomLevel,
    pub max_width: f64,
    pub header: Vec<String>,
    pub version: String,
}

impl TilesetMetadata {
    pub fn new(
        max_length: GenomicPos,
        assembly: Option<String>,
        chrom_names: Vec<String>,
        chrom_sizes: Vec<GenomicPos>,
        tile_size: GenomicPos,
        max_zoom: ZoomLevel,
        header: Vec<String>,
    ) -> Self {
        let max_width = tile_size as f64 * 2f64.powi(max_zoom as i32);
        Self {
            zoom_step: 1,
            max_length,
            assembly,
            chrom_names,
            chrom_sizes,
            tile_size: tile_size as f64,
            max_zoom,
            max_width,
            header,
            version: BEDDB_VERSION.to_string(),
        }
    }

    fn from_sql_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let chrom_names: String = row.get(3)?;
        let chrom_sizes: String = row.get(4)?;
        let header: String = row.get(8)?;

        Ok(Self {
            zoom_step: row.get(0)?,
            max_length: row.get(1)?,
            assembly: row.get(2)?,
            chrom_names: split_tabs(&chrom_names),
            chrom_sizes: split_tabs(&chrom_sizes)
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect(),
            tile_size: row.get(5)?,
            max_zoom: row.get(6)?,
            max_width: row.get(7)?,
            header: split_tabs(&header),
            version: row.get(9)?,
        })
    }
}

fn split_tabs(s: &str) -> Vec<String> {
    if s.is_empty() {
        Vec::new()
    } else {
        s.split('\t').map(str::to_string).collect()
    }
}

fn join_tabs<T: ToString>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join("\t")
}

/// One row of the `intervals` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInterval {
    pub id: i64,
    pub zoom_level: ZoomLevel,
    pub importance: f64,
    pub start_pos: GenomicPos,
    pub end_pos: GenomicPos,
    pub chr_offset: GenomicPos,
    pub uid: String,
    pub name: String,
    pub fields: String,
}

impl StoredInterval {
    fn from_record(id: i64, record: &IntervalRecord, zoom: ZoomLevel) -> Self {
        Self {
            id,
            zoom_level: zoom,
            importance: record.importance,
            start_pos: record.start_pos,
            end_pos: record.end_pos,
            chr_offset: record.chr_offset,
            uid: record.uid.clone(),
            name: record.name.clone(),
            fields: record.fields.clone(),
        }
    }

    pub fn from_sql_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            zoom_level: row.get(1)?,
            importance: row.get(2)?,
            start_pos: row.get(3)?,
            end_pos: row.get(4)?,
            chr_offset: row.get(5)?,
            uid: row.get(6)?,
            name: row.get(7)?,
            fields: row.get(8)?,
        })
    }
}

/// Destination of a tileset build.
pub trait TilesetSink {
    fn write_metadata(&mut self, metadata: &TilesetMetadata) -> BeddbResult<()>;

    /// Append `record` at `zoom`; returns the row id it was given.
    fn write_interval(&mut self, record: &IntervalRecord, zoom: ZoomLevel) -> BeddbResult<i64>;

    /// Rows written so far.
    fn rows_written(&self) -> usize;
}

/// Writes a `.beddb` SQLite tileset, committed atomically by [`finish`](Self::finish).
pub struct TileIndexWriter {
    connection: Connection,
    temp: NamedTempFile,
    destination: PathBuf,
    next_id: i64,
}

impl TileIndexWriter {
    /// Start a new tileset at `destination`. Any existing file there is removed first.
    pub fn create<P: AsRef<Path>>(destination: P) -> BeddbResult<Self> {
        let destination = destination.as_ref().to_path_buf();

        if destination.exists() {
            log::info!("Removing existing {}", destination.display());
            fs::remove_file(&destination)?;
        }

        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(&dir)?;

        let connection = Connection::open(temp.path())?;
        connection.execute_batch(&format!(
            "{};\n{};\n{};\nBEGIN;",
            CREATE_TILESET_INFO, CREATE_INTERVALS, CREATE_POSITION_INDEX
        ))?;

        Ok(Self {
            connection,
            temp,
            destination,
            next_id: 0,
        })
    }

    /// Commit, close the database and move it to the destination.
    pub fn finish(self) -> BeddbResult<PathBuf> {
        let Self {
            connection,
            temp,
            destination,
            next_id,
        } = self;

        connection.execute_batch("COMMIT")?;
        connection.close().map_err(|(_, e)| BeddbError::Storage(e))?;

        temp.persist(&destination).map_err(|e| BeddbError::Io(e.error))?;
        log::info!("Wrote {} intervals to {}", next_id, destination.display());
        Ok(destination)
    }
}

impl TilesetSink for TileIndexWriter {
    fn write_metadata(&mut self, metadata: &TilesetMetadata) -> BeddbResult<()> {
        self.connection.execute(
            "INSERT INTO tileset_info VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                metadata.zoom_step,
                metadata.max_length,
                metadata.assembly,
                join_tabs(&metadata.chrom_names),
                join_tabs(&metadata.chrom_sizes),
                metadata.tile_size,
                metadata.max_zoom,
                metadata.max_width,
                join_tabs(&metadata.header),
                metadata.version,
            ],
        )?;
        Ok(())
    }

    fn write_interval(&mut self, record: &IntervalRecord, zoom: ZoomLevel) -> BeddbResult<i64> {
        let id = self.next_id;

        let mut insert = self
            .connection
            .prepare_cached("INSERT INTO intervals VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)")?;
        insert.execute(rusqlite::params![
            id,
            zoom,
            record.importance,
            record.start_pos,
            record.end_pos,
            record.chr_offset,
            record.uid,
            record.name,
            record.fields,
        ])?;

        let mut index = self
            .connection
            .prepare_cached("INSERT INTO position_index VALUES (?1, ?2, ?3, ?4, ?5)")?;
        index.execute(rusqlite::params![id, zoom, zoom, record.start_pos, record.end_pos])?;

        self.next_id += 1;
        if self.next_id % PROGRESS_INTERVAL == 0 {
            log::debug!("Inserted {} intervals", self.next_id);
        }
        Ok(id)
    }

    fn rows_written(&self) -> usize {
        self.next_id as usize
    }
}

/// Collects a tileset in memory; used for dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub metadata: Option<TilesetMetadata>,
    pub intervals: Vec<StoredInterval>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TilesetSink for MemorySink {
    fn write_metadata(&mut self, metadata: &TilesetMetadata) -> BeddbResult<()> {
        self.metadata = Some(metadata.clone());
        Ok(())
    }

    fn write_interval(&mut self, record: &IntervalRecord, zoom: ZoomLevel) -> BeddbResult<i64> {
        let id = self.intervals.len() as i64;
        self.intervals.push(StoredInterval::from_record(id, record, zoom));
        Ok(id)
    }

    fn rows_written(&self) -> usize {
        self.intervals.len()
    }
}

/// Read-only access to a finished tileset.
pub struct TilesetReader {
    connection: Connection,
    info: TilesetMetadata,
}

impl TilesetReader {
    pub fn open<P: AsRef<Path>>(path: P) -> BeddbResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BeddbError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("tileset not found: {}", path.display()),
            )));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(path, flags)?;

        let info = connection
            .query_row("SELECT * FROM tileset_info", [], TilesetMetadata::from_sql_row)
            .optional()?
            .ok_or_else(|| {
                BeddbError::InvalidConfig(format!("{} has no tileset_info row", path.display()))
            })?;

        Ok(Self { connection, info })
    }

    pub fn tileset_info(&self) -> &TilesetMetadata {
        &self.info
    }

    pub fn count(&self) -> BeddbResult<usize> {
        let n: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM intervals", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Row count per zoom level.
    pub fn counts_by_zoom(&self) -> BeddbResult<BTreeMap<ZoomLevel, usize>> {
        let mut statement = self
            .connection
            .prepare("SELECT zoomLevel, COUNT(*) FROM intervals GROUP BY zoomLevel")?;
        let rows = statement.query_map([], |row| {
            let zoom: ZoomLevel = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((zoom, count as usize))
        })?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (zoom, count) = row?;
            counts.insert(zoom, count);
        }
        Ok(counts)
    }

    /// Rows at exactly `zoom` whose `[startPos, endPos]` intersects `[start, end]`.
    pub fn query(&self, zoom: ZoomLevel, start: GenomicPos, end: GenomicPos) -> BeddbResult<Vec<StoredInterval>> {
        let sql = format!(
            "SELECT {} FROM intervals, position_index
             WHERE intervals.id = position_index.id
               AND rStartZoomLevel <= ?1 AND rEndZoomLevel >= ?1
               AND rEndPos >= ?2 AND rStartPos <= ?3
               AND intervals.zoomLevel = ?1
               AND intervals.endPos >= ?2 AND intervals.startPos <= ?3
             ORDER BY intervals.id",
            INTERVAL_COLUMNS
        );
        let mut statement = self.connection.prepare(&sql)?;
        let rows = statement
            .query_map(rusqlite::params![zoom, start, end], StoredInterval::from_sql_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Rows visible in tile `x` at `zoom`: every zoom level up to `zoom`, tile
    /// width `max_width / 2^zoom`. Both tile edges are inclusive.
    pub fn tile(&self, zoom: ZoomLevel, x: TileIndex) -> BeddbResult<Vec<StoredInterval>> {
        let geometry = PyramidGeometry::new(self.info.tile_size as GenomicPos, self.info.max_zoom);
        let (tile_start, tile_end) = geometry.tile_bounds(zoom, x);

        let sql = format!(
            "SELECT {} FROM intervals, position_index
             WHERE intervals.id = position_index.id
               AND rStartZoomLevel <= ?1
               AND rEndPos >= ?2 AND rStartPos <= ?3
               AND intervals.zoomLevel <= ?1
               AND intervals.endPos >= ?2 AND intervals.startPos <= ?3
             ORDER BY intervals.id",
            INTERVAL_COLUMNS
        );
        let mut statement = self.connection.prepare(&sql)?;
        let rows = statement
            .query_map(rusqlite::params![zoom, tile_start, tile_end], StoredInterval::from_sql_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Every row, ordered by id.
    pub fn intervals(&self) -> BeddbResult<Vec<StoredInterval>> {
        let sql = format!("SELECT {} FROM intervals ORDER BY id", INTERVAL_COLUMNS);
        let mut statement = self.connection.prepare(&sql)?;
        let rows = statement
            .query_map([], StoredInterval::from_sql_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
