//! Query command implementation - list intervals by zoom level and range

use anyhow::{Context, Result};
use beddb_core::{StoredInterval, TilesetReader};
use std::path::{Path, PathBuf};

use crate::error::CliError;

/// Rows at `zoom` within `[start, end]`, or every row visible in tile `tile`.
pub fn fetch(
    db: &Path,
    zoom: u32,
    start: Option<i64>,
    end: Option<i64>,
    tile: Option<i64>,
) -> Result<Vec<StoredInterval>> {
    if !db.exists() {
        return Err(CliError::file_not_found(db.to_path_buf()).into());
    }

    let reader = TilesetReader::open(db)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to open tileset {}", db.display()))?;

    let max_zoom = reader.tileset_info().max_zoom;
    if zoom > max_zoom {
        log::warn!("Zoom {} is past the deepest level of this tileset ({})", zoom, max_zoom);
    }

    let rows = match (tile, start, end) {
        (Some(x), _, _) => reader.tile(zoom, x),
        (None, Some(start), Some(end)) => {
            if end < start {
                return Err(CliError::validation(format!(
                    "--end ({}) must not be smaller than --start ({})",
                    end, start
                ))
                .into());
            }
            reader.query(zoom, start, end)
        }
        _ => return Err(CliError::validation("either --tile or both --start and --end are required").into()),
    };

    Ok(rows.map_err(CliError::from)?)
}

pub fn execute(
    db: PathBuf,
    zoom: u32,
    start: Option<i64>,
    end: Option<i64>,
    tile: Option<i64>,
    json: bool,
) -> Result<()> {
    let rows = fetch(&db, zoom, start, end, tile)?;
    log::info!("{} intervals", rows.len());

    for row in &rows {
        if json {
            println!("{}", serde_json::to_string(row).context("Failed to serialize interval")?);
        } else {
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                row.id, row.zoom_level, row.start_pos, row.end_pos, row.importance, row.uid, row.name
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beddb_core::pipeline::aggregate_file;
    use beddb_core::{AggregateConfig, ImportanceColumn};
    use tempfile::TempDir;

    fn build(dir: &TempDir) -> PathBuf {
        let sizes = dir.path().join("sizes");
        std::fs::write(&sizes, "chr1\t8000\n").unwrap();
        let input = dir.path().join("genes.tsv");
        std::fs::write(
            &input,
            "chr1\t100\t200\ta\t9\t+\tg1\n\
             chr1\t300\t400\tb\t5\t+\tg2\n\
             chr1\t5000\t5100\tc\t1\t+\tg3\n",
        )
        .unwrap();

        let output = dir.path().join("genes.beddb");
        let config = AggregateConfig {
            importance_column: ImportanceColumn::Column(5),
            max_transcripts_per_tile: 1,
            ..Default::default()
        };
        aggregate_file(&input, &sizes, &output, &config).unwrap();
        output
    }

    #[test]
    fn test_range_query() -> Result<()> {
        let dir = TempDir::new()?;
        let db = build(&dir);

        // a fills the only zoom 0 tile; b and c land in separate zoom 1 tiles
        let names: Vec<_> = fetch(&db, 0, Some(0), Some(8000), None)?.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a"]);
        let names: Vec<_> = fetch(&db, 1, Some(0), Some(8000), None)?.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["b", "c"]);
        let names: Vec<_> = fetch(&db, 1, Some(4500), Some(8000), None)?.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["c"]);
        assert!(fetch(&db, 2, Some(0), Some(1000), None)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_tile_query() -> Result<()> {
        let dir = TempDir::new()?;
        let db = build(&dir);

        let names: Vec<_> = fetch(&db, 2, None, None, Some(0))?.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        Ok(())
    }

    #[test]
    fn test_inverted_range_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let db = build(&dir);
        let err = fetch(&db, 0, Some(10), Some(5), None).unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::Validation { .. })));
        Ok(())
    }
}
