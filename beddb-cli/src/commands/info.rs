//! Info command implementation - describe a .beddb tileset

use anyhow::{Context, Result};
use beddb_core::{TilesetMetadata, TilesetReader, ZoomLevel};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct TilesetInfo {
    #[serde(flatten)]
    pub metadata: TilesetMetadata,
    pub intervals: usize,
    pub intervals_per_zoom: BTreeMap<ZoomLevel, usize>,
}

pub fn load(db: &Path) -> Result<TilesetInfo> {
    if !db.exists() {
        return Err(CliError::file_not_found(db.to_path_buf()).into());
    }

    let reader = TilesetReader::open(db)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to open tileset {}", db.display()))?;

    Ok(TilesetInfo {
        metadata: reader.tileset_info().clone(),
        intervals: reader.count().map_err(CliError::from)?,
        intervals_per_zoom: reader.counts_by_zoom().map_err(CliError::from)?,
    })
}

pub fn execute(db: PathBuf, json: bool) -> Result<()> {
    let info = load(&db)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&info).context("Failed to serialize tileset info")?
        );
        return Ok(());
    }

    let meta = &info.metadata;
    println!("Tileset:     {}", db.display());
    println!("Version:     {}", meta.version);
    println!("Assembly:    {}", meta.assembly.as_deref().unwrap_or("-"));
    println!("Chromosomes: {}", meta.chrom_names.len());
    println!("Max length:  {}", meta.max_length);
    println!("Tile size:   {}", meta.tile_size);
    println!("Max zoom:    {}", meta.max_zoom);
    println!("Max width:   {}", meta.max_width);
    println!("Columns:     {}", meta.header.join(", "));
    println!("Intervals:   {}", info.intervals);
    for (zoom, count) in &info.intervals_per_zoom {
        println!("  zoom {:>2}: {}", zoom, count);
    }

    Ok(())
}
