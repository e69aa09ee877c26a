//! End-to-end tileset build: parse, aggregate, pack, write.

use crate::aggregate::GeneAggregator;
use crate::config::AggregateConfig;
use crate::coords::{ChromSizes, CoordinateMapper};
use crate::error::BeddbResult;
use crate::io::{open_input, read_intervals};
use crate::record::{BuildStats, RecordBuilder};
use crate::store::{MemorySink, TileIndexWriter, TilesetMetadata, TilesetSink};
use crate::tiles::{PackStats, PyramidGeometry, ZoomTilePacker};
use crate::types::ZoomLevel;
use serde::Serialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub build: BuildStats,
    pub pack: PackStats,
    /// Records left after the chromosome filter.
    pub records: usize,
    pub groups: usize,
    pub max_zoom: ZoomLevel,
    pub rows_written: usize,
    pub output: Option<PathBuf>,
}

/// `<input>.beddb`
pub fn default_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let mut name = input.as_ref().as_os_str().to_os_string();
    name.push(".beddb");
    PathBuf::from(name)
}

/// Build `output` from the interval file `input` and the chromosome sizes at `chromsizes`.
///
/// Nothing appears at `output` unless the whole run succeeds.
pub fn aggregate_file<P, Q, R>(input: P, chromsizes: Q, output: R, config: &AggregateConfig) -> BeddbResult<RunSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    config.validate()?;
    let chroms = ChromSizes::from_path(chromsizes)?;

    log::info!("Reading intervals from {}", input.as_ref().display());
    let reader = open_input(input)?;

    let mut writer = TileIndexWriter::create(output)?;
    let mut summary = build_tileset(reader, chroms, config, &mut writer)?;
    summary.output = Some(writer.finish()?);

    Ok(summary)
}

/// Run the whole build without touching the filesystem beyond reading inputs.
pub fn dry_run<P, Q>(input: P, chromsizes: Q, config: &AggregateConfig) -> BeddbResult<(RunSummary, MemorySink)>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    config.validate()?;
    let chroms = ChromSizes::from_path(chromsizes)?;
    let reader = open_input(input)?;

    let mut sink = MemorySink::new();
    let summary = build_tileset(reader, chroms, config, &mut sink)?;
    Ok((summary, sink))
}

/// Core of a run over an already opened input. Rows go to `sink` in placement
/// order; members of a group keep their input order.
pub fn build_tileset<R, S>(reader: R, chroms: ChromSizes, config: &AggregateConfig, sink: &mut S) -> BeddbResult<RunSummary>
where
    R: BufRead,
    S: TilesetSink,
{
    let mapper = CoordinateMapper::new(chroms, config.global_offset);
    let mut builder = RecordBuilder::new(&mapper, config);

    let file = read_intervals(reader, &mut builder, config)?;
    let build = builder.stats();
    log::info!(
        "Parsed {} records ({} malformed skipped, {} inverted)",
        build.parsed,
        build.skipped_malformed,
        build.inverted
    );

    let mut records = file.records;
    if let Some(chrom) = &config.chromosome_filter {
        records.retain(|r| &r.chromosome == chrom);
        log::info!("{} records on {}", records.len(), chrom);
    }

    let mut groups = GeneAggregator::aggregate(&records, config.importance_fold);
    log::info!("Aggregated into {} groups", groups.len());

    let assembly_length = mapper.assembly_length();
    let geometry = PyramidGeometry::new(config.tile_base_size, mapper.max_zoom(config.tile_base_size));
    log::info!("Max zoom: {} (tile size {})", geometry.max_zoom, geometry.tile_base_size);

    let chrom_sizes = mapper.chrom_sizes();
    let metadata = TilesetMetadata::new(
        assembly_length,
        config.assembly.clone(),
        chrom_sizes.names().into_iter().map(str::to_string).collect(),
        chrom_sizes.sizes(),
        config.tile_base_size,
        geometry.max_zoom,
        file.header,
    );
    sink.write_metadata(&metadata)?;

    let mut packer = ZoomTilePacker::new(geometry, config.max_transcripts_per_tile);
    let placements = packer.pack(&mut groups, &mut records);

    for placement in &placements {
        for &member in &groups[placement.group].members {
            sink.write_interval(&records[member], placement.zoom)?;
        }
    }

    let pack = packer.stats().clone();
    log::info!(
        "Placed {} groups ({} records), dropped {} groups ({} records)",
        pack.groups_placed,
        pack.records_placed,
        pack.groups_dropped,
        pack.records_dropped
    );

    Ok(RunSummary {
        build,
        pack,
        records: records.len(),
        groups: groups.len(),
        max_zoom: geometry.max_zoom,
        rows_written: sink.rows_written(),
        output: None,
    })
}
