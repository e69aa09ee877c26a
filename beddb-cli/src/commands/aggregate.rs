//! Aggregate command implementation - build a .beddb tileset from a transcript table

use anyhow::{Context, Result};
use beddb_core::pipeline::{aggregate_file, default_output_path, dry_run, RunSummary};
use beddb_core::{AggregateConfig, GenomicPos, ImportanceColumn, ImportanceFold};
use clap::Args;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::CliError;

#[derive(Args, Debug, Clone, Default)]
pub struct AggregateArgs {
    /// Delimited transcript file (plain or .gz)
    pub input: PathBuf,

    /// Chromosome sizes file (name<TAB>length)
    #[arg(long, required = true)]
    pub chromsizes: PathBuf,

    /// Output tileset (default: <input>.beddb)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Importance source: random, size or a 1-based column number
    #[arg(long)]
    pub importance_column: Option<ImportanceColumn>,

    /// Treat the first line as a column header
    #[arg(long)]
    pub has_header: bool,

    /// Treat the first line as data even if the config file says otherwise
    #[arg(long, conflicts_with = "has_header")]
    pub no_header: bool,

    /// Only keep intervals on this chromosome
    #[arg(long)]
    pub chromosome: Option<String>,

    /// Maximum number of genes per tile
    #[arg(long)]
    pub max_per_tile: Option<u32>,

    /// Width of the finest tiles in base pairs
    #[arg(long)]
    pub tile_size: Option<GenomicPos>,

    /// Column delimiter
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Offset added to every genome coordinate
    #[arg(long, allow_hyphen_values = true)]
    pub offset: Option<GenomicPos>,

    /// Seed for random importances and record uids
    #[arg(long)]
    pub seed: Option<u64>,

    /// How transcript importances combine per gene (last, max, sum)
    #[arg(long)]
    pub fold: Option<ImportanceFold>,

    /// 1-based column holding the gene id
    #[arg(long)]
    pub group_column: Option<usize>,

    /// Assembly name recorded in the tileset
    #[arg(long)]
    pub assembly: Option<String>,

    /// Run everything but do not write the tileset
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl AggregateArgs {
    /// Command-line values win over the configuration file.
    pub fn apply_to(&self, config: &mut AggregateConfig) {
        if let Some(column) = self.importance_column {
            config.importance_column = column;
        }
        if self.has_header {
            config.has_header = true;
        } else if self.no_header {
            config.has_header = false;
        }
        if let Some(chrom) = &self.chromosome {
            config.chromosome_filter = Some(chrom.clone());
        }
        if let Some(max) = self.max_per_tile {
            config.max_transcripts_per_tile = max;
        }
        if let Some(size) = self.tile_size {
            config.tile_base_size = size;
        }
        if let Some(delimiter) = &self.delimiter {
            config.delimiter = unescape_delimiter(delimiter);
        }
        if let Some(offset) = self.offset {
            config.global_offset = offset;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(fold) = self.fold {
            config.importance_fold = fold;
        }
        if let Some(column) = self.group_column {
            config.group_key_column = column;
        }
        if let Some(assembly) = &self.assembly {
            config.assembly = Some(assembly.clone());
        }
    }
}

/// Shells hand over `\t` literally.
fn unescape_delimiter(raw: &str) -> String {
    match raw {
        "\\t" | "tab" => "\t".to_string(),
        other => other.to_string(),
    }
}

pub fn execute(config: &Config, args: AggregateArgs) -> Result<RunSummary> {
    if !args.input.exists() {
        return Err(CliError::file_not_found(args.input.clone()).into());
    }

    let mut aggregate_config = config.aggregate_config();
    args.apply_to(&mut aggregate_config);
    aggregate_config.validate().map_err(CliError::from)?;

    log::info!("Input file: {}", args.input.display());
    log::info!("Chromosome sizes: {}", args.chromsizes.display());
    log::debug!("Settings: {:?}", aggregate_config);

    let summary = if args.dry_run {
        log::info!("Dry run: the tileset will not be written");
        let (summary, _) = dry_run(&args.input, &args.chromsizes, &aggregate_config)
            .map_err(CliError::from)?;
        summary
    } else {
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&args.input));
        log::info!("Output tileset: {}", output.display());

        aggregate_file(&args.input, &args.chromsizes, &output, &aggregate_config)
            .map_err(CliError::from)
            .with_context(|| format!("Failed to build tileset from {}", args.input.display()))?
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize run summary")?
        );
    } else {
        print_summary(&summary);
    }

    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    println!("Records parsed:     {}", summary.build.parsed);
    println!("Malformed skipped:  {}", summary.build.skipped_malformed);
    println!("Inverted (swapped): {}", summary.build.inverted);
    println!("Genes:              {}", summary.groups);
    println!("Max zoom:           {}", summary.max_zoom);
    println!(
        "Placed:             {} genes / {} intervals",
        summary.pack.groups_placed, summary.pack.records_placed
    );
    println!(
        "Dropped:            {} genes / {} intervals",
        summary.pack.groups_dropped, summary.pack.records_dropped
    );
    for (zoom, count) in &summary.pack.per_zoom {
        println!("  zoom {:>2}: {}", zoom, count);
    }
    if let Some(output) = &summary.output {
        println!("Written to:         {}", output.display());
    }
}
