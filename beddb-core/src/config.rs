//! Run configuration for a tileset build

use crate::aggregate::ImportanceFold;
use crate::error::{BeddbError, BeddbResult};
use crate::tiles::{DEFAULT_MAX_PER_TILE, DEFAULT_TILE_SIZE};
use crate::types::GenomicPos;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seed of the importance / uid generators when none is configured.
pub const DEFAULT_SEED: u64 = 3;

/// Where a record's importance comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ImportanceValue", into = "ImportanceValue")]
pub enum ImportanceColumn {
    /// Uniform draw from the run's seeded generator.
    #[default]
    Random,
    /// `end - start`.
    Size,
    /// 1-based column index.
    Column(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ImportanceValue {
    Index(usize),
    Name(String),
}

impl TryFrom<ImportanceValue> for ImportanceColumn {
    type Error = String;

    fn try_from(value: ImportanceValue) -> Result<Self, Self::Error> {
        match value {
            ImportanceValue::Index(0) => Err("importance column index is 1-based".to_string()),
            ImportanceValue::Index(i) => Ok(Self::Column(i)),
            ImportanceValue::Name(name) => name.parse(),
        }
    }
}

impl From<ImportanceColumn> for ImportanceValue {
    fn from(column: ImportanceColumn) -> Self {
        match column {
            ImportanceColumn::Random => Self::Name("random".to_string()),
            ImportanceColumn::Size => Self::Name("size".to_string()),
            ImportanceColumn::Column(i) => Self::Index(i),
        }
    }
}

impl FromStr for ImportanceColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random" | "none" | "" => Ok(Self::Random),
            "size" => Ok(Self::Size),
            other => match other.parse::<usize>() {
                Ok(0) => Err("importance column index is 1-based".to_string()),
                Ok(i) => Ok(Self::Column(i)),
                Err(_) => Err(format!(
                    "invalid importance column '{}': expected 'random', 'size' or a column number",
                    s
                )),
            },
        }
    }
}

impl fmt::Display for ImportanceColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::Size => write!(f, "size"),
            Self::Column(i) => write!(f, "{}", i),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    #[serde(default)]
    pub importance_column: ImportanceColumn,

    /// Treat the first input line as column names.
    #[serde(default)]
    pub has_header: bool,

    /// Only keep records on this chromosome.
    #[serde(default)]
    pub chromosome_filter: Option<String>,

    #[serde(default = "default_max_per_tile")]
    pub max_transcripts_per_tile: u32,

    #[serde(default = "default_tile_size")]
    pub tile_base_size: GenomicPos,

    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Added to every genome coordinate.
    #[serde(default)]
    pub global_offset: GenomicPos,

    /// 1-based column holding the grouping key (gene id).
    #[serde(default = "default_group_key_column")]
    pub group_key_column: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub importance_fold: ImportanceFold,

    /// Assembly name stored in `tileset_info`.
    #[serde(default)]
    pub assembly: Option<String>,
}

fn default_max_per_tile() -> u32 { DEFAULT_MAX_PER_TILE }
fn default_tile_size() -> GenomicPos { DEFAULT_TILE_SIZE }
fn default_delimiter() -> String { "\t".to_string() }
fn default_group_key_column() -> usize { 7 }
fn default_seed() -> u64 { DEFAULT_SEED }

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            importance_column: ImportanceColumn::default(),
            has_header: false,
            chromosome_filter: None,
            max_transcripts_per_tile: default_max_per_tile(),
            tile_base_size: default_tile_size(),
            delimiter: default_delimiter(),
            global_offset: 0,
            group_key_column: default_group_key_column(),
            seed: default_seed(),
            importance_fold: ImportanceFold::default(),
            assembly: None,
        }
    }
}

impl AggregateConfig {
    pub fn validate(&self) -> BeddbResult<()> {
        if self.tile_base_size <= 0 {
            return Err(BeddbError::InvalidConfig(format!(
                "tile size must be positive, got {}",
                self.tile_base_size
            )));
        }
        if self.max_transcripts_per_tile == 0 {
            return Err(BeddbError::InvalidConfig(
                "max transcripts per tile must be at least 1".to_string(),
            ));
        }
        if self.delimiter.is_empty() {
            return Err(BeddbError::InvalidConfig("delimiter must not be empty".to_string()));
        }
        if self.importance_column == ImportanceColumn::Column(0) {
            return Err(BeddbError::InvalidConfig("importance column is 1-based".to_string()));
        }
        if self.group_key_column == 0 {
            return Err(BeddbError::InvalidConfig("group key column is 1-based".to_string()));
        }
        Ok(())
    }
}
