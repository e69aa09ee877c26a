//! Configuration handling for beddb CLI
//!
//! Supports loading configuration from beddb.toml files with CLI argument overrides.

use anyhow::{Context, Result};
use beddb_core::config::DEFAULT_SEED;
use beddb_core::tiles::{DEFAULT_MAX_PER_TILE, DEFAULT_TILE_SIZE};
use beddb_core::{AggregateConfig, GenomicPos, ImportanceColumn, ImportanceFold};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub tiling: TilingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Seed for random importances and record uids
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Assembly name recorded in the tileset
    #[serde(default)]
    pub assembly: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[serde(default)]
    pub has_header: bool,

    /// "random", "size" or a 1-based column number
    #[serde(default)]
    pub importance_column: ImportanceColumn,

    /// 1-based column holding the gene id
    #[serde(default = "default_group_column")]
    pub group_column: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilingConfig {
    #[serde(default = "default_max_per_tile")]
    pub max_per_tile: u32,

    #[serde(default = "default_tile_size")]
    pub tile_size: GenomicPos,

    /// Added to every genome coordinate
    #[serde(default)]
    pub offset: GenomicPos,

    /// How transcript importances combine per gene: last, max or sum
    #[serde(default)]
    pub fold: ImportanceFold,
}

// Default value functions
fn default_seed() -> u64 { DEFAULT_SEED }
fn default_delimiter() -> String { "\t".to_string() }
fn default_group_column() -> usize { 7 }
fn default_max_per_tile() -> u32 { DEFAULT_MAX_PER_TILE }
fn default_tile_size() -> GenomicPos { DEFAULT_TILE_SIZE }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            assembly: None,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: false,
            importance_column: ImportanceColumn::default(),
            group_column: default_group_column(),
        }
    }
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            max_per_tile: default_max_per_tile(),
            tile_size: default_tile_size(),
            offset: 0,
            fold: ImportanceFold::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                // Try to find beddb.toml in current directory
                let default_path = PathBuf::from("beddb.toml");
                if default_path.exists() {
                    log::info!("Loading configuration from: beddb.toml");
                    Self::load_from_file(&default_path)?
                } else {
                    log::debug!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Run settings before command-line overrides.
    pub fn aggregate_config(&self) -> AggregateConfig {
        AggregateConfig {
            importance_column: self.input.importance_column,
            has_header: self.input.has_header,
            chromosome_filter: None,
            max_transcripts_per_tile: self.tiling.max_per_tile,
            tile_base_size: self.tiling.tile_size,
            delimiter: self.input.delimiter.clone(),
            global_offset: self.tiling.offset,
            group_key_column: self.input.group_column,
            seed: self.general.seed,
            importance_fold: self.tiling.fold,
            assembly: self.general.assembly.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_matches_core_defaults() {
        let config = Config::default();
        assert_eq!(config.aggregate_config(), AggregateConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            "[input]\nimportance_column = 5\nhas_header = true\n\n[tiling]\nmax_per_tile = 12\nfold = \"max\"\n"
        )?;

        let config = Config::load(Some(file.path()))?;
        let aggregate = config.aggregate_config();
        assert_eq!(aggregate.importance_column, ImportanceColumn::Column(5));
        assert!(aggregate.has_header);
        assert_eq!(aggregate.max_transcripts_per_tile, 12);
        assert_eq!(aggregate.importance_fold, ImportanceFold::Max);
        assert_eq!(aggregate.tile_base_size, 1024);
        assert_eq!(aggregate.seed, 3);
        assert_eq!(aggregate.delimiter, "\t");
        Ok(())
    }

    #[test]
    fn test_config_roundtrip() -> Result<()> {
        let mut config = Config::default();
        config.input.importance_column = ImportanceColumn::Size;
        config.general.assembly = Some("hg38".to_string());

        let content = toml::to_string_pretty(&config)?;
        assert!(content.contains("[general]"));
        assert!(content.contains("[tiling]"));

        let loaded: Config = toml::from_str(&content)?;
        assert_eq!(loaded.aggregate_config(), config.aggregate_config());
        Ok(())
    }

    #[test]
    fn test_bad_file_is_an_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[tiling]\nmax_per_tile = \"lots\"")?;
        assert!(Config::load(Some(file.path())).is_err());
        assert!(Config::load(Some(Path::new("/nonexistent/beddb.toml"))).is_err());
        Ok(())
    }
}
