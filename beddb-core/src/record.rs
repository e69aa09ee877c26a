//! Turns delimited input lines into [`IntervalRecord`]s on genome coordinates.

use crate::config::{AggregateConfig, ImportanceColumn};
use crate::coords::CoordinateMapper;
use crate::error::{BeddbError, BeddbResult};
use crate::types::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

const SLUG_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
const SLUG_LEN: usize = 22;
const UID_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Issues 22-character URL-safe record ids from a seeded generator.
#[derive(Debug, Clone)]
pub struct UidGenerator {
    rng: StdRng,
}

impl UidGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed ^ UID_SEED_SALT),
        }
    }

    pub fn next_uid(&mut self) -> String {
        let mut bits: u128 = self.rng.gen();
        let mut uid = String::with_capacity(SLUG_LEN);
        for _ in 0..SLUG_LEN {
            uid.push(SLUG_ALPHABET[(bits & 0x3f) as usize] as char);
            bits >>= 6;
        }
        uid
    }
}

/// Per-run parse counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub parsed: usize,
    pub skipped_malformed: usize,
    /// Records whose end preceded their start and were swapped.
    pub inverted: usize,
}

pub struct RecordBuilder<'a> {
    mapper: &'a CoordinateMapper,
    importance_column: ImportanceColumn,
    group_key_column: usize,
    rng: StdRng,
    uids: UidGenerator,
    stats: BuildStats,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(mapper: &'a CoordinateMapper, config: &AggregateConfig) -> Self {
        Self {
            mapper,
            importance_column: config.importance_column,
            group_key_column: config.group_key_column,
            rng: StdRng::seed_from_u64(config.seed),
            uids: UidGenerator::new(config.seed),
            stats: BuildStats::default(),
        }
    }

    /// Build one record from the split fields of input line `line`.
    ///
    /// `MalformedRecord` means the line should be skipped; `UnknownChromosome`
    /// aborts the run.
    pub fn build(&mut self, fields: &[&str], line: usize) -> BeddbResult<IntervalRecord> {
        match self.build_inner(fields, line) {
            Ok(record) => {
                self.stats.parsed += 1;
                Ok(record)
            }
            Err(e) => {
                if e.is_recoverable() {
                    self.stats.skipped_malformed += 1;
                }
                Err(e)
            }
        }
    }

    fn build_inner(&mut self, fields: &[&str], line: usize) -> BeddbResult<IntervalRecord> {
        if fields.len() < 3 {
            return Err(BeddbError::malformed(
                line,
                format!("expected at least 3 fields, got {}", fields.len()),
            ));
        }

        let mut start = parse_position(fields[1], line)?;
        let mut end = parse_position(fields[2], line)?;
        let chrom = fields[0];

        let group_key = column(fields, self.group_key_column)
            .ok_or_else(|| {
                BeddbError::malformed(line, format!("missing group key column {}", self.group_key_column))
            })?
            .to_string();

        if end < start {
            log::warn!("stop < start on line {}: {}", line, fields.join("\t"));
            std::mem::swap(&mut start, &mut end);
            self.stats.inverted += 1;
        }

        let importance = match self.importance_column {
            ImportanceColumn::Random => self.rng.gen::<f64>(),
            ImportanceColumn::Size => (end - start) as f64,
            ImportanceColumn::Column(col) => {
                let raw = column(fields, col).ok_or_else(|| {
                    BeddbError::malformed(line, format!("missing importance column {}", col))
                })?;
                raw.trim().parse::<f64>().map_err(|_| {
                    BeddbError::malformed(line, format!("invalid importance value: {}", raw))
                })?
            }
        };

        let name = fields.get(3).map(|s| s.to_string()).unwrap_or_default();

        let start_pos = self.mapper.genome_coord(chrom, start)?;
        let end_pos = self.mapper.genome_coord(chrom, end)?;

        Ok(IntervalRecord {
            start_pos,
            end_pos,
            uid: self.uids.next_uid(),
            name,
            chr_offset: start_pos - start,
            group_key,
            fields: fields.join("\t"),
            importance,
            chromosome: chrom.to_string(),
            zoom_level: None,
        })
    }

    /// Count a line rejected before it reached [`RecordBuilder::build`].
    pub fn skip_malformed(&mut self) {
        self.stats.skipped_malformed += 1;
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}

/// 1-based field lookup.
fn column<'f>(fields: &[&'f str], index: usize) -> Option<&'f str> {
    index.checked_sub(1).and_then(|i| fields.get(i)).copied()
}

fn parse_position(raw: &str, line: usize) -> BeddbResult<GenomicPos> {
    raw.trim()
        .parse::<GenomicPos>()
        .map_err(|_| BeddbError::malformed(line, format!("invalid position value: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ChromSizes;

    fn mapper() -> CoordinateMapper {
        let mut sizes = ChromSizes::new();
        sizes.add_chrom("chr1".to_string(), 10_000);
        sizes.add_chrom("chr2".to_string(), 5_000);
        CoordinateMapper::new(sizes, 0)
    }

    fn split(line: &str) -> Vec<&str> {
        line.split('\t').collect()
    }

    #[test]
    fn test_build_maps_coordinates() {
        let mapper = mapper();
        let config = AggregateConfig {
            importance_column: ImportanceColumn::Column(5),
            ..Default::default()
        };
        let mut builder = RecordBuilder::new(&mapper, &config);

        let fields = split("chr2\t100\t200\tTP53-201\t42\t-\tENSG0001\tENST0001");
        let record = builder.build(&fields, 1).unwrap();

        assert_eq!(record.start_pos, 10_100);
        assert_eq!(record.end_pos, 10_200);
        assert_eq!(record.chr_offset, 10_000);
        assert_eq!(record.name, "TP53-201");
        assert_eq!(record.group_key, "ENSG0001");
        assert_eq!(record.importance, 42.0);
        assert_eq!(record.chromosome, "chr2");
        assert_eq!(record.fields, fields.join("\t"));
        assert_eq!(record.uid.len(), 22);
        assert_eq!(record.zoom_level, None);
    }

    #[test]
    fn test_inverted_interval_is_swapped_and_counted() {
        let mapper = mapper();
        let config = AggregateConfig::default();
        let mut builder = RecordBuilder::new(&mapper, &config);

        let record = builder.build(&split("chr1\t300\t200\tx\t1\t+\tgeneB"), 1).unwrap();
        assert_eq!(record.start_pos, 200);
        assert_eq!(record.end_pos, 300);
        assert_eq!(builder.stats().inverted, 1);
        assert_eq!(builder.stats().parsed, 1);
    }

    #[test]
    fn test_size_importance() {
        let mapper = mapper();
        let config = AggregateConfig {
            importance_column: ImportanceColumn::Size,
            ..Default::default()
        };
        let mut builder = RecordBuilder::new(&mapper, &config);
        let record = builder.build(&split("chr1\t100\t350\tx\t1\t+\tgeneA"), 1).unwrap();
        assert_eq!(record.importance, 250.0);
    }

    #[test]
    fn test_malformed_positions_are_recoverable() {
        let mapper = mapper();
        let config = AggregateConfig::default();
        let mut builder = RecordBuilder::new(&mapper, &config);

        let err = builder.build(&split("chr1\tabc\t200\tx\t1\t+\tgeneA"), 3).unwrap_err();
        assert!(matches!(err, BeddbError::MalformedRecord { line: 3, .. }));
        assert!(err.is_recoverable());

        let err = builder.build(&split("chr1\t100"), 4).unwrap_err();
        assert!(err.is_recoverable());

        // Group key column missing
        let err = builder.build(&split("chr1\t100\t200"), 5).unwrap_err();
        assert!(err.is_recoverable());

        assert_eq!(builder.stats().skipped_malformed, 3);
        assert_eq!(builder.stats().parsed, 0);
    }

    #[test]
    fn test_unknown_chromosome_is_fatal() {
        let mapper = mapper();
        let config = AggregateConfig::default();
        let mut builder = RecordBuilder::new(&mapper, &config);

        let err = builder.build(&split("chrZ\t100\t200\tx\t1\t+\tgeneA"), 1).unwrap_err();
        assert!(matches!(err, BeddbError::UnknownChromosome { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_missing_name_is_empty() {
        let mapper = mapper();
        let config = AggregateConfig {
            group_key_column: 1,
            ..Default::default()
        };
        let mut builder = RecordBuilder::new(&mapper, &config);
        let record = builder.build(&split("chr1\t1\t2"), 1).unwrap();
        assert_eq!(record.name, "");
        assert_eq!(record.group_key, "chr1");
    }

    #[test]
    fn test_random_importance_is_seeded() {
        let mapper = mapper();
        let config = AggregateConfig::default();
        let line = split("chr1\t1\t2\tx\t1\t+\tgeneA");

        let draw = |seed: u64| {
            let config = AggregateConfig { seed, ..config.clone() };
            let mut builder = RecordBuilder::new(&mapper, &config);
            (0..3)
                .map(|i| {
                    let r = builder.build(&line, i).unwrap();
                    (r.importance, r.uid)
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(draw(3), draw(3));
        assert_ne!(draw(3), draw(4));
        assert!(draw(3).iter().all(|(imp, _)| (0.0..1.0).contains(imp)));
    }

    #[test]
    fn test_uids_are_unique() {
        let mut uids = UidGenerator::new(1);
        let a = uids.next_uid();
        let b = uids.next_uid();
        assert_ne!(a, b);
        assert!(a.bytes().all(|c| SLUG_ALPHABET.contains(&c)));
    }
}
