//! Input readers for delimited interval files
//!
//! Plain or gzip-compressed text; one interval per line, split on the configured
//! delimiter and handed to a [`RecordBuilder`].

use crate::config::AggregateConfig;
use crate::error::{BeddbError, BeddbResult};
use crate::record::RecordBuilder;
use crate::types::IntervalRecord;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Records of one input file plus its column header.
#[derive(Debug, Clone, Default)]
pub struct IntervalFile {
    pub header: Vec<String>,
    pub records: Vec<IntervalRecord>,
}

/// Open `path` for line reading, decompressing when it ends in `.gz`.
pub fn open_input<P: AsRef<Path>>(path: P) -> BeddbResult<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path)?;

    if path.to_string_lossy().to_lowercase().ends_with(".gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Parse every line of `reader` into records.
///
/// Malformed lines, including ones that are not valid UTF-8, are logged and
/// skipped. Unknown chromosomes and I/O errors end the read.
pub fn read_intervals<R: BufRead>(
    mut reader: R,
    builder: &mut RecordBuilder<'_>,
    config: &AggregateConfig,
) -> BeddbResult<IntervalFile> {
    let delimiter = config.delimiter.as_str();
    let mut out = IntervalFile::default();
    let mut first = true;
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let line = match std::str::from_utf8(&buf) {
            Ok(text) => text.trim(),
            Err(e) => {
                first = false;
                builder.skip_malformed();
                let err = BeddbError::malformed(line_no, format!("invalid UTF-8: {}", e));
                log::warn!("Invalid line skipped: {}", err);
                continue;
            }
        };

        if first {
            first = false;
            if config.has_header {
                out.header = line.split(delimiter).map(str::to_string).collect();
                continue;
            }
            let columns = line.split(delimiter).count();
            out.header = (1..=columns).map(|c| c.to_string()).collect();
        }

        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(delimiter).collect();
        match builder.build(&fields, line_no) {
            Ok(record) => out.records.push(record),
            Err(e) if e.is_recoverable() => log::warn!("Invalid line skipped: {}", e),
            Err(e) => return Err(e),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{ChromSizes, CoordinateMapper};
    use crate::error::BeddbError;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};
    use tempfile::Builder;

    fn mapper() -> CoordinateMapper {
        let mut sizes = ChromSizes::new();
        sizes.add_chrom("chr1".to_string(), 100_000);
        sizes.add_chrom("chr2".to_string(), 100_000);
        CoordinateMapper::new(sizes, 0)
    }

    const LINES: &str = "chr1\t100\t200\tA-201\t5\t+\tgeneA\n\
                         chr1\tx\t250\tA-202\t5\t+\tgeneA\n\
                         \n\
                         chr2\t10\t20\tB-201\t3\t-\tgeneB\n";

    #[test]
    fn test_read_without_header_numbers_columns() {
        let mapper = mapper();
        let config = AggregateConfig::default();
        let mut builder = RecordBuilder::new(&mapper, &config);

        let file = read_intervals(Cursor::new(LINES), &mut builder, &config).unwrap();
        assert_eq!(file.header, vec!["1", "2", "3", "4", "5", "6", "7"]);
        assert_eq!(file.records.len(), 2);
        assert_eq!(file.records[1].start_pos, 100_010);
        assert_eq!(builder.stats().skipped_malformed, 1);
    }

    #[test]
    fn test_read_with_header() {
        let mapper = mapper();
        let config = AggregateConfig {
            has_header: true,
            ..Default::default()
        };
        let mut builder = RecordBuilder::new(&mapper, &config);

        let data = format!("chr\tstart\tend\tname\tscore\tstrand\tgene\n{}", LINES);
        let file = read_intervals(Cursor::new(data), &mut builder, &config).unwrap();
        assert_eq!(file.header[0], "chr");
        assert_eq!(file.header[6], "gene");
        assert_eq!(file.records.len(), 2);
    }

    #[test]
    fn test_custom_delimiter() {
        let mapper = mapper();
        let config = AggregateConfig {
            delimiter: ",".to_string(),
            ..Default::default()
        };
        let mut builder = RecordBuilder::new(&mapper, &config);
        let file = read_intervals(Cursor::new("chr1,5,15,n,1,+,g\n"), &mut builder, &config).unwrap();
        assert_eq!(file.records.len(), 1);
        assert_eq!(file.records[0].fields, "chr1\t5\t15\tn\t1\t+\tg");
    }

    #[test]
    fn test_unknown_chromosome_aborts_read() {
        let mapper = mapper();
        let config = AggregateConfig::default();
        let mut builder = RecordBuilder::new(&mapper, &config);

        let data = "chr1\t1\t2\ta\t1\t+\tg\nchrUn_1\t1\t2\ta\t1\t+\tg\n";
        let err = read_intervals(Cursor::new(data), &mut builder, &config).unwrap_err();
        assert!(matches!(err, BeddbError::UnknownChromosome { .. }));
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mapper = mapper();
        let config = AggregateConfig::default();
        let mut builder = RecordBuilder::new(&mapper, &config);

        let mut data = b"chr1\t1\t2\ta\t1\t+\tg1\n".to_vec();
        data.extend_from_slice(b"chr1\t5\t9\t\xff\xfe\t1\t+\tg2\n");
        data.extend_from_slice(b"chr2\t3\t4\tc\t1\t+\tg3\n");

        let file = read_intervals(Cursor::new(data), &mut builder, &config).unwrap();
        let names: Vec<_> = file.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(builder.stats().skipped_malformed, 1);
        assert_eq!(builder.stats().parsed, 2);
    }

    #[test]
    fn test_open_gzip_input() {
        let mut tmp = Builder::new().suffix(".tsv.gz").tempfile().unwrap();
        {
            let mut enc = GzEncoder::new(tmp.as_file_mut(), Compression::default());
            enc.write_all(LINES.as_bytes()).unwrap();
            enc.finish().unwrap();
        }

        let mapper = mapper();
        let config = AggregateConfig::default();
        let mut builder = RecordBuilder::new(&mapper, &config);
        let reader = open_input(tmp.path()).unwrap();
        let file = read_intervals(reader, &mut builder, &config).unwrap();
        assert_eq!(file.records.len(), 2);
    }
}
