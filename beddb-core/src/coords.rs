use crate::error::{BeddbError, BeddbResult};
use crate::tiles::PyramidGeometry;
use crate::types::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct ChromInfo {
    pub id: u32,
    pub name: String,
    pub length: GenomicPos,
    /// Sum of the lengths of all chromosomes before this one.
    pub offset: GenomicPos,
}

/// Chromosome sizes in canonical order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromSizes {
    chroms: Vec<ChromInfo>,
    chrom_map: HashMap<String, u32>,
    total_length: GenomicPos,
}

impl ChromSizes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chrom(&mut self, name: String, length: GenomicPos) -> u32 {
        let id = self.chroms.len() as u32;
        let offset = self.total_length;

        self.chroms.push(ChromInfo {
            id,
            name: name.clone(),
            length,
            offset,
        });

        self.chrom_map.insert(name, id);
        self.total_length += length;
        id
    }

    /// Load a tab-delimited `name<TAB>length` file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> BeddbResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| BeddbError::fatal_config(path, e.to_string()))?;
        let sizes = Self::from_reader(BufReader::new(file), path)?;
        log::info!("Loaded {} chromosome sizes from {}", sizes.len(), path.display());
        Ok(sizes)
    }

    /// Parse chromosome sizes from any buffered source; `source` only labels errors.
    pub fn from_reader<R: BufRead>(reader: R, source: &Path) -> BeddbResult<Self> {
        let mut sizes = Self::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| BeddbError::fatal_config(source, e.to_string()))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split('\t');
            let name = parts.next().unwrap_or_default();
            let length = parts
                .next()
                .and_then(|l| l.trim().parse::<GenomicPos>().ok())
                .ok_or_else(|| {
                    BeddbError::fatal_config(source, format!("invalid length on line {}: {}", i + 1, line))
                })?;

            if sizes.get(name).is_some() {
                return Err(BeddbError::fatal_config(
                    source,
                    format!("chromosome {} listed twice (line {})", name, i + 1),
                ));
            }
            sizes.add_chrom(name.to_string(), length);
        }

        if sizes.is_empty() {
            return Err(BeddbError::fatal_config(source, "no chromosomes found"));
        }
        Ok(sizes)
    }

    pub fn get(&self, name: &str) -> Option<&ChromInfo> {
        self.chrom_map.get(name).and_then(|&id| self.chroms.get(id as usize))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChromInfo> {
        self.chroms.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn sizes(&self) -> Vec<GenomicPos> {
        self.iter().map(|c| c.length).collect()
    }

    pub fn total_length(&self) -> GenomicPos {
        self.total_length
    }

    pub fn len(&self) -> usize {
        self.chroms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chroms.is_empty()
    }
}

/// Maps chromosome-local positions onto the concatenated genome coordinate space.
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    chroms: ChromSizes,
    global_offset: GenomicPos,
}

impl CoordinateMapper {
    pub fn new(chroms: ChromSizes, global_offset: GenomicPos) -> Self {
        Self { chroms, global_offset }
    }

    /// Cumulative length of every chromosome before `chrom`.
    pub fn chrom_offset(&self, chrom: &str) -> BeddbResult<GenomicPos> {
        self.chroms
            .get(chrom)
            .map(|c| c.offset)
            .ok_or_else(|| BeddbError::UnknownChromosome { chrom: chrom.to_string() })
    }

    pub fn genome_coord(&self, chrom: &str, local_pos: GenomicPos) -> BeddbResult<GenomicPos> {
        Ok(self.chrom_offset(chrom)? + local_pos + self.global_offset)
    }

    /// Sum of all chromosome lengths plus one.
    pub fn assembly_length(&self) -> GenomicPos {
        self.chroms.total_length() + 1
    }

    pub fn max_zoom(&self, tile_base_size: GenomicPos) -> ZoomLevel {
        PyramidGeometry::for_assembly(self.assembly_length(), tile_base_size).max_zoom
    }

    pub fn chrom_sizes(&self) -> &ChromSizes {
        &self.chroms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn two_chroms() -> ChromSizes {
        let mut sizes = ChromSizes::new();
        sizes.add_chrom("chr1".to_string(), 1000);
        sizes.add_chrom("chr2".to_string(), 500);
        sizes
    }

    #[test]
    fn test_offsets_are_cumulative_and_increasing() {
        let mut sizes = two_chroms();
        sizes.add_chrom("chrX".to_string(), 300);
        let mapper = CoordinateMapper::new(sizes, 0);

        let offsets: Vec<_> = mapper.chrom_sizes().iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![0, 1000, 1500]);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_genome_coord_includes_global_offset() {
        let mapper = CoordinateMapper::new(two_chroms(), 7);
        assert_eq!(mapper.genome_coord("chr1", 0).unwrap(), 7);
        assert_eq!(mapper.genome_coord("chr2", 0).unwrap(), 1007);
        assert_eq!(mapper.genome_coord("chr2", 42).unwrap(), 1049);
    }

    #[test]
    fn test_unknown_chromosome() {
        let mapper = CoordinateMapper::new(two_chroms(), 0);
        let err = mapper.genome_coord("chrUn", 10).unwrap_err();
        assert!(matches!(err, BeddbError::UnknownChromosome { ref chrom } if chrom == "chrUn"));
    }

    #[test]
    fn test_assembly_length_and_max_zoom() {
        let mapper = CoordinateMapper::new(two_chroms(), 0);
        assert_eq!(mapper.assembly_length(), 1501);
        // 1501 / 1024 -> log2(1.47) -> 1
        assert_eq!(mapper.max_zoom(1024), 1);
        // 1501 / 100 -> log2(15.01) -> 4
        assert_eq!(mapper.max_zoom(100), 4);
    }

    #[test]
    fn test_parse_chromsizes() {
        let data = "# hg-test\nchr1\t248956422\n\nchr2\t242193529\n";
        let sizes = ChromSizes::from_reader(Cursor::new(data), Path::new("test")).unwrap();
        assert_eq!(sizes.names(), vec!["chr1", "chr2"]);
        assert_eq!(sizes.sizes(), vec![248956422, 242193529]);
        assert_eq!(sizes.get("chr2").unwrap().offset, 248956422);
    }

    #[test]
    fn test_parse_chromsizes_rejects_bad_length() {
        let err = ChromSizes::from_reader(Cursor::new("chr1\tabc\n"), Path::new("bad")).unwrap_err();
        assert!(matches!(err, BeddbError::FatalConfiguration { .. }));

        let err = ChromSizes::from_reader(Cursor::new(""), Path::new("empty")).unwrap_err();
        assert!(matches!(err, BeddbError::FatalConfiguration { .. }));
    }

    #[test]
    fn test_parse_chromsizes_rejects_duplicate_names() {
        let data = "chr1\t1000\nchr2\t500\nchr1\t1000\n";
        let err = ChromSizes::from_reader(Cursor::new(data), Path::new("dup")).unwrap_err();
        assert!(matches!(err, BeddbError::FatalConfiguration { ref reason, .. } if reason.contains("chr1")));
    }

    #[test]
    fn test_missing_chromsizes_file_is_fatal() {
        let err = ChromSizes::from_path("/nonexistent/hg38.chrom.sizes").unwrap_err();
        assert!(matches!(err, BeddbError::FatalConfiguration { .. }));
    }
}
