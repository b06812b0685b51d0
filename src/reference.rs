//! In-memory reference genome with optional blacklist masking.

use crate::error::{KlerosError, KlerosResult};
use crate::fasta;
use crate::regions::RegionSet;
use indexmap::IndexMap;
use std::path::Path;
use tracing::info;

// Abridged ENCODE exclusion lists shipped with the crate.
const HG19_BLACKLIST: &str = include_str!("../data/blacklist/hg19.bed");
const HG38_BLACKLIST: &str = include_str!("../data/blacklist/hg38.bed");

/// Random-access retrieval of nucleotide windows from a genome.
///
/// Read-only after construction; a `&ReferenceSequence` can be shared across
/// sampling workers freely.
#[derive(Debug)]
pub struct ReferenceSequence {
    chromosomes: IndexMap<String, Vec<u8>>,
    blacklist: RegionSet,
}

impl ReferenceSequence {
    /// Load a genome from a FASTA file (gzip accepted).
    ///
    /// `blacklist_regions` is a preset name (`hg19`, `hg38`), a path to a
    /// BED file of regions, or `None` for no masking. An existing file path
    /// wins over preset lookup; anything else that is not a known preset is
    /// a configuration error.
    pub fn load(path: &Path, blacklist_regions: Option<&str>) -> KlerosResult<Self> {
        let records = fasta::parse_fasta(path)?;
        let mut chromosomes = IndexMap::with_capacity(records.len());
        for (id, sequence) in records {
            if chromosomes.insert(id.clone(), sequence).is_some() {
                return Err(KlerosError::Parse(format!(
                    "duplicate chromosome '{}' in {}",
                    id,
                    path.display()
                )));
            }
        }

        let blacklist = match blacklist_regions {
            Some(spec) => resolve_blacklist(spec)?,
            None => RegionSet::default(),
        };

        info!(
            chromosomes = chromosomes.len(),
            blacklist_regions = blacklist.region_count(),
            "loaded reference genome from {}",
            path.display()
        );

        Ok(Self {
            chromosomes,
            blacklist,
        })
    }

    /// Construct directly from parsed records. Used by tests and callers
    /// that already hold the genome in memory.
    pub fn from_records(
        records: Vec<(String, Vec<u8>)>,
        blacklist: RegionSet,
    ) -> Self {
        Self {
            chromosomes: records.into_iter().collect(),
            blacklist,
        }
    }

    /// Chromosome names in file order.
    pub fn chromosome_names(&self) -> impl Iterator<Item = &str> {
        self.chromosomes.keys().map(|s| s.as_str())
    }

    pub fn chromosome_len(&self, chromosome: &str) -> Option<usize> {
        self.chromosomes.get(chromosome).map(|s| s.len())
    }

    /// The `2 * half_length` bases centered on `center`.
    ///
    /// Fails with a retryable `OutOfBounds` error when the window crosses
    /// either chromosome boundary.
    pub fn get_window(
        &self,
        chromosome: &str,
        center: usize,
        half_length: usize,
    ) -> KlerosResult<Vec<u8>> {
        let sequence = self.chromosomes.get(chromosome).ok_or_else(|| {
            KlerosError::Configuration(format!("unknown chromosome '{}'", chromosome))
        })?;

        let start = center as i64 - half_length as i64;
        let end = center as i64 + half_length as i64;
        if start < 0 || end > sequence.len() as i64 {
            return Err(KlerosError::OutOfBounds {
                chromosome: chromosome.to_string(),
                start,
                end,
                length: sequence.len(),
            });
        }

        Ok(sequence[start as usize..end as usize].to_vec())
    }

    /// True if any blacklist region overlaps `[start, end)`.
    pub fn overlaps_blacklist(&self, chromosome: &str, start: usize, end: usize) -> bool {
        self.blacklist.overlaps(chromosome, start, end)
    }
}

/// Resolve a blacklist spec to a region set.
fn resolve_blacklist(spec: &str) -> KlerosResult<RegionSet> {
    let path = Path::new(spec);
    if path.is_file() {
        let text = std::fs::read_to_string(path)?;
        return parse_blacklist(&text, spec);
    }
    match spec {
        "hg19" => parse_blacklist(HG19_BLACKLIST, "hg19 preset"),
        "hg38" => parse_blacklist(HG38_BLACKLIST, "hg38 preset"),
        other => Err(KlerosError::Configuration(format!(
            "unsupported blacklist preset '{}' (expected hg19, hg38, or a BED file path)",
            other
        ))),
    }
}

fn parse_blacklist(text: &str, source: &str) -> KlerosResult<RegionSet> {
    let mut regions = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(KlerosError::Parse(format!(
                "{}:{}: expected at least 3 BED columns",
                source,
                lineno + 1
            )));
        }
        let start: usize = fields[1].parse().map_err(|_| {
            KlerosError::Parse(format!("{}:{}: bad start '{}'", source, lineno + 1, fields[1]))
        })?;
        let end: usize = fields[2].parse().map_err(|_| {
            KlerosError::Parse(format!("{}:{}: bad end '{}'", source, lineno + 1, fields[2]))
        })?;
        if end <= start {
            return Err(KlerosError::Parse(format!(
                "{}:{}: empty region [{}, {})",
                source,
                lineno + 1,
                start,
                end
            )));
        }
        regions.push((fields[0].to_string(), start, end));
    }
    Ok(RegionSet::from_regions(regions))
}
