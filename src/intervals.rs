//! Labeled genomic intervals, grouped by chromosome, and holdout
//! partitioning into train/validation/test splits.
//!
//! The partition is an explicit chromosome -> split mapping. A chromosome
//! is assigned to exactly one split, which is what keeps evaluation data
//! free of coordinate leakage from training.

use crate::error::{KlerosError, KlerosResult};
use crate::features::FeatureIndex;
use crate::regions::RegionSet;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Which dataset a chromosome's coordinates feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Validation, Split::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "validation",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
    #[serde(rename = ".")]
    Unknown,
}

impl Strand {
    fn from_field(field: &str) -> Option<Strand> {
        match field {
            "+" => Some(Strand::Forward),
            "-" => Some(Strand::Reverse),
            "." => Some(Strand::Unknown),
            _ => None,
        }
    }
}

/// A labeled genomic coordinate range. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub chromosome: String,
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
    /// Feature columns whose annotations cover at least the configured
    /// fraction of this interval's prediction bin.
    pub feature_ids: BTreeSet<usize>,
}

impl Interval {
    pub fn midpoint(&self) -> usize {
        (self.start + self.end) / 2
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holdout request for one evaluation split: explicit chromosome names or a
/// target fraction of total interval mass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HoldoutSpec {
    Chromosomes(Vec<String>),
    Proportion(f64),
}

impl HoldoutSpec {
    pub fn none() -> Self {
        HoldoutSpec::Chromosomes(Vec::new())
    }
}

/// How proportional holdout mass is measured. The upstream tooling never
/// pinned this down, so it is a named policy instead of a hardcoded guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HoldoutMetric {
    /// Count intervals per chromosome.
    #[default]
    IntervalCount,
    /// Sum interval lengths per chromosome.
    BasePairs,
}

/// The chromosome -> split assignment produced by `IntervalCatalog::partition`.
#[derive(Debug, Clone, Serialize)]
pub struct SplitPartition {
    assignment: IndexMap<String, Split>,
}

impl SplitPartition {
    pub fn split_of(&self, chromosome: &str) -> Option<Split> {
        self.assignment.get(chromosome).copied()
    }

    /// Chromosomes assigned to `split`, in catalog order.
    pub fn chromosomes(&self, split: Split) -> Vec<&str> {
        self.assignment
            .iter()
            .filter(|(_, &s)| s == split)
            .map(|(chrom, _)| chrom.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Split)> {
        self.assignment.iter().map(|(chrom, &s)| (chrom.as_str(), s))
    }
}

struct BedRow {
    chromosome: String,
    start: usize,
    end: usize,
    strand: Strand,
    feature_id: Option<usize>,
}

/// Per-chromosome target annotations, sorted by start, with a running
/// maximum of region ends so bin queries can binary-search a lower bound.
struct ChromTargets {
    rows: Vec<(usize, usize, usize)>, // (start, end, feature_id)
    prefix_max_end: Vec<usize>,
}

impl ChromTargets {
    fn new(mut rows: Vec<(usize, usize, usize)>) -> Self {
        rows.sort_unstable();
        let mut prefix_max_end = Vec::with_capacity(rows.len());
        let mut max_end = 0;
        for &(_, end, _) in &rows {
            max_end = max_end.max(end);
            prefix_max_end.push(max_end);
        }
        Self {
            rows,
            prefix_max_end,
        }
    }

    /// All rows overlapping `[start, end)`.
    fn overlapping(&self, start: usize, end: usize) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        let from = self.prefix_max_end.partition_point(|&e| e <= start);
        self.rows[from..]
            .iter()
            .take_while(move |&&(row_start, _, _)| row_start < end)
            .filter(move |&&(row_start, row_end, _)| row_start < end && row_end > start)
            .copied()
    }
}

/// Stores labeled intervals grouped by chromosome and answers the
/// "does this window touch anything labeled" query negative draws need.
#[derive(Debug)]
pub struct IntervalCatalog {
    by_chromosome: IndexMap<String, Vec<Interval>>,
    labeled: RegionSet,
    n_intervals: usize,
}

impl IntervalCatalog {
    /// Load the catalog.
    ///
    /// `target_path` is a BED-like file of feature annotations
    /// (`chrom  start  end  [strand]  feature`). `intervals_path`, when
    /// given, supplies the sampling intervals separately (features in it are
    /// ignored); otherwise every target row doubles as a sampling interval.
    ///
    /// Each interval's `feature_ids` holds the features whose annotations
    /// cover at least `threshold` of the `center_bin` bases centered on the
    /// interval midpoint. Coverage below the threshold is treated as noise.
    pub fn load(
        target_path: &Path,
        intervals_path: Option<&Path>,
        features: &FeatureIndex,
        center_bin: usize,
        threshold: f64,
    ) -> KlerosResult<Self> {
        let target_rows = parse_bed(target_path, Some(features))?;
        if target_rows.is_empty() {
            return Err(KlerosError::InsufficientData(format!(
                "no intervals loaded from {}",
                target_path.display()
            )));
        }

        let mut targets_by_chrom: IndexMap<String, Vec<(usize, usize, usize)>> = IndexMap::new();
        for row in &target_rows {
            targets_by_chrom
                .entry(row.chromosome.clone())
                .or_default()
                // parse_bed resolved the feature column, so the id is present
                .push((row.start, row.end, row.feature_id.unwrap_or(0)));
        }
        let targets: IndexMap<String, ChromTargets> = targets_by_chrom
            .into_iter()
            .map(|(chrom, rows)| (chrom, ChromTargets::new(rows)))
            .collect();

        let sources: Vec<BedRow> = match intervals_path {
            Some(path) => parse_bed(path, None)?,
            None => target_rows,
        };
        if sources.is_empty() {
            return Err(KlerosError::InsufficientData(
                "interval source file is empty".to_string(),
            ));
        }

        let bin_floor = threshold * center_bin as f64;
        let mut by_chromosome: IndexMap<String, Vec<Interval>> = IndexMap::new();
        let mut labeled_spans = Vec::with_capacity(sources.len());
        let mut n_intervals = 0;

        for row in sources {
            let midpoint = (row.start + row.end) / 2;
            let bin_start = midpoint.saturating_sub(center_bin / 2);
            let bin_end = bin_start + center_bin;

            let mut feature_ids = BTreeSet::new();
            if let Some(chrom_targets) = targets.get(&row.chromosome) {
                for (t_start, t_end, feature_id) in chrom_targets.overlapping(bin_start, bin_end) {
                    let overlap = t_end.min(bin_end) - t_start.max(bin_start);
                    if overlap as f64 >= bin_floor {
                        feature_ids.insert(feature_id);
                    }
                }
            }

            labeled_spans.push((row.chromosome.clone(), row.start, row.end));
            by_chromosome
                .entry(row.chromosome.clone())
                .or_default()
                .push(Interval {
                    chromosome: row.chromosome,
                    start: row.start,
                    end: row.end,
                    strand: row.strand,
                    feature_ids,
                });
            n_intervals += 1;
        }

        // Stable per-chromosome order regardless of file order.
        for intervals in by_chromosome.values_mut() {
            intervals.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
        }

        // Negative draws must avoid every annotated span, including sampling
        // intervals whose bin coverage fell below the threshold.
        labeled_spans.extend(
            targets
                .iter()
                .flat_map(|(chrom, t)| {
                    t.rows
                        .iter()
                        .map(move |&(start, end, _)| (chrom.clone(), start, end))
                }),
        );
        let labeled = RegionSet::from_regions(labeled_spans);

        info!(
            intervals = n_intervals,
            chromosomes = by_chromosome.len(),
            "loaded interval catalog from {}",
            target_path.display()
        );

        Ok(Self {
            by_chromosome,
            labeled,
            n_intervals,
        })
    }

    pub fn n_intervals(&self) -> usize {
        self.n_intervals
    }

    /// Chromosome names in load order.
    pub fn chromosome_names(&self) -> impl Iterator<Item = &str> {
        self.by_chromosome.keys().map(|s| s.as_str())
    }

    pub fn intervals_on(&self, chromosome: &str) -> &[Interval] {
        self.by_chromosome
            .get(chromosome)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// True if `[start, end)` overlaps any labeled span from any split.
    pub fn overlaps_labeled(&self, chromosome: &str, start: usize, end: usize) -> bool {
        self.labeled.overlaps(chromosome, start, end)
    }

    fn chromosome_mass(&self, chromosome: &str, metric: HoldoutMetric) -> usize {
        let intervals = self.intervals_on(chromosome);
        match metric {
            HoldoutMetric::IntervalCount => intervals.len(),
            HoldoutMetric::BasePairs => intervals.iter().map(|i| i.len()).sum(),
        }
    }

    /// Assign every chromosome to exactly one split.
    ///
    /// Test is carved out first, then validation from the remainder; train
    /// gets the rest. Proportional specs shuffle the remaining chromosomes
    /// once with the seeded generator and assign greedily in that stable
    /// order until cumulative mass reaches the target.
    pub fn partition(
        &self,
        test: &HoldoutSpec,
        validation: &HoldoutSpec,
        metric: HoldoutMetric,
        seed: u64,
    ) -> KlerosResult<SplitPartition> {
        let mut assignment: IndexMap<String, Split> = self
            .by_chromosome
            .keys()
            .map(|chrom| (chrom.clone(), Split::Train))
            .collect();
        let total_mass: usize = assignment
            .keys()
            .map(|chrom| self.chromosome_mass(chrom, metric))
            .sum();
        let mut rng = StdRng::seed_from_u64(seed);

        self.assign_holdout(&mut assignment, test, Split::Test, metric, total_mass, &mut rng)?;
        self.assign_holdout(
            &mut assignment,
            validation,
            Split::Validation,
            metric,
            total_mass,
            &mut rng,
        )?;

        if !assignment.values().any(|&s| s == Split::Train) {
            return Err(KlerosError::InsufficientData(
                "holdout specs left no chromosomes for the train split".to_string(),
            ));
        }

        for split in Split::ALL {
            info!(
                split = %split,
                chromosomes = assignment.values().filter(|&&s| s == split).count(),
                "partitioned chromosomes"
            );
        }

        Ok(SplitPartition { assignment })
    }

    fn assign_holdout(
        &self,
        assignment: &mut IndexMap<String, Split>,
        spec: &HoldoutSpec,
        split: Split,
        metric: HoldoutMetric,
        total_mass: usize,
        rng: &mut StdRng,
    ) -> KlerosResult<()> {
        match spec {
            HoldoutSpec::Chromosomes(chroms) => {
                for chrom in chroms {
                    match assignment.get_mut(chrom) {
                        None => {
                            return Err(KlerosError::InsufficientData(format!(
                                "holdout chromosome '{}' not present in loaded intervals",
                                chrom
                            )));
                        }
                        Some(slot) if *slot != Split::Train => {
                            return Err(KlerosError::Configuration(format!(
                                "chromosome '{}' requested for both {} and {} holdouts",
                                chrom, *slot, split
                            )));
                        }
                        Some(slot) => *slot = split,
                    }
                }
                Ok(())
            }
            HoldoutSpec::Proportion(proportion) => {
                let mut pool: Vec<String> = assignment
                    .iter()
                    .filter(|(_, &s)| s == Split::Train)
                    .map(|(chrom, _)| chrom.clone())
                    .collect();
                pool.shuffle(rng);

                let target = proportion * total_mass as f64;
                let mut cumulative = 0.0;
                for chrom in pool {
                    if cumulative >= target {
                        break;
                    }
                    cumulative += self.chromosome_mass(&chrom, metric) as f64;
                    assignment[&chrom] = split;
                }
                if cumulative < target {
                    return Err(KlerosError::InsufficientData(format!(
                        "cannot reach {} holdout proportion {}: only {:.0} of {:.0} interval mass available",
                        split, proportion, cumulative, target
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Parse a BED-like interval file.
///
/// Accepted layouts per row: `chrom start end feature`,
/// `chrom start end strand feature`, or (when `features` is `None`, i.e. a
/// sampling-interval file) bare `chrom start end [strand]`.
fn parse_bed(path: &Path, features: Option<&FeatureIndex>) -> KlerosResult<Vec<BedRow>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut rows = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let context = |msg: String| {
            KlerosError::Parse(format!("{}:{}: {}", path.display(), lineno + 1, msg))
        };

        if fields.len() < 3 {
            return Err(context("expected at least 3 BED columns".to_string()));
        }
        let start: usize = fields[1]
            .parse()
            .map_err(|_| context(format!("bad start coordinate '{}'", fields[1])))?;
        let end: usize = fields[2]
            .parse()
            .map_err(|_| context(format!("bad end coordinate '{}'", fields[2])))?;
        if end <= start {
            return Err(context(format!("empty interval [{}, {})", start, end)));
        }

        let (strand, feature_field) = match fields.get(3).and_then(|f| Strand::from_field(f)) {
            Some(strand) => (strand, fields.get(4)),
            None => (Strand::Unknown, fields.get(3)),
        };

        let feature_id = match features {
            Some(index) => {
                let name = feature_field
                    .ok_or_else(|| context("missing feature column".to_string()))?;
                Some(index.index_of(name)?)
            }
            None => None,
        };

        rows.push(BedRow {
            chromosome: fields[0].to_string(),
            start,
            end,
            strand,
            feature_id,
        });
    }

    Ok(rows)
}
