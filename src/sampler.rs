//! Windowed example sampling: draws (sequence, label-vector) records from
//! the reference genome with a seeded, owned generator.
//!
//! One `Sampler` owns one `SamplerState`; `draw` mutates the generator, so
//! concurrent workers must each hold their own sampler with an
//! independently derived seed (`seed + worker_index`).

use crate::encode;
use crate::error::{KlerosError, KlerosResult};
use crate::features::FeatureIndex;
use crate::intervals::{Interval, IntervalCatalog, Split, SplitPartition, Strand};
use crate::reference::ReferenceSequence;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::trace;

/// Probability of a negative draw when `sample_negative` is enabled.
pub const NEGATIVE_DRAW_PROBABILITY: f64 = 0.5;

/// Default retry budget for rejected negative candidates.
pub const DEFAULT_NEGATIVE_RETRIES: u32 = 100;

/// One drawn example. Ephemeral: consumed by the materializer or the
/// training loop as soon as it is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub chromosome: String,
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
    pub split: Split,
    pub is_negative: bool,
    #[serde(with = "sequence_text")]
    pub sequence: Vec<u8>,
    pub labels: Vec<f32>,
}

impl SampleRecord {
    /// One-hot encoding of the window over the `AGCT` alphabet.
    pub fn one_hot(&self) -> Vec<[f32; 4]> {
        encode::encode_one_hot(&self.sequence)
    }
}

// Sequence windows are plain ASCII; snapshots store them as strings rather
// than byte arrays.
mod sequence_text {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| S::Error::custom("non-ASCII sequence window"))?;
        ser.serialize_str(text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(de)?;
        if !text.is_ascii() {
            return Err(D::Error::custom("non-ASCII sequence window"));
        }
        Ok(text.into_bytes())
    }
}

/// Sampling knobs lifted from the configuration.
#[derive(Debug, Clone)]
pub struct SamplerOptions {
    /// Window size per sample. Must be even so the prediction bin sits
    /// centered around the draw coordinate.
    pub sequence_length: usize,
    /// When false every draw is positive.
    pub sample_negative: bool,
    pub negative_retries: u32,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            sequence_length: 1000,
            sample_negative: false,
            negative_retries: DEFAULT_NEGATIVE_RETRIES,
        }
    }
}

/// Mutable per-session sampling state. Reproducibility comes from replaying
/// the seed, never from persisting this.
#[derive(Debug)]
pub struct SamplerState {
    rng: StdRng,
    draws: u64,
}

impl SamplerState {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            draws: 0,
        }
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }
}

#[derive(Debug, Default)]
struct SplitPool {
    intervals: Vec<Interval>,
    chromosomes: Vec<String>,
}

fn pool_index(split: Split) -> usize {
    match split {
        Split::Train => 0,
        Split::Validation => 1,
        Split::Test => 2,
    }
}

/// Draws windowed (sequence, label-vector) examples for a target split.
#[derive(Debug)]
pub struct Sampler<'a> {
    reference: &'a ReferenceSequence,
    catalog: &'a IntervalCatalog,
    features: &'a FeatureIndex,
    pools: [SplitPool; 3],
    options: SamplerOptions,
    state: SamplerState,
}

impl<'a> Sampler<'a> {
    pub fn new(
        reference: &'a ReferenceSequence,
        catalog: &'a IntervalCatalog,
        features: &'a FeatureIndex,
        partition: &SplitPartition,
        options: SamplerOptions,
        seed: u64,
    ) -> KlerosResult<Self> {
        if options.sequence_length == 0 || options.sequence_length % 2 != 0 {
            return Err(KlerosError::Configuration(format!(
                "sequence_length must be a positive even number, got {}",
                options.sequence_length
            )));
        }
        if options.negative_retries == 0 {
            return Err(KlerosError::Configuration(
                "negative_retries must be at least 1".to_string(),
            ));
        }

        let mut pools: [SplitPool; 3] = Default::default();
        for chromosome in catalog.chromosome_names() {
            if reference.chromosome_len(chromosome).is_none() {
                return Err(KlerosError::Configuration(format!(
                    "interval chromosome '{}' not present in the reference genome",
                    chromosome
                )));
            }
            let split = partition.split_of(chromosome).ok_or_else(|| {
                KlerosError::Configuration(format!(
                    "chromosome '{}' missing from the split partition",
                    chromosome
                ))
            })?;
            let pool = &mut pools[pool_index(split)];
            pool.chromosomes.push(chromosome.to_string());
            pool.intervals
                .extend(catalog.intervals_on(chromosome).iter().cloned());
        }

        Ok(Self {
            reference,
            catalog,
            features,
            pools,
            options,
            state: SamplerState::new(seed),
        })
    }

    pub fn state(&self) -> &SamplerState {
        &self.state
    }

    /// Draw one example from `split`.
    ///
    /// `OutOfBounds` failures are transient; callers redraw. For a fixed
    /// seed and call sequence the produced records are identical across
    /// runs and process restarts.
    pub fn draw(&mut self, split: Split) -> KlerosResult<SampleRecord> {
        self.state.draws += 1;
        let negative = self.options.sample_negative
            && self.state.rng.gen_bool(NEGATIVE_DRAW_PROBABILITY);
        if negative {
            self.draw_negative(split)
        } else {
            self.draw_positive(split)
        }
    }

    /// Uniform over the split's intervals, not over genomic mass: a short
    /// interval is as likely as a long one. This is a deliberate policy.
    fn draw_positive(&mut self, split: Split) -> KlerosResult<SampleRecord> {
        let pool = &self.pools[pool_index(split)];
        if pool.intervals.is_empty() {
            return Err(KlerosError::InsufficientData(format!(
                "{} split has no intervals to sample",
                split
            )));
        }

        let idx = self.state.rng.gen_range(0..pool.intervals.len());
        let interval = pool.intervals[idx].clone();
        let center = interval.midpoint();
        let half = self.options.sequence_length / 2;

        let strand = match interval.strand {
            Strand::Unknown => self.random_strand(),
            oriented => oriented,
        };

        let mut sequence = self.reference.get_window(&interval.chromosome, center, half)?;
        if strand == Strand::Reverse {
            sequence = encode::reverse_complement(&sequence);
        }

        Ok(SampleRecord {
            labels: self.features.label_vector_for(&interval.feature_ids),
            chromosome: interval.chromosome,
            start: center - half,
            end: center + half,
            strand,
            split,
            is_negative: false,
            sequence,
        })
    }

    /// Uniform chromosome within the split, uniform in-bounds center;
    /// candidates touching a labeled span (any split) or a blacklist region
    /// are rejected and redrawn up to the retry budget.
    fn draw_negative(&mut self, split: Split) -> KlerosResult<SampleRecord> {
        let pool = &self.pools[pool_index(split)];
        if pool.chromosomes.is_empty() {
            return Err(KlerosError::InsufficientData(format!(
                "{} split has no chromosomes to sample",
                split
            )));
        }
        let half = self.options.sequence_length / 2;

        for _ in 0..self.options.negative_retries {
            let chromosome =
                &pool.chromosomes[self.state.rng.gen_range(0..pool.chromosomes.len())];
            let chrom_len = self
                .reference
                .chromosome_len(chromosome)
                .unwrap_or_default();
            if chrom_len < self.options.sequence_length {
                continue;
            }

            let center = self.state.rng.gen_range(half..=chrom_len - half);
            let (start, end) = (center - half, center + half);
            if self.catalog.overlaps_labeled(chromosome, start, end)
                || self.reference.overlaps_blacklist(chromosome, start, end)
            {
                trace!(
                    chromosome = %chromosome,
                    start,
                    end,
                    "rejected negative candidate"
                );
                continue;
            }

            let chromosome = chromosome.clone();
            let mut sequence = self.reference.get_window(&chromosome, center, half)?;
            let strand = if self.state.rng.gen_bool(0.5) {
                Strand::Forward
            } else {
                Strand::Reverse
            };
            if strand == Strand::Reverse {
                sequence = encode::reverse_complement(&sequence);
            }

            return Ok(SampleRecord {
                chromosome,
                start,
                end,
                strand,
                split,
                is_negative: true,
                sequence,
                labels: self.features.label_vector_for(&BTreeSet::new()),
            });
        }

        Err(KlerosError::NegativeSamplingExhausted {
            split,
            attempts: self.options.negative_retries,
        })
    }

    fn random_strand(&mut self) -> Strand {
        if self.state.rng.gen_bool(0.5) {
            Strand::Forward
        } else {
            Strand::Reverse
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervals::{HoldoutMetric, HoldoutSpec};
    use crate::regions::RegionSet;
    use std::io::Write;

    const SEQ_LEN: usize = 20;

    fn toy_genome() -> ReferenceSequence {
        // Two 400 bp chromosomes with distinguishable content.
        let chr1: Vec<u8> = b"ACGT".repeat(100);
        let chr2: Vec<u8> = b"TTGGCCAA".repeat(50);
        let blacklist = RegionSet::from_regions(vec![("chr1".to_string(), 300, 340)]);
        ReferenceSequence::from_records(
            vec![("chr1".to_string(), chr1), ("chr2".to_string(), chr2)],
            blacklist,
        )
    }

    fn toy_catalog(features: &FeatureIndex) -> (IntervalCatalog, tempfile::NamedTempFile) {
        let mut bed = tempfile::NamedTempFile::new().unwrap();
        writeln!(bed, "chr1\t100\t120\tCTCF").unwrap();
        writeln!(bed, "chr1\t200\t220\t-\tDNase").unwrap();
        writeln!(bed, "chr2\t40\t60\tCTCF").unwrap();
        writeln!(bed, "chr2\t240\t260\tDNase").unwrap();
        bed.flush().unwrap();
        let catalog = IntervalCatalog::load(bed.path(), None, features, 10, 0.5).unwrap();
        (catalog, bed)
    }

    fn toy_partition(catalog: &IntervalCatalog) -> SplitPartition {
        catalog
            .partition(
                &HoldoutSpec::Chromosomes(vec!["chr2".to_string()]),
                &HoldoutSpec::none(),
                HoldoutMetric::IntervalCount,
                436,
            )
            .unwrap()
    }

    fn options(sample_negative: bool) -> SamplerOptions {
        SamplerOptions {
            sequence_length: SEQ_LEN,
            sample_negative,
            negative_retries: DEFAULT_NEGATIVE_RETRIES,
        }
    }

    #[test]
    fn test_draws_are_reproducible_across_sessions() {
        let reference = toy_genome();
        let features = FeatureIndex::from_names(&["CTCF", "DNase"]).unwrap();
        let (catalog, _bed) = toy_catalog(&features);
        let partition = toy_partition(&catalog);

        let mut draws = |seed: u64| -> Vec<SampleRecord> {
            let mut sampler =
                Sampler::new(&reference, &catalog, &features, &partition, options(true), seed)
                    .unwrap();
            (0..50)
                .filter_map(|_| sampler.draw(Split::Train).ok())
                .collect()
        };

        assert_eq!(draws(436), draws(436));
        assert_ne!(draws(436), draws(437));
    }

    #[test]
    fn test_positive_draw_labels_and_window() {
        let reference = toy_genome();
        let features = FeatureIndex::from_names(&["CTCF", "DNase"]).unwrap();
        let (catalog, _bed) = toy_catalog(&features);
        let partition = toy_partition(&catalog);
        let mut sampler =
            Sampler::new(&reference, &catalog, &features, &partition, options(false), 1).unwrap();

        for _ in 0..20 {
            let record = sampler.draw(Split::Train).unwrap();
            assert!(!record.is_negative);
            assert_eq!(record.chromosome, "chr1");
            assert_eq!(record.sequence.len(), SEQ_LEN);
            assert_eq!(record.end - record.start, SEQ_LEN);
            // Every train interval fully covers its own prediction bin.
            assert_eq!(record.labels.iter().sum::<f32>(), 1.0);
        }
    }

    #[test]
    fn test_split_confinement() {
        let reference = toy_genome();
        let features = FeatureIndex::from_names(&["CTCF", "DNase"]).unwrap();
        let (catalog, _bed) = toy_catalog(&features);
        let partition = toy_partition(&catalog);
        let mut sampler =
            Sampler::new(&reference, &catalog, &features, &partition, options(true), 9).unwrap();

        for _ in 0..100 {
            if let Ok(record) = sampler.draw(Split::Test) {
                assert_eq!(record.chromosome, "chr2");
            }
        }
    }

    #[test]
    fn test_negative_draws_avoid_labels_and_blacklist() {
        let reference = toy_genome();
        let features = FeatureIndex::from_names(&["CTCF", "DNase"]).unwrap();
        let (catalog, _bed) = toy_catalog(&features);
        let partition = toy_partition(&catalog);
        let mut sampler =
            Sampler::new(&reference, &catalog, &features, &partition, options(true), 7).unwrap();

        let mut negatives = 0;
        for _ in 0..200 {
            let record = sampler.draw(Split::Train).unwrap();
            if !record.is_negative {
                continue;
            }
            negatives += 1;
            assert!(!catalog.overlaps_labeled(&record.chromosome, record.start, record.end));
            assert!(!reference.overlaps_blacklist(&record.chromosome, record.start, record.end));
            assert!(record.labels.iter().all(|&l| l == 0.0));
        }
        assert!(negatives > 50, "negative gate never fired");
    }

    #[test]
    fn test_negative_sampling_exhaustion() {
        // chr1 fully labeled: no negative window exists.
        let chr1: Vec<u8> = b"ACGT".repeat(100);
        let reference = ReferenceSequence::from_records(
            vec![("chr1".to_string(), chr1)],
            RegionSet::default(),
        );
        let features = FeatureIndex::from_names(&["CTCF"]).unwrap();
        let mut bed = tempfile::NamedTempFile::new().unwrap();
        writeln!(bed, "chr1\t0\t400\tCTCF").unwrap();
        bed.flush().unwrap();
        let catalog = IntervalCatalog::load(bed.path(), None, &features, 10, 0.5).unwrap();
        let partition = catalog
            .partition(
                &HoldoutSpec::none(),
                &HoldoutSpec::none(),
                HoldoutMetric::IntervalCount,
                1,
            )
            .unwrap();
        let mut sampler =
            Sampler::new(&reference, &catalog, &features, &partition, options(true), 3).unwrap();

        let exhausted = (0..200).find_map(|_| match sampler.draw(Split::Train) {
            Err(KlerosError::NegativeSamplingExhausted { attempts, .. }) => Some(attempts),
            _ => None,
        });
        assert_eq!(exhausted, Some(DEFAULT_NEGATIVE_RETRIES));
    }

    #[test]
    fn test_draw_counter_tracks_every_attempt() {
        let reference = toy_genome();
        let features = FeatureIndex::from_names(&["CTCF", "DNase"]).unwrap();
        let (catalog, _bed) = toy_catalog(&features);
        let partition = toy_partition(&catalog);
        let mut sampler =
            Sampler::new(&reference, &catalog, &features, &partition, options(true), 13).unwrap();

        assert_eq!(sampler.state().draws(), 0);
        for _ in 0..7 {
            let _ = sampler.draw(Split::Train);
        }
        // Failed draws count too; the counter is attempts, not records.
        assert_eq!(sampler.state().draws(), 7);
    }

    #[test]
    fn test_odd_sequence_length_rejected() {
        let reference = toy_genome();
        let features = FeatureIndex::from_names(&["CTCF", "DNase"]).unwrap();
        let (catalog, _bed) = toy_catalog(&features);
        let partition = toy_partition(&catalog);
        let err = Sampler::new(
            &reference,
            &catalog,
            &features,
            &partition,
            SamplerOptions {
                sequence_length: 1001,
                ..SamplerOptions::default()
            },
            1,
        )
        .unwrap_err();
        assert!(matches!(err, KlerosError::Configuration(_)));
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let record = SampleRecord {
            chromosome: "chr1".to_string(),
            start: 90,
            end: 110,
            strand: Strand::Forward,
            split: Split::Train,
            is_negative: false,
            sequence: b"ACGTACGTACGTACGTACGT".to_vec(),
            labels: vec![1.0, 0.0],
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"ACGTACGTACGTACGTACGT\""));
        let back: SampleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
