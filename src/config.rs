//! Configuration types for kleros
//!
//! Loaded from TOML by the CLI; library callers can build `Config` directly.

use crate::error::{KlerosError, KlerosResult};
use crate::intervals::{HoldoutMetric, HoldoutSpec, Split};
use crate::materialize::DEFAULT_RECORD_RETRIES;
use crate::sampler::{SamplerOptions, DEFAULT_NEGATIVE_RETRIES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceSequenceConfig {
    /// Genome FASTA file (gzip accepted).
    pub input_path: PathBuf,
    /// Blacklist preset name (`hg19`, `hg38`) or a BED file path.
    #[serde(default)]
    pub blacklist_regions: Option<String>,
}

/// Pipeline mode. `Evaluate` refuses training output: `Config::validate`
/// rejects a `save_datasets` list containing the train split, and
/// materialization through the CLI is the only path that draws records, so
/// the validation gate is the enforcement point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Train,
    Evaluate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub reference_sequence: ReferenceSequenceConfig,

    /// Labeled-feature source file (BED-like, feature column required).
    pub target_path: PathBuf,
    /// Sampling intervals, when drawn from a different file than the
    /// targets. Defaults to the target file itself.
    #[serde(default)]
    pub intervals_path: Option<PathBuf>,
    /// Ordered feature-name list defining the label-vector columns.
    pub features: Vec<String>,

    #[serde(default)]
    pub sample_negative: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default)]
    pub test_holdout: Option<HoldoutSpec>,
    #[serde(default)]
    pub validation_holdout: Option<HoldoutSpec>,
    #[serde(default)]
    pub holdout_metric: HoldoutMetric,

    #[serde(default = "default_sequence_length")]
    pub sequence_length: usize,
    #[serde(default = "default_center_bin_to_predict")]
    pub center_bin_to_predict: usize,
    #[serde(default = "default_feature_thresholds")]
    pub feature_thresholds: f64,

    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_save_datasets")]
    pub save_datasets: Vec<Split>,
    #[serde(default = "default_snapshot_records")]
    pub snapshot_records: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_negative_retries")]
    pub negative_retries: u32,
    #[serde(default = "default_record_retries")]
    pub record_retries: u32,
}

fn default_seed() -> u64 {
    436
}

fn default_sequence_length() -> usize {
    1000
}

fn default_center_bin_to_predict() -> usize {
    200
}

fn default_feature_thresholds() -> f64 {
    0.5
}

fn default_save_datasets() -> Vec<Split> {
    vec![Split::Test]
}

fn default_snapshot_records() -> usize {
    640_000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("datasets")
}

fn default_negative_retries() -> u32 {
    DEFAULT_NEGATIVE_RETRIES
}

fn default_record_retries() -> u32 {
    DEFAULT_RECORD_RETRIES
}

impl Config {
    pub fn from_file(path: &Path) -> KlerosResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text).map_err(|e| {
            KlerosError::Configuration(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Startup checks. Anything wrong here is fatal before sampling begins.
    pub fn validate(&self) -> KlerosResult<()> {
        if self.features.is_empty() {
            return Err(KlerosError::Configuration(
                "features list must not be empty".to_string(),
            ));
        }
        if self.sequence_length == 0 || self.sequence_length % 2 != 0 {
            return Err(KlerosError::Configuration(format!(
                "sequence_length must be a positive even number, got {}",
                self.sequence_length
            )));
        }
        if self.center_bin_to_predict == 0 || self.center_bin_to_predict > self.sequence_length {
            return Err(KlerosError::Configuration(format!(
                "center_bin_to_predict must be in [1, sequence_length], got {}",
                self.center_bin_to_predict
            )));
        }
        if !(0.0..=1.0).contains(&self.feature_thresholds) {
            return Err(KlerosError::Configuration(format!(
                "feature_thresholds must be within [0, 1], got {}",
                self.feature_thresholds
            )));
        }
        check_holdout(self.test_holdout.as_ref(), "test_holdout")?;
        check_holdout(self.validation_holdout.as_ref(), "validation_holdout")?;
        if self.snapshot_records == 0 {
            return Err(KlerosError::Configuration(
                "snapshot_records must be at least 1".to_string(),
            ));
        }
        if self.mode == Mode::Evaluate && self.save_datasets.contains(&Split::Train) {
            return Err(KlerosError::Configuration(
                "evaluate mode cannot materialize the train split".to_string(),
            ));
        }
        Ok(())
    }

    pub fn test_holdout_spec(&self) -> HoldoutSpec {
        self.test_holdout.clone().unwrap_or_else(HoldoutSpec::none)
    }

    pub fn validation_holdout_spec(&self) -> HoldoutSpec {
        self.validation_holdout
            .clone()
            .unwrap_or_else(HoldoutSpec::none)
    }

    pub fn sampler_options(&self) -> SamplerOptions {
        SamplerOptions {
            sequence_length: self.sequence_length,
            sample_negative: self.sample_negative,
            negative_retries: self.negative_retries,
        }
    }
}

fn check_holdout(spec: Option<&HoldoutSpec>, name: &str) -> KlerosResult<()> {
    if let Some(HoldoutSpec::Proportion(p)) = spec {
        if !(0.0..=1.0).contains(p) {
            return Err(KlerosError::Configuration(format!(
                "{} proportion must be within [0, 1], got {}",
                name, p
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r#"
        target_path = "targets.bed"
        features = ["CTCF", "DNase"]

        [reference_sequence]
        input_path = "genome.fa"
    "#;

    #[test]
    fn test_minimal_config_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.seed, 436);
        assert_eq!(config.sequence_length, 1000);
        assert_eq!(config.center_bin_to_predict, 200);
        assert_eq!(config.feature_thresholds, 0.5);
        assert_eq!(config.mode, Mode::Train);
        assert_eq!(config.save_datasets, vec![Split::Test]);
        assert_eq!(config.snapshot_records, 640_000);
        assert!(!config.sample_negative);
        assert!(config.reference_sequence.blacklist_regions.is_none());
    }

    #[test]
    fn test_holdout_specs_parse_both_shapes() {
        let text = format!(
            "test_holdout = [\"chr8\", \"chr9\"]\nvalidation_holdout = 0.1\n{}",
            MINIMAL
        );
        let config: Config = toml::from_str(&text).unwrap();
        config.validate().unwrap();

        match config.test_holdout_spec() {
            HoldoutSpec::Chromosomes(chroms) => assert_eq!(chroms, vec!["chr8", "chr9"]),
            other => panic!("expected chromosome list, got {:?}", other),
        }
        match config.validation_holdout_spec() {
            HoldoutSpec::Proportion(p) => assert_eq!(p, 0.1),
            other => panic!("expected proportion, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad = [
            "sequence_length = 1001",
            "feature_thresholds = 1.5",
            "validation_holdout = 2.0",
            "center_bin_to_predict = 0",
            "snapshot_records = 0",
            "features = []\ntarget_path = \"t.bed\"",
        ];
        for extra in bad {
            let text = if extra.starts_with("features") {
                format!("{}\n[reference_sequence]\ninput_path = \"genome.fa\"\n", extra)
            } else {
                format!("{}\n{}\n", extra, MINIMAL)
            };
            let config: Config = match toml::from_str(&text) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, KlerosError::Configuration(_)),
                "case: {}",
                extra
            );
        }
    }

    #[test]
    fn test_evaluate_mode_cannot_snapshot_train() {
        let text = format!(
            "mode = \"evaluate\"\nsave_datasets = [\"train\", \"test\"]\n{}",
            MINIMAL
        );
        let config: Config = toml::from_str(&text).unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            KlerosError::Configuration(_)
        ));
    }
}
