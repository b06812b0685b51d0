pub mod materialize;
pub mod partition;

use crate::config::Config;
use crate::error::KlerosResult;
use crate::features::FeatureIndex;
use crate::intervals::{IntervalCatalog, SplitPartition};
use crate::reference::ReferenceSequence;

/// Everything the sampling commands need, built once from the config.
pub(crate) struct Pipeline {
    pub reference: ReferenceSequence,
    pub catalog: IntervalCatalog,
    pub features: FeatureIndex,
    pub partition: SplitPartition,
}

pub(crate) fn build_pipeline(config: &Config) -> KlerosResult<Pipeline> {
    let features = FeatureIndex::from_names(&config.features)?;
    let reference = ReferenceSequence::load(
        &config.reference_sequence.input_path,
        config.reference_sequence.blacklist_regions.as_deref(),
    )?;
    let catalog = IntervalCatalog::load(
        &config.target_path,
        config.intervals_path.as_deref(),
        &features,
        config.center_bin_to_predict,
        config.feature_thresholds,
    )?;
    let partition = catalog.partition(
        &config.test_holdout_spec(),
        &config.validation_holdout_spec(),
        config.holdout_metric,
        config.seed,
    )?;

    Ok(Pipeline {
        reference,
        catalog,
        features,
        partition,
    })
}
