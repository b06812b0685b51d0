use crate::config::Config;
use crate::materialize::{save_datasets, SnapshotRequest};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args)]
pub struct MaterializeArgs {
    /// Records per split (overrides snapshot_records from the config)
    #[arg(long)]
    pub records: Option<usize>,

    /// Output directory (overrides output_dir from the config)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn run(config_path: &Path, args: MaterializeArgs) -> anyhow::Result<()> {
    let config = Config::from_file(config_path)?;
    let pipeline = super::build_pipeline(&config)?;

    let output_dir = args.output.as_deref().unwrap_or(&config.output_dir);
    let request = SnapshotRequest {
        splits: &config.save_datasets,
        records_per_split: args.records.unwrap_or(config.snapshot_records),
        seed: config.seed,
        output_dir,
        record_retries: config.record_retries,
    };

    info!(
        splits = config.save_datasets.len(),
        records_per_split = request.records_per_split,
        "materializing dataset snapshots"
    );

    let manifest = save_datasets(
        &pipeline.reference,
        &pipeline.catalog,
        &pipeline.features,
        &pipeline.partition,
        &config.sampler_options(),
        &request,
    )?;

    for entry in &manifest.splits {
        println!(
            "{}: {} records -> {}",
            entry.split,
            entry.records,
            output_dir.join(&entry.path).display()
        );
    }
    Ok(())
}
