//! Fixed-size dataset snapshots: drain a sampler for a quota of records and
//! persist them in draw order for reproducibility auditing.

use crate::error::{KlerosError, KlerosResult};
use crate::features::FeatureIndex;
use crate::intervals::{IntervalCatalog, Split, SplitPartition};
use crate::reference::ReferenceSequence;
use crate::sampler::{SampleRecord, Sampler, SamplerOptions};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Per-record retry budget for transient draw failures.
pub const DEFAULT_RECORD_RETRIES: u32 = 10;

/// Consumes a sampler over N draws and returns a fixed-size dataset.
pub struct DatasetMaterializer<'a> {
    sampler: Sampler<'a>,
    record_retries: u32,
}

impl<'a> DatasetMaterializer<'a> {
    pub fn new(sampler: Sampler<'a>) -> Self {
        Self {
            sampler,
            record_retries: DEFAULT_RECORD_RETRIES,
        }
    }

    pub fn with_record_retries(mut self, record_retries: u32) -> Self {
        self.record_retries = record_retries.max(1);
        self
    }

    /// Total draw attempts so far, retried and rejected ones included.
    pub fn draws(&self) -> u64 {
        self.sampler.state().draws()
    }

    /// Exactly `count` records from `split`, in draw order.
    ///
    /// Transient `OutOfBounds` draws are retried per record up to the
    /// budget; exhausting it fails the whole call with a `Materialization`
    /// error reporting how many records succeeded. Any non-retryable draw
    /// error surfaces unchanged.
    pub fn materialize(&mut self, split: Split, count: usize) -> KlerosResult<Vec<SampleRecord>> {
        let mut records = Vec::new();

        while records.len() < count {
            let mut produced = false;
            for attempt in 0..self.record_retries {
                match self.sampler.draw(split) {
                    Ok(record) => {
                        records.push(record);
                        produced = true;
                        break;
                    }
                    Err(err) if err.is_retryable() => {
                        debug!(attempt, %err, "retrying transient draw failure");
                    }
                    Err(err) => return Err(err),
                }
            }
            if !produced {
                return Err(KlerosError::Materialization {
                    split,
                    produced: records.len(),
                    requested: count,
                });
            }
        }

        Ok(records)
    }
}

/// One split's snapshot file, as recorded in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub split: Split,
    pub records: usize,
    pub seed: u64,
    pub path: String,
}

/// Written next to the snapshot files so a re-run can be audited against
/// the exact seeds and quotas that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub seed: u64,
    pub sequence_length: usize,
    pub splits: Vec<SnapshotEntry>,
}

/// What `save_datasets` should produce.
pub struct SnapshotRequest<'a> {
    pub splits: &'a [Split],
    pub records_per_split: usize,
    pub seed: u64,
    pub output_dir: &'a Path,
    pub record_retries: u32,
}

/// Materialize a fixed snapshot for each requested split.
///
/// Splits run in parallel, each with its own sampler seeded
/// `seed + split position` so the snapshots stay reproducible regardless
/// of scheduling. Records are written as JSON lines in draw order, one
/// file per split, plus a `manifest.json`.
pub fn save_datasets(
    reference: &ReferenceSequence,
    catalog: &IntervalCatalog,
    features: &FeatureIndex,
    partition: &SplitPartition,
    options: &SamplerOptions,
    request: &SnapshotRequest<'_>,
) -> KlerosResult<SnapshotManifest> {
    fs::create_dir_all(request.output_dir)?;

    let entries: Vec<SnapshotEntry> = request
        .splits
        .par_iter()
        .enumerate()
        .map(|(position, &split)| -> KlerosResult<SnapshotEntry> {
            let worker_seed = request.seed + position as u64;
            let sampler = Sampler::new(
                reference,
                catalog,
                features,
                partition,
                options.clone(),
                worker_seed,
            )?;
            let mut materializer =
                DatasetMaterializer::new(sampler).with_record_retries(request.record_retries);
            let records = materializer.materialize(split, request.records_per_split)?;

            let file_name = format!("{}.jsonl", split);
            let path = request.output_dir.join(&file_name);
            let mut writer = BufWriter::new(File::create(&path)?);
            for record in &records {
                serde_json::to_writer(&mut writer, record).map_err(|e| {
                    KlerosError::Parse(format!("failed to encode snapshot record: {}", e))
                })?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;

            info!(
                split = %split,
                records = records.len(),
                draws = materializer.draws(),
                seed = worker_seed,
                "wrote dataset snapshot to {}",
                path.display()
            );

            Ok(SnapshotEntry {
                split,
                records: records.len(),
                seed: worker_seed,
                path: file_name,
            })
        })
        .collect::<KlerosResult<Vec<_>>>()?;

    let manifest = SnapshotManifest {
        seed: request.seed,
        sequence_length: options.sequence_length,
        splits: entries,
    };
    let manifest_path = request.output_dir.join("manifest.json");
    let writer = BufWriter::new(File::create(manifest_path)?);
    serde_json::to_writer_pretty(writer, &manifest).map_err(|e| {
        KlerosError::Parse(format!("failed to encode snapshot manifest: {}", e))
    })?;

    Ok(manifest)
}
