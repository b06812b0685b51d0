//! kleros: deterministic genomic-interval sampling for sequence models.
//!
//! Partitions genomic coordinates by chromosome into disjoint
//! train/validation/test splits, draws windowed (sequence, label-vector)
//! examples with seeded generators, and materializes fixed dataset
//! snapshots for reproducible evaluation.

pub mod cli;
pub mod config;
pub mod encode;
pub mod error;
pub mod fasta;
pub mod features;
pub mod intervals;
pub mod materialize;
pub mod reference;
pub mod regions;
pub mod sampler;

// Re-export commonly used types
pub use config::{Config, Mode};
pub use error::{KlerosError, KlerosResult};
pub use features::FeatureIndex;
pub use intervals::{
    HoldoutMetric, HoldoutSpec, Interval, IntervalCatalog, Split, SplitPartition, Strand,
};
pub use materialize::{save_datasets, DatasetMaterializer, SnapshotManifest, SnapshotRequest};
pub use reference::ReferenceSequence;
pub use sampler::{SampleRecord, Sampler, SamplerOptions, SamplerState};
