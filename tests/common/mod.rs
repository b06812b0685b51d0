//! Shared fixtures for integration tests: a small deterministic genome,
//! labeled intervals, and a config file pointing at both.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};

pub const CHROMOSOMES: [&str; 6] = ["chr1", "chr2", "chr3", "chr4", "chr5", "chr6"];
pub const CHROM_LEN: usize = 2000;
pub const FEATURES: [&str; 2] = ["CTCF", "DNase"];

/// Write a 6-chromosome genome with reproducible random content.
pub fn write_genome(dir: &Path) -> PathBuf {
    let mut rng = StdRng::seed_from_u64(42);
    let bases = [b'A', b'C', b'G', b'T'];
    let mut fasta = String::new();
    for chrom in CHROMOSOMES {
        fasta.push_str(&format!(">{}\n", chrom));
        let sequence: String = (0..CHROM_LEN)
            .map(|_| bases[rng.gen_range(0..4)] as char)
            .collect();
        for line in sequence.as_bytes().chunks(80) {
            fasta.push_str(std::str::from_utf8(line).unwrap());
            fasta.push('\n');
        }
    }
    let path = dir.join("genome.fa");
    fs::write(&path, fasta).unwrap();
    path
}

/// Six 40 bp labeled intervals per chromosome, alternating features.
pub fn write_targets(dir: &Path) -> PathBuf {
    let mut bed = String::new();
    for chrom in CHROMOSOMES {
        for i in 0..6 {
            let start = 200 + i * 250;
            let feature = FEATURES[i % 2];
            bed.push_str(&format!("{}\t{}\t{}\t{}\n", chrom, start, start + 40, feature));
        }
    }
    let path = dir.join("targets.bed");
    fs::write(&path, bed).unwrap();
    path
}

/// A user-supplied blacklist with one region on chr1.
pub fn write_blacklist(dir: &Path) -> PathBuf {
    let path = dir.join("blacklist.bed");
    fs::write(&path, "chr1\t1500\t1600\n").unwrap();
    path
}

/// Write a full config file wired to the fixture paths.
pub fn write_config(dir: &Path) -> PathBuf {
    let genome = write_genome(dir);
    let targets = write_targets(dir);
    let blacklist = write_blacklist(dir);

    let config = format!(
        r#"
target_path = "{targets}"
features = ["CTCF", "DNase"]
sample_negative = true
seed = 436
test_holdout = ["chr5", "chr6"]
validation_holdout = ["chr4"]
sequence_length = 100
center_bin_to_predict = 20
save_datasets = ["validation", "test"]
snapshot_records = 16
output_dir = "{output}"

[reference_sequence]
input_path = "{genome}"
blacklist_regions = "{blacklist}"
"#,
        targets = targets.display(),
        genome = genome.display(),
        blacklist = blacklist.display(),
        output = dir.join("datasets").display(),
    );
    let path = dir.join("kleros.toml");
    fs::write(&path, config).unwrap();
    path
}
