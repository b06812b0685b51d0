use crate::config::Config;
use crate::intervals::Split;
use clap::Args;
use std::path::Path;

#[derive(Args)]
pub struct PartitionArgs {
    /// Emit the assignment as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn run(config_path: &Path, args: PartitionArgs) -> anyhow::Result<()> {
    let config = Config::from_file(config_path)?;
    let pipeline = super::build_pipeline(&config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&pipeline.partition)?);
        return Ok(());
    }

    for (chromosome, split) in pipeline.partition.iter() {
        let intervals = pipeline.catalog.intervals_on(chromosome).len();
        println!("{}\t{}\t{} intervals", chromosome, split, intervals);
    }
    for split in Split::ALL {
        println!(
            "# {}: {} chromosomes",
            split,
            pipeline.partition.chromosomes(split).len()
        );
    }
    Ok(())
}
