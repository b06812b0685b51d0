pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kleros",
    version,
    about = "Deterministic genomic-interval sampling for sequence models",
    long_about = "kleros partitions a genome's chromosomes into disjoint train/validation/test \
                  splits, draws windowed sequence examples with seeded generators, and \
                  materializes fixed dataset snapshots for reproducible evaluation."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML)
    #[arg(
        short,
        long,
        global = true,
        env = "KLEROS_CONFIG",
        default_value = "kleros.toml"
    )]
    pub config: PathBuf,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the chromosome -> split assignment
    Partition(commands::partition::PartitionArgs),

    /// Materialize fixed dataset snapshots for the configured splits
    Materialize(commands::materialize::MaterializeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_resolution_order() {
        // Flag beats the KLEROS_CONFIG variable, which beats the default.
        // Exercised in one test because the variable is process-global.
        std::env::remove_var("KLEROS_CONFIG");
        let cli = Cli::parse_from(["kleros", "partition"]);
        assert_eq!(cli.config, PathBuf::from("kleros.toml"));

        std::env::set_var("KLEROS_CONFIG", "from_env.toml");
        let cli = Cli::parse_from(["kleros", "partition"]);
        assert_eq!(cli.config, PathBuf::from("from_env.toml"));

        let cli = Cli::parse_from(["kleros", "--config", "explicit.toml", "partition"]);
        assert_eq!(cli.config, PathBuf::from("explicit.toml"));
        std::env::remove_var("KLEROS_CONFIG");
    }
}
