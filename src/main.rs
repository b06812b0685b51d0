use clap::Parser;
use kleros::cli::{Cli, Commands};
use kleros::KlerosError;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // KLEROS_LOG controls library logging; defaults to info.
    let log_level = std::env::var("KLEROS_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);

        let exit_code = match e.downcast_ref::<KlerosError>() {
            Some(KlerosError::Configuration(_)) => 2,
            Some(KlerosError::Io(_)) => 3,
            Some(KlerosError::Parse(_)) => 4,
            Some(KlerosError::InsufficientData(_)) | Some(KlerosError::UnknownFeature(_)) => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.verbose > 0 {
        eprintln!("Using config {}", cli.config.display());
    }

    match cli.command {
        Commands::Partition(args) => kleros::cli::commands::partition::run(&cli.config, args),
        Commands::Materialize(args) => kleros::cli::commands::materialize::run(&cli.config, args),
    }
}
