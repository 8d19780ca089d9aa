use clap::Parser;
use progen_tools::cli::{Args, Commands};
use progen_tools::commands;
use progen_tools::config::Config;
use progen_tools::utils::logging::{init_logging, LogConfig};

fn main() {
    let args = Args::parse();

    let log_config = LogConfig::from_verbosity(args.verbose).with_log_file(args.log_file.clone());
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let result = Config::load(args.config.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(|config| match args.command {
            Commands::Validate {
                manifest,
                registry,
                output_dir,
                dry_run,
            } => commands::validate::run(&config, manifest, registry, output_dir, dry_run),
            Commands::Verify {
                claims,
                genotypes,
                registry,
                output_file,
                panel,
            } => commands::verify::run(&config, claims, genotypes, registry, output_file, panel),
            Commands::Catalog { json } => commands::catalog::run(&config, json),
        });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
