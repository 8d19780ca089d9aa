use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a batch of map and final report uploads
    Validate {
        /// JSON manifest listing the uploads of the batch
        manifest: PathBuf,

        /// Map registry snapshot, loaded if present and updated afterwards
        #[arg(short = 'r', long = "registry", default_value = "map_registry.json")]
        registry: PathBuf,

        /// Directory for the outcome log and decoded genotype tables
        #[arg(short = 'o', long = "output", default_value = "validation_output")]
        output_dir: PathBuf,

        /// Validate without writing the registry or genotype tables
        #[arg(long)]
        dry_run: bool,
    },

    /// Verify declared parentage against decoded genotypes
    Verify {
        /// `;`-separated claims: child;sire;dam;relationship
        claims: PathBuf,

        /// Genotype tables written by `validate`
        #[arg(short = 'g', long = "genotypes", required = true, num_args = 1..)]
        genotypes: Vec<PathBuf>,

        /// Map registry snapshot the genotype tables refer to
        #[arg(short = 'r', long = "registry", default_value = "map_registry.json")]
        registry: PathBuf,

        /// Output file for concordance results
        #[arg(short = 'o', long = "output", default_value = "concordance.csv")]
        output_file: PathBuf,

        /// Registered map restricting the comparison (overrides the configured panel)
        #[arg(long)]
        panel: Option<String>,
    },

    /// Print the status catalog
    Catalog {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}
