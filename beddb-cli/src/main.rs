use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod error;

use commands::aggregate::AggregateArgs;
use config::Config;
use error::{format_error_with_suggestions, CliError};

#[derive(Parser)]
#[command(name = "beddb")]
#[command(about = "beddb - Multi-resolution tile index builder for gene annotations")]
#[command(version)]
#[command(long_about = "
beddb packs gene and transcript intervals into a zoomable tile pyramid stored
as a SQLite database. At every zoom level each tile holds at most a fixed number
of genes, and more important genes appear at coarser zoom levels.

Examples:
  beddb aggregate transcripts.tsv.gz --chromsizes hg38.chrom.sizes --importance-column 5
  beddb info transcripts.tsv.gz.beddb --json
  beddb query transcripts.tsv.gz.beddb --zoom 3 --start 1000000 --end 2000000
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a .beddb tileset from a delimited transcript file
    Aggregate(AggregateArgs),

    /// Show the metadata of a .beddb tileset
    Info {
        /// Tileset file (.beddb)
        db: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the intervals stored at a zoom level within a range or tile
    Query {
        /// Tileset file (.beddb)
        db: PathBuf,

        /// Zoom level
        #[arg(short, long)]
        zoom: u32,

        /// Range start (genome coordinate)
        #[arg(long, allow_hyphen_values = true, required_unless_present = "tile")]
        start: Option<i64>,

        /// Range end (genome coordinate)
        #[arg(long, allow_hyphen_values = true, required_unless_present = "tile")]
        end: Option<i64>,

        /// Fetch a whole tile instead: every interval at this zoom or coarser
        #[arg(long, conflicts_with_all = ["start", "end"])]
        tile: Option<i64>,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
    },
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Aggregate(args) => {
            commands::aggregate::execute(&config, args)?;
        }

        Commands::Info { db, json } => {
            commands::info::execute(db, json)?;
        }

        Commands::Query {
            db,
            zoom,
            start,
            end,
            tile,
            json,
        } => {
            commands::query::execute(db, zoom, start, end, tile, json)?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(cli) {
        match err.downcast_ref::<CliError>() {
            Some(cli_err) => eprintln!("Error: {}", format_error_with_suggestions(cli_err)),
            None => eprintln!("Error: {:?}", err),
        }
        std::process::exit(1);
    }
}
