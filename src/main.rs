mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

use apw_rdf::{describe_cif, expand_inputs, writer, BinGrid, DescriptorConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Atomic-property-weighted RDF descriptors for crystal structures")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Write logs to a file in addition to stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Number of worker threads for the pairwise pass (defaults to all cores)
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Computes APW-RDF descriptors for CIF files and writes them as CSV.
    Compute {
        /// CIF files or glob patterns (e.g. "structures/*.cif").
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output CSV file. Written to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// TOML file with descriptor settings. Command-line flags take precedence.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Comma-separated property names, in output order.
        #[arg(short, long, value_delimiter = ',')]
        properties: Option<Vec<String>>,

        /// Gaussian coefficient; must be negative.
        #[arg(long, allow_negative_numbers = true)]
        smoothing: Option<f64>,

        /// Output scale factor.
        #[arg(long)]
        scale: Option<f64>,

        /// TOML property table to use instead of the bundled one.
        #[arg(long)]
        property_table: Option<PathBuf>,

        /// Fail on cells too small for the 27-image search to cover every bin.
        #[arg(long)]
        strict: bool,
    },
    /// Prints the distance bin grid, one centre per line.
    Bins,
}

#[cfg(feature = "parallel")]
fn configure_threads(threads: Option<usize>) -> Result<()> {
    if let Some(num_threads) = threads {
        info!("Setting Rayon global thread pool to {} threads.", num_threads);
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| anyhow::anyhow!("Failed to build global thread pool: {}", e))?;
    }
    Ok(())
}

#[cfg(not(feature = "parallel"))]
fn configure_threads(threads: Option<usize>) -> Result<()> {
    if threads.is_some() {
        tracing::warn!("--threads has no effect: built without the 'parallel' feature.");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;
    debug!("Full CLI arguments parsed: {:?}", &cli);

    configure_threads(cli.threads)?;

    let start_time = Instant::now();

    match cli.command {
        Commands::Compute {
            inputs,
            output,
            config,
            properties,
            smoothing,
            scale,
            property_table,
            strict,
        } => {
            let mut settings = match &config {
                Some(path) => DescriptorConfig::load(path)?,
                None => DescriptorConfig::default(),
            };
            if let Some(properties) = properties {
                settings.properties = properties;
            }
            if let Some(smoothing) = smoothing {
                settings.smoothing = smoothing;
            }
            if let Some(scale) = scale {
                settings.scale = scale;
            }
            if property_table.is_some() {
                settings.property_table = property_table;
            }
            settings.strict_minimum_image |= strict;

            let params = settings.to_params();
            params.validate()?;
            let table = settings.load_property_table()?;

            let files = expand_inputs(&inputs)?;
            info!(
                "Computing {:?} (smoothing {}, scale {}) for {} structure(s).",
                params.properties,
                params.smoothing,
                params.scale,
                files.len()
            );

            let records = files
                .iter()
                .map(|path| describe_cif(path, &table, &params))
                .collect::<Result<Vec<_>>>()?;

            match &output {
                Some(path) => {
                    writer::to_csv(path, &records)?;
                    info!("Wrote {} rows to {:?}.", records.len(), path);
                }
                None => writer::write_csv(std::io::stdout().lock(), &records)?,
            }

            info!("Done in {:.2?}", start_time.elapsed());
        }
        Commands::Bins => {
            for center in BinGrid::shared().iter() {
                println!("{:.6}", center);
            }
        }
    }

    Ok(())
}
