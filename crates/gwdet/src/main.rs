use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gwdet_core::cache::CacheDirectory;
use gwdet_core::projection::ProjectionDistribution;

mod logging;

#[derive(Parser, Debug)]
#[command(name = "gwdet")]
#[command(about = "Detection probability of gravitational-wave sources")]
struct Args {
    /// Cache directory for interpolation artifacts (default: ~/.gwdet/)
    #[arg(short, long)]
    cache_dir: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build (or load) the projection-factor distribution and print its
    /// survival function
    Projection {
        /// Monte Carlo sample count
        #[arg(long, default_value_t = 10_000_000)]
        samples: usize,

        /// Histogram bin count
        #[arg(long, default_value_t = 10_000)]
        bins: usize,

        /// Projection factors to evaluate (default: 0 to 1 in steps of 0.1)
        #[arg(long = "eval", value_name = "W")]
        eval: Vec<f64>,
    },
    /// List the artifacts in the cache directory
    Cache,
}

fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gwdet")
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    logging::init(&args.log_level);

    let cache = CacheDirectory::new(args.cache_dir.unwrap_or_else(default_cache_dir));

    match args.command {
        Command::Projection {
            samples,
            bins,
            eval,
        } => {
            let distribution = ProjectionDistribution::get_or_build(&cache, samples, bins)?;
            tracing::info!(samples, bins, "projection-factor distribution ready");

            let points = if eval.is_empty() {
                (0..=10).map(|i| i as f64 / 10.0).collect()
            } else {
                eval
            };
            for (w, survival) in points.iter().zip(distribution.eval_many(&points)) {
                println!("P(w >= {w}) = {survival:.6}");
            }
        }
        Command::Cache => {
            if !cache.root().is_dir() {
                println!("cache directory {} does not exist", cache.root().display());
                return Ok(());
            }
            let mut entries: Vec<_> = std::fs::read_dir(cache.root())?
                .filter_map(Result::ok)
                .collect();
            entries.sort_by_key(std::fs::DirEntry::file_name);
            for entry in entries {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                println!("{:>12}  {}", size, entry.file_name().to_string_lossy());
            }
        }
    }

    Ok(())
}
