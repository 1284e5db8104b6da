//! trackletfit CLI — fit tracklets from JSON hit files.
//!
//! The input file is a JSON array of hit records:
//! `[{ "position": [x, y, z], "sigma": [sx, sy, sz] }, ...]`
//! ordered along the trajectory. Results are written as JSON to a file or
//! stdout.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use trackletfit::{
    check_duplicate_hits, check_radial_ordering, net_curvature, zigzag_rz, zigzag_xy,
    zigzag_xy_with_sigma, Hit, HitRecord, MagneticField, SeedEstimator, SeedOptions,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "trackletfit")]
#[command(about = "Estimate curvature and momentum seeds for charged-particle tracklets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the momentum seed via the helix → line → circle cascade.
    Seed(FitCommonArgs),

    /// Run a single fit method.
    Fit(CliFitArgs),

    /// Run zig-zag and ordering diagnostics on a tracklet.
    Check(CheckArgs),
}

#[derive(Debug, Clone, Args)]
struct FitCommonArgs {
    /// Path to the input JSON hit file.
    #[arg(long)]
    hits: PathBuf,

    /// Magnetic field strength in Tesla.
    #[arg(long, default_value = "1.5")]
    bfield: f64,

    /// Treat the first hit of the sequence as innermost.
    #[arg(long)]
    backwards: bool,

    /// Fix the seed momentum magnitude (GeV/c) instead of deriving it from
    /// the fitted radius.
    #[arg(long)]
    momentum_mag: Option<f64>,

    /// Path to write the JSON result (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FitMethod {
    Circle,
    Helix,
    Line,
    Triplet,
}

#[derive(Debug, Clone, Args)]
struct CliFitArgs {
    #[command(flatten)]
    common: FitCommonArgs,

    /// Fit method to run.
    #[arg(long, value_enum)]
    method: FitMethod,
}

#[derive(Debug, Clone, Args)]
struct CheckArgs {
    /// Path to the input JSON hit file.
    #[arg(long)]
    hits: PathBuf,

    /// Path to write the JSON result (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,
}

/// Diagnostics summary for `check`.
#[derive(Debug, serde::Serialize)]
struct CheckReport {
    n_hits: usize,
    zigzag_xy: bool,
    zigzag_xy_with_sigma: bool,
    zigzag_rz: bool,
    /// "clockwise", "counterclockwise" or "ambiguous".
    net_curvature: String,
    radial_ordering_ok: bool,
    duplicate_free: bool,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Seed(args) => run_seed(&args),
        Commands::Fit(args) => run_fit(&args),
        Commands::Check(args) => run_check(&args),
    }
}

fn load_hits(path: &Path) -> CliResult<Vec<Hit>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| -> CliError { format!("failed to read {}: {}", path.display(), e).into() })?;
    let records: Vec<HitRecord> = serde_json::from_str(&raw)
        .map_err(|e| -> CliError { format!("failed to parse {}: {}", path.display(), e).into() })?;
    if records.len() < 3 {
        return Err(format!("need at least 3 hits, got {}", records.len()).into());
    }
    Ok(records.into_iter().map(Hit::from).collect())
}

fn write_output(out: Option<&Path>, json: &str) -> CliResult<()> {
    match out {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!("results written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn seed_options(args: &FitCommonArgs) -> SeedOptions {
    SeedOptions {
        use_backwards: args.backwards,
        momentum_magnitude: args.momentum_mag,
    }
}

fn run_seed(args: &FitCommonArgs) -> CliResult<()> {
    let hits = load_hits(&args.hits)?;
    tracing::info!("loaded {} hits from {}", hits.len(), args.hits.display());

    let estimator = SeedEstimator::new(MagneticField::new(args.bfield));
    let seed = estimator.momentum_seed(&hits, &seed_options(args))?;

    let [px, py, pz] = seed.momentum;
    tracing::info!(
        "seed via {:?}: pT={:.4} GeV/c, pZ={:+.4} GeV/c, sign={:+}",
        seed.method,
        px.hypot(py),
        pz,
        seed.curvature_sign,
    );

    let json = serde_json::to_string_pretty(&seed)?;
    write_output(args.out.as_deref(), &json)
}

fn run_fit(args: &CliFitArgs) -> CliResult<()> {
    let hits = load_hits(&args.common.hits)?;
    tracing::info!(
        "loaded {} hits from {}",
        hits.len(),
        args.common.hits.display()
    );

    let estimator = SeedEstimator::new(MagneticField::new(args.common.bfield));
    let options = seed_options(&args.common);

    let json = match args.method {
        FitMethod::Circle => {
            let fit = estimator.circle_seed(&hits, &options)?;
            tracing::info!("circle fit: chi2={:.4}, radius={:.3} cm", fit.chi2, fit.radius);
            serde_json::to_string_pretty(&fit)?
        }
        FitMethod::Helix => {
            let fit = estimator.helix_fit(&hits, &options)?;
            tracing::info!("helix fit: radius={:.3} cm", fit.radius);
            serde_json::to_string_pretty(&fit)?
        }
        FitMethod::Line => {
            let fit = estimator.line_fit(&hits, &options)?;
            tracing::info!("line fit: chi2={:.4}", fit.chi2);
            serde_json::to_string_pretty(&fit)?
        }
        FitMethod::Triplet => {
            let fit = estimator.triplet_fit(&hits)?;
            tracing::info!(
                "triplet fit: chi2={:.4}, radius3d={:.3} cm",
                fit.chi2,
                fit.radius_3d
            );
            serde_json::to_string_pretty(&fit)?
        }
    };

    write_output(args.common.out.as_deref(), &json)
}

fn run_check(args: &CheckArgs) -> CliResult<()> {
    let hits = load_hits(&args.hits)?;

    let report = CheckReport {
        n_hits: hits.len(),
        zigzag_xy: zigzag_xy(&hits),
        zigzag_xy_with_sigma: zigzag_xy_with_sigma(&hits),
        zigzag_rz: zigzag_rz(&hits),
        net_curvature: match net_curvature(&hits) {
            Ok(true) => "clockwise".to_string(),
            Ok(false) => "counterclockwise".to_string(),
            Err(_) => "ambiguous".to_string(),
        },
        radial_ordering_ok: check_radial_ordering(&hits).is_ok(),
        duplicate_free: check_duplicate_hits(&hits).is_ok(),
    };

    let json = serde_json::to_string_pretty(&report)?;
    write_output(args.out.as_deref(), &json)
}
