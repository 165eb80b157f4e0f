use std::path::PathBuf;
use std::process;

use clap::Parser;

use road_snap::error::AppError;
use road_snap::table::BatchSize;
use road_snap::SnapConfig;

/// Exit codes for the CLI.
const EXIT_ABORTED: i32 = 1;
const EXIT_CONFIG: i32 = 2;

#[derive(Parser)]
#[command(
    name = "road-snap",
    about = "Snap CSV coordinates onto the road network with OpenRouteService",
    version
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Input CSV (overrides `input_path`)
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,

    /// Output CSV (overrides `output_path`)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Points per request (overrides `batch_size`)
    #[arg(long, short = 'b')]
    batch_size: Option<u32>,

    /// Snap endpoint URL (overrides `endpoint`)
    #[arg(long)]
    endpoint: Option<String>,

    /// OpenRouteService API key (overrides `api_key`)
    #[arg(long, env = "ROAD_SNAP_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'v', conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress progress output
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    quiet: bool,
}

fn init_tracing(cli: &Cli) {
    // --quiet   → off
    // --verbose → RUST_LOG if set, otherwise debug
    // default   → info, so per-batch progress lines are shown
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "road_snap=debug,info".into())
    } else {
        tracing_subscriber::EnvFilter::new("road_snap=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<SnapConfig, AppError> {
    let mut config = match &cli.config {
        Some(path) => SnapConfig::load(path)?,
        None => SnapConfig::default(),
    };

    if let Some(key) = &cli.api_key {
        config = config.with_api_key(key.clone());
    }
    if let Some(path) = &cli.input {
        config.input_path = path.clone();
    }
    if let Some(path) = &cli.output {
        config.output_path = path.clone();
    }
    if let Some(n) = cli.batch_size {
        config.batch_size = BatchSize::from_count(n);
    }
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }

    Ok(config)
}

fn exit_with_error(error: AppError) -> ! {
    let presentation = error.to_presentation();
    eprintln!();
    eprintln!("--- Snapping finished with errors ---");
    eprintln!("error: {}: {}", presentation.title, presentation.message);
    if let Some(action) = presentation.action {
        eprintln!("  help: {}", action);
    }

    process::exit(exit_code(&error));
}

/// Configuration problems exit with 2; every other failure aborted the run.
fn exit_code(error: &AppError) -> i32 {
    match error {
        AppError::Configuration(_) => EXIT_CONFIG,
        _ => EXIT_ABORTED,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => exit_with_error(e),
    };

    match road_snap::run(&config).await {
        Ok(report) => {
            println!();
            println!("--- Snapping finished successfully ---");
            println!(
                "{} rows in {} batches. Updated data saved to: {}",
                report.rows,
                report.batches,
                report.output_path.display()
            );
            println!(
                "The new columns are '{}' and '{}'.",
                config.columns.snapped_latitude, config.columns.snapped_longitude
            );
        }
        Err(e) => exit_with_error(e),
    }
}
