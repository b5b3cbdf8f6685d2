use anyhow::{Context, Result};
use clap::Parser;
use convaudio_engine::config::{load_config, validate_config};
use convaudio_engine::{scan, startup, JobScheduler, TokioLauncher, UiMode};
use std::path::PathBuf;
use tracing::{debug, error, info};

mod driver;
mod logging;
mod ui;

use driver::{Pacing, PlainFrontend};
use ui::TuiFrontend;

const DEFAULT_CONFIG: &str = "convaudio.toml";

#[derive(Parser, Debug)]
#[command(name = "convaudio")]
#[command(about = "Batch audio converter", long_about = None)]
#[command(version)]
struct Args {
    /// Files to convert (default: every file in the current directory)
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of simultaneous encoders (default: CPU count)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Print one line per started and finished file instead of the full-screen view
    #[arg(long)]
    plain: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Fall back to ./convaudio.toml when it exists
    let default_path = PathBuf::from(DEFAULT_CONFIG);
    let config_path = match args.config {
        Some(ref path) => Some(path.as_path()),
        None if default_path.exists() => Some(default_path.as_path()),
        None => None,
    };

    let mut config = load_config(config_path).context("Failed to load configuration")?;
    if let Some(jobs) = args.jobs {
        config.max_workers = Some(jobs);
    }
    if args.plain {
        config.ui_mode = UiMode::Plain;
    }
    validate_config(&config).context("Invalid command line options")?;

    logging::init_logging(config.ui_mode, config.log_file.as_deref())?;
    info!("convaudio v{}", env!("CARGO_PKG_VERSION"));
    debug!("Configuration: {:?}", config);

    println!("CPU count: {}", startup::detect_cpu_count());
    let workers = startup::worker_limit(&config);

    match startup::check_encoder(&config.encoder_bin) {
        Ok(Some((major, minor))) => info!("Encoder version {}.{}", major, minor),
        Ok(None) => info!("Encoder version not recognised, continuing"),
        Err(e) => {
            error!("Encoder check failed: {:#}", e);
            return Err(e);
        }
    }
    startup::check_codec_support(&config.encoder_bin, &config.audio_codec)?;

    let inputs = scan::collect_inputs(args.files)?;
    if inputs.is_empty() {
        println!("Nothing to convert");
        return Ok(());
    }
    info!("{} files to convert with {} workers", inputs.len(), workers);

    let pacing = Pacing::from_config(&config);
    let ui_mode = config.ui_mode;
    let mut scheduler = JobScheduler::new(config, workers, TokioLauncher);
    scheduler.submit(inputs);

    match ui_mode {
        UiMode::Plain => {
            let mut frontend = PlainFrontend::stdout();
            driver::run_until_interrupted(&mut scheduler, &mut frontend, pacing).await
        }
        UiMode::Interactive => {
            let mut frontend = TuiFrontend::enter()?;
            let result = driver::run_until_interrupted(&mut scheduler, &mut frontend, pacing).await;
            // Put the terminal back before any error is printed
            frontend.restore()?;
            result
        }
    }
}
