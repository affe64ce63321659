// pidscope command line interface
// Runs the detection loop against the element registry and exports the result

mod adapter;

use adapter::LoggingAdapter;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use pidscope_core::config::DetectionSource;
use pidscope_core::{AppConfig, CategoryTable};
use pidscope_eye::detector;
use pidscope_eye::driver::RegistryDriver;
use pidscope_eye::overlay::{overlay_items, reference_frame_size, to_hex, Viewport};
use pidscope_eye::pipeline::{spawn_detection_loop, CancellationToken, LoopOptions};
use pidscope_eye::registry::ElementRegistry;
use pidscope_eye::snapshot::export_snapshot;
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pidscope")]
#[command(about = "Live P&ID element detection and tracking", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceKind {
    Simulated,
    Replay,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the detection loop and track elements until stopped
    Run {
        /// Detection source
        #[arg(long, value_enum)]
        source: Option<SourceKind>,

        /// JSON file of recorded batches (implies --source replay)
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Stop after this many detection cycles
        #[arg(long)]
        cycles: Option<u64>,

        /// Period between detection cycles
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Consecutive missed cycles before an element is dropped
        #[arg(long)]
        tolerance: Option<u32>,

        /// Overlap above which a new detection is a duplicate
        #[arg(long)]
        threshold: Option<f32>,

        /// Reference schematic image defining the frame size
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Where to write the element snapshot on exit
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Show the category of element names
    Classify {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            source,
            replay,
            cycles,
            interval_ms,
            tolerance,
            threshold,
            reference,
            export,
        } => {
            apply_source(&mut config, source, replay)?;
            if let Some(interval_ms) = interval_ms {
                config.detection.interval_ms = interval_ms;
            }
            if let Some(tolerance) = tolerance {
                config.registry.miss_tolerance = tolerance;
            }
            if let Some(threshold) = threshold {
                config.registry.duplicate_iou_threshold = threshold;
            }
            if reference.is_some() {
                config.overlay.reference_image = reference;
            }
            if let Some(export) = export {
                config.export.path = export;
            }
            if let Err(e) = config.validate() {
                bail!("Invalid configuration: {}", e);
            }
            run(config, cycles).await?;
        }
        Commands::Classify { names } => {
            let table = CategoryTable::with_extra(&config.extra_categories);
            for name in names {
                println!("{} -> {}", name, table.classify(&name));
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

/// Explicit path, then the per-user default if present, then built-in defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    if let Some(path) = path {
        return AppConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path));
    }
    match AppConfig::default_path() {
        Some(path) if path.exists() => {
            info!("Using configuration {:?}", path);
            AppConfig::from_file(&path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))
        }
        _ => Ok(AppConfig::default()),
    }
}

fn apply_source(
    config: &mut AppConfig,
    source: Option<SourceKind>,
    replay: Option<PathBuf>,
) -> anyhow::Result<()> {
    match (source, replay) {
        (Some(SourceKind::Simulated), Some(_)) => {
            bail!("--replay cannot be combined with --source simulated")
        }
        (_, Some(path)) => config.detection.source = DetectionSource::Replay { path },
        (Some(SourceKind::Replay), None) => {
            if !matches!(config.detection.source, DetectionSource::Replay { .. }) {
                bail!("--source replay needs --replay <FILE> or a replay path in the configuration");
            }
        }
        (Some(SourceKind::Simulated), None) => {
            if !matches!(config.detection.source, DetectionSource::Simulated { .. }) {
                config.detection.source = DetectionSource::default();
            }
        }
        (None, None) => {}
    }
    Ok(())
}

async fn run(config: AppConfig, cycles: Option<u64>) -> anyhow::Result<()> {
    let table = CategoryTable::with_extra(&config.extra_categories);
    let registry = ElementRegistry::with_table(config.registry.clone(), table, LoggingAdapter::new());
    let detector = detector::from_config(&config.detection)?;

    let token = CancellationToken::new();
    let options = LoopOptions {
        max_cycles: cycles,
        ..LoopOptions::from(&config.detection)
    };
    let (rx, loop_handle) = spawn_detection_loop(detector, options, token.clone());

    let signal_token = token.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("🛑 Stopping detection");
        signal_token.cancel();
    });

    let mut driver = RegistryDriver::new(registry);
    driver.drive(rx, token.clone()).await;
    token.cancel();
    loop_handle.await.context("Detection loop panicked")?;

    let registry = driver.into_registry();
    print_summary(&config, &registry)?;

    export_snapshot(&registry, &config.export.path)?;
    println!("Snapshot written to {}", config.export.path.display());
    Ok(())
}

fn print_summary(
    config: &AppConfig,
    registry: &ElementRegistry<LoggingAdapter>,
) -> anyhow::Result<()> {
    let view = (config.overlay.view_width, config.overlay.view_height);
    let frame = match &config.overlay.reference_image {
        Some(path) => reference_frame_size(path)?,
        None => view,
    };
    let viewport = Viewport::new(frame, view);

    println!("Tracked elements: {}", registry.len());
    print!("{}", registry.adapter().render());

    let items = overlay_items(registry, &viewport);
    if !items.is_empty() {
        println!("Overlay ({}x{} view):", view.0, view.1);
        for item in items {
            println!(
                "  {} {:?} {}",
                to_hex(item.color),
                item.rect,
                item.caption
            );
        }
    }

    let summary: Vec<_> = registry
        .categories()
        .map(|category| (category, registry.elements_in(category).len()))
        .collect();
    info!("Categories: {}", serde_json::to_string(&summary)?);
    Ok(())
}
