//! Headless field viewer.
//!
//! Connects to the simulation backend's query endpoint and drives the layer
//! engine the way an interactive map would:
//! - Loads the field snapshot and paints the scalar layer
//! - Opens a plot window and plays a number of frames
//! - Writes the vector raster (PNG), the profile along a configured path and
//!   an optional point time series (CSV)

mod config;
mod host;
mod http_client;
mod profile;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use field_common::FeatureId;
use field_layers::{EngineOptions, FieldLayerEngine, TraceSet, ViewportWatch};
use playback::{FrameLoader, FrameSource, PlaybackHandle, PlaybackState, PlotWindows};
use serde_json::Value;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::ViewerConfig;
use host::{ConsoleView, HeadlessMap};
use http_client::HttpQueryClient;

#[derive(Parser, Debug)]
#[command(name = "field-viewer")]
#[command(about = "Play a simulated field over time and export rasters and profiles")]
struct Args {
    /// Viewer configuration file
    #[arg(short, long, env = "FIELD_VIEWER_CONFIG", default_value = "config/viewer.yaml")]
    config: PathBuf,

    /// Backend query endpoint (overrides the config file)
    #[arg(long, env = "FIELD_QUERY_ENDPOINT")]
    endpoint: Option<String>,

    /// Number of frames to play before exporting
    #[arg(long, default_value = "0")]
    frames: usize,

    /// Frame index to start from
    #[arg(long, default_value = "0")]
    start: usize,

    /// Feature id to export a time series for
    #[arg(long)]
    point: Option<u64>,

    /// Directory for exported files
    #[arg(short, long, default_value = "out")]
    output_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

type Engine = FieldLayerEngine<HeadlessMap, HeadlessMap>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    info!("Starting field viewer");

    let mut config = ViewerConfig::load(&args.config)?;
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let client = Arc::new(HttpQueryClient::new(config.endpoint.clone(), config.request_timeout())?);
    info!(endpoint = %client.endpoint(), "Connecting to backend");

    let mut loader = FrameLoader::new(Arc::clone(&client))
        .with_decimals(config.decimals)
        .with_scalar(config.scalar_query());
    if let Some(query) = config.vector_query() {
        loader = loader.with_vector(query);
    }
    let loader = Arc::new(loader);

    let data = loader
        .load_snapshot(Value::Object(config.field.params.clone()))
        .await
        .context("Failed to load field snapshot")?;
    let frame_count = data.snapshot.frame_count();
    if frame_count == 0 {
        return Err(anyhow!("Snapshot has no timestamps"));
    }
    let start = args.start.min(frame_count - 1);

    let map = HeadlessMap::new();
    let viewport = ViewportWatch::new(config.viewport(&data.features));
    let options = EngineOptions {
        title: config.field.title.clone(),
        scalar_mapper: config.scalar_mapper()?,
        vector_mapper: config.vector_mapper()?,
        vector_scale: config.vector_scale(),
        legend_ticks: config.field.legend_ticks,
    };

    let mut engine: Engine = FieldLayerEngine::new(map.clone(), map.clone(), viewport.current(), options);
    let painted = engine.load_scalar(data.features.clone(), &data.snapshot, start)?;
    info!(painted = painted, frames = frame_count, start = start, "Scalar layer ready");

    if config.vectors.is_some() {
        let frame = loader.load_frame(start).await.context("Failed to load vector frame")?;
        if let Some(samples) = frame.vectors {
            let stats = engine.load_vector_samples(samples.clone(), 0.0, max_speed(&samples))?;
            info!(drawn = stats.drawn, skipped = stats.skipped_outside + stats.skipped_short, "Vector layer ready");
        }
    }

    let engine = Arc::new(Mutex::new(engine));
    let timestamps = data.snapshot.timestamps.iter().map(|t| t.to_rfc3339()).collect();

    let mut windows = PlotWindows::new();
    let handle = windows
        .open(
            config.playback_config(frame_count).with_start_index(start),
            Arc::clone(&loader),
            Arc::clone(&engine),
            ConsoleView::new(timestamps),
            Some(viewport.subscribe()),
        )
        .await;

    if args.frames > 0 {
        let period = Duration::from_millis(config.playback.frame_period_ms);
        play_frames(handle, args.frames, period).await?;
    }
    let shown = handle.status().applied_index.unwrap_or(start);

    export(&engine, &map, &args, &config, client.as_ref(), &data.snapshot, &data.features, shown).await?;

    windows.close().await;
    info!(repaints = map.repaints(), "Field viewer finished");
    Ok(())
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);
    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Play until `frames` frames have been applied, a data error stops
/// playback, or the playback deadline passes.
async fn play_frames(handle: &PlaybackHandle, frames: usize, period: Duration) -> Result<()> {
    let mut status = handle.subscribe();
    let target = status.borrow().last_request_id + frames as u64;
    handle.play().await?;

    let deadline = period * (frames as u32 + 2) + Duration::from_secs(30);
    let wait = async {
        loop {
            if status.changed().await.is_err() {
                break;
            }
            let current = *status.borrow_and_update();
            let done = current.last_request_id >= target && current.applied_index == Some(current.index);
            if done || current.state == PlaybackState::Idle {
                break;
            }
        }
    };
    if tokio::time::timeout(deadline, wait).await.is_err() {
        warn!(frames = frames, "Timed out waiting for frames");
    }

    handle.pause().await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn export(
    engine: &Arc<Mutex<Engine>>,
    map: &HeadlessMap,
    args: &Args,
    config: &ViewerConfig,
    client: &HttpQueryClient,
    snapshot: &field_common::FieldSnapshot,
    features: &[field_common::FeatureRecord],
    index: usize,
) -> Result<()> {
    // Copy what is needed out of the engine; the lock is not held across awaits.
    let (png, samples) = {
        let engine = engine.lock().map_err(|_| anyhow!("engine lock poisoned"))?;
        let png = engine.vector_layer().map(|_| engine.vector_png()).transpose()?;
        (png, engine.sample_set())
    };

    if let Some(png) = png {
        let path = args.output_dir.join(format!("vectors_{:03}.png", index));
        tokio::fs::write(&path, png)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote vector raster");
    }

    if let Some(legend) = map.legend() {
        let path = args.output_dir.join("legend.json");
        tokio::fs::write(&path, serde_json::to_vec_pretty(&legend)?)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if let Some(profile_config) = &config.profile {
        match profile::lookup_vertices(client, &profile_config.path, &config.field.params, index).await {
            Ok(vertices) => {
                let points = profile::build_profile(&vertices, &samples, profile_config.spacing_m);
                let traces = TraceSet::from_profile(config.field.title.clone(), &points);
                profile::write_csv(&args.output_dir, "profile", &traces)?;
            }
            Err(e) => warn!(error = %e, "Profile lookup failed, skipping profile export"),
        }
    }

    if let Some(id) = args.point {
        let position = features
            .iter()
            .position(|f| f.id == FeatureId(id))
            .ok_or_else(|| anyhow!("Feature {} not in snapshot", id))?;
        let traces = TraceSet::point_series(config.field.title.clone(), snapshot, position)?;
        profile::write_csv(&args.output_dir, &format!("point_{}", id), &traces)?;
    }

    Ok(())
}

fn max_speed(samples: &[field_common::VectorSample]) -> f64 {
    samples
        .iter()
        .map(|s| s.color_source())
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max)
}
