use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gpxmap_core::{parse_gpx_file, render_track_page, MapOptions};

use clap::Parser;

/// Render a GPX track to a standalone HTML map
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// GPX file
    #[arg(short, long)]
    input: String,

    /// Write HTML page to
    #[arg(short, long)]
    output: String,

    /// Initial zoom level
    #[arg(short, long)]
    zoom: Option<u8>,

    /// Id of the map element
    #[arg(short, long)]
    container: Option<String>,
}

fn main() -> Result<()> {
    // logging
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer());
    subscriber.init();

    let args = Args::parse();

    let mut options = MapOptions::default();
    if let Some(zoom) = args.zoom {
        options.zoom = zoom;
    }
    if let Some(container) = args.container {
        options.container = container;
    }

    let track = parse_gpx_file(&args.input)
        .map_err(|e| anyhow::anyhow!("On parse {}: {e}", args.input))?;
    tracing::info!("gpx parsed: {:?}, {} points", track.name, track.points.len());

    let page = render_track_page(&track, &options)?;
    std::fs::write(&args.output, page)?;

    tracing::info!("map written to {}", args.output);

    Ok(())
}
