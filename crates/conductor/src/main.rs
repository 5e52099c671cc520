use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use conductor_core::{ConfigManager, DirtyFlags, MidiRouter, SequencerBridge, Settings, TrackListing};
use conductor_push2::Push2Device;

mod app;
mod modes;

use app::App;

/// Pad controller front-end for MIDI synthesizers and clip sequencers.
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(about = "Push 2 controller front-end")]
struct Args {
    /// Settings file (default: settings.json in the working directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep the display blank
    #[arg(long)]
    no_display: bool,

    /// Host running the clip sequencer
    #[arg(long)]
    sequencer_host: Option<String>,

    /// Do not talk to the clip sequencer at all
    #[arg(long)]
    no_sequencer: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = ConfigManager::new(args.config);
    let mut settings = match config.load() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("{}, using default settings", e);
            Settings::default()
        }
    };
    if args.no_display {
        settings.use_push2_display = false;
    }
    if let Some(host) = args.sequencer_host {
        settings.sequencer.host = host;
    }
    if args.no_sequencer {
        settings.sequencer.enabled = false;
    }

    let tracks = match TrackListing::load(
        &settings.track_listing_path,
        &settings.instrument_definitions_dir,
    ) {
        Ok(tracks) => tracks,
        Err(e) => {
            log::warn!("{}, using placeholder tracks", e);
            TrackListing::placeholders()
        }
    };

    let dirty = Arc::new(DirtyFlags::default());
    let sequencer = Arc::new(SequencerBridge::new(
        settings.sequencer.clone(),
        dirty.clone(),
    ));
    if settings.sequencer.enabled {
        if let Err(e) = sequencer.start().await {
            log::warn!("Clip sequencer unavailable: {}", e);
        }
    }

    let mut push = Push2Device::new();
    if let Err(e) = push.connect() {
        log::warn!("{}, running without a controller", e);
    }
    log::debug!("Push 2 status: {:?}", push.status());

    let midi = MidiRouter::new(settings.midi_out_channel);
    let mut app = App::new(config, settings, tracks, push, midi, sequencer, dirty);
    app.start();
    app.run().await
}
