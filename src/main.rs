//! gifboard command line.
//!
//! Animated GIF playback through shared frame atlases, using:
//! - **image** to decode GIF/WebP frames and write atlases as PNG
//! - **bevy_ecs** for the board world (surfaces, registry, observers)
//! - **reqwest** on a background thread to fetch remote sources
//!
//! # Subcommands
//!
//! - `play` runs a headless board session: every catalog GIF is placed on a
//!   locator, the browser preview is shown, and the schedule ticks at the
//!   configured rate for a fixed time.
//! - `atlas` fetches one source, builds its atlas and writes it as PNG.
//! - `list` prints a page of the catalog.
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- play --seconds 5
//! RUST_LOG=debug cargo run -- atlas https://media.giphy.com/media/wn8rVP7qC8TNC/giphy.gif --out atlas.png
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use log::{info, warn};

use gifboard::atlas::FrameAtlasBuilder;
use gifboard::fetcher::HttpFetcher;
use gifboard::resources::catalog::GifCatalog;
use gifboard::resources::gifconfig::GifConfig;
use gifboard::session::Session;
use gifboard::systems::fetch::fetch_and_build;

/// Shared-atlas GIF board
#[derive(Parser)]
#[command(version, about = "Plays animated GIFs through shared frame atlases.")]
struct Cli {
    /// Configuration file (INI). Missing files fall back to defaults.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a headless board session.
    Play {
        /// How long to run, in seconds.
        #[arg(long, default_value_t = 10.0)]
        seconds: f32,
        /// Playback rate override, in frames per second.
        #[arg(long)]
        fps: Option<f32>,
        /// Print the final board state as JSON.
        #[arg(long)]
        dump: bool,
    },
    /// Build the atlas of one source and write it as PNG.
    Atlas {
        /// URL or file path of the animated image.
        source: String,
        /// Output PNG path.
        #[arg(long, short)]
        out: PathBuf,
        /// Write rows top-down instead of the bottom-up sampling layout.
        #[arg(long)]
        top_down: bool,
    },
    /// Print a page of the catalog.
    List {
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config);

    let result = match cli.command {
        Command::Play { seconds, fps, dump } => play(config, seconds, fps, dump),
        Command::Atlas {
            source,
            out,
            top_down,
        } => atlas(&config, &source, &out, top_down),
        Command::List { offset } => {
            list(&config, offset);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>) -> GifConfig {
    let explicit = path.is_some();
    let mut config = match path {
        Some(path) => GifConfig::with_path(path),
        None => GifConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        // a missing default file is normal
        if explicit {
            warn!("{}, using defaults", e);
        }
    }
    config
}

fn play(
    mut config: GifConfig,
    seconds: f32,
    fps: Option<f32>,
    dump: bool,
) -> Result<(), Box<dyn Error>> {
    if let Some(fps) = fps {
        config.fps = fps;
    }
    let tick_rate = config.tick_rate.max(1);
    let fetcher = HttpFetcher::new(config.fetch_timeout(), &config.user_agent)?;
    let mut session = Session::with_fetcher(config, fetcher);

    session.toggle_browser();
    session.place_all();

    let frame_time = Duration::from_secs_f32(1.0 / tick_rate as f32);
    let deadline = Instant::now() + Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO);
    let mut last = Instant::now();
    let mut next_report = Instant::now();

    while Instant::now() < deadline {
        let now = Instant::now();
        session.run_frame(now.duration_since(last).as_secs_f32());
        last = now;

        if now >= next_report {
            for (source, driver) in session.registry().drivers() {
                info!(
                    "{} frame {}/{} offset {:.3}",
                    source,
                    driver.frame_index() + 1,
                    driver.frame_count(),
                    driver.current_offset()
                );
            }
            next_report = now + Duration::from_secs(1);
        }

        std::thread::sleep(frame_time.saturating_sub(now.elapsed()));
    }

    if dump {
        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    }
    session.shutdown();
    Ok(())
}

fn atlas(
    config: &GifConfig,
    source: &str,
    out: &Path,
    top_down: bool,
) -> Result<(), Box<dyn Error>> {
    let fetcher = HttpFetcher::new(config.fetch_timeout(), &config.user_agent)?;
    let builder = FrameAtlasBuilder::new().with_max_width(config.max_atlas_width);
    let atlas = fetch_and_build(&fetcher, &builder, source)?;

    if top_down {
        image::imageops::flip_vertical(atlas.image()).save(out)?;
    } else {
        atlas.image().save(out)?;
    }
    println!(
        "{}: {} frame(s) of {}x{}, atlas {}x{} -> {}",
        source,
        atlas.frame_count(),
        atlas.frame_width(),
        atlas.frame_height(),
        atlas.width(),
        atlas.height(),
        out.display()
    );
    Ok(())
}

fn list(config: &GifConfig, offset: usize) {
    let catalog = GifCatalog::with_override(&config.catalog_urls, config.chunk_size);
    for (i, url) in catalog.source_ids(offset).iter().enumerate() {
        println!("{:>3}  {}", offset + i, url);
    }
}
