//! Board configuration resource.
//!
//! Settings loaded from an INI configuration file. Every value has a safe
//! default, so a missing file or a missing key is never fatal.
//!
//! # Configuration File Format
//!
//! ```ini
//! [playback]
//! fps = 10
//! source_timing = false
//! tick_rate = 60
//!
//! [fetch]
//! timeout_secs = 30
//! user_agent = gifboard/0.1
//!
//! [atlas]
//! max_width = 16384
//!
//! [board]
//! locators = 6
//!
//! [catalog]
//! urls = https://example.com/a.gif, https://example.com/b.gif
//! chunk_size = 5
//! ```

use std::path::PathBuf;
use std::time::Duration;

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::{info, warn};
use serde::Serialize;

use crate::atlas::DEFAULT_MAX_ATLAS_WIDTH;
use crate::fetcher::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::resources::catalog::DEFAULT_CHUNK_SIZE;
use crate::resources::gifregistry::DEFAULT_FPS;

const DEFAULT_TICK_RATE: u32 = 60;
const DEFAULT_SOURCE_TIMING: bool = false;
const DEFAULT_LOCATORS: usize = 6;
const DEFAULT_CONFIG_PATH: &str = "./gifboard.ini";

/// Board configuration resource.
#[derive(Resource, Debug, Clone, Serialize)]
pub struct GifConfig {
    /// Playback rate of every driver, in frames per second.
    pub fps: f32,
    /// Use the frame delays declared by each source instead of `fps`.
    pub source_timing: bool,
    /// Host frames per second of the headless session loop.
    pub tick_rate: u32,
    /// Per-request timeout of the HTTP fetcher, in seconds.
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// Widest atlas accepted, in pixels.
    pub max_atlas_width: u32,
    /// Number of locator slots on the board.
    pub locators: usize,
    /// Catalog override. Empty means the built-in list.
    pub catalog_urls: Vec<String>,
    pub chunk_size: usize,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for GifConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GifConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            fps: DEFAULT_FPS,
            source_timing: DEFAULT_SOURCE_TIMING,
            tick_rate: DEFAULT_TICK_RATE,
            fetch_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_atlas_width: DEFAULT_MAX_ATLAS_WIDTH,
            locators: DEFAULT_LOCATORS,
            catalog_urls: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);

        info!(
            "Loaded config: fps={}, source_timing={}, tick_rate={}, locators={}, catalog={} urls",
            self.fps,
            self.source_timing,
            self.tick_rate,
            self.locators,
            self.catalog_urls.len()
        );

        Ok(())
    }

    /// Load configuration from INI text instead of a file.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        // [playback] section
        if let Some(fps) = config.getfloat("playback", "fps").ok().flatten() {
            self.fps = fps as f32;
        }
        if let Some(source_timing) = config.getbool("playback", "source_timing").ok().flatten() {
            self.source_timing = source_timing;
        }
        if let Some(rate) = config.getuint("playback", "tick_rate").ok().flatten() {
            match u32::try_from(rate) {
                Ok(rate) => self.tick_rate = rate,
                Err(_) => warn!(
                    "playback.tick_rate {} out of range, keeping {}",
                    rate, self.tick_rate
                ),
            }
        }

        // [fetch] section
        if let Some(timeout) = config.getuint("fetch", "timeout_secs").ok().flatten() {
            self.fetch_timeout_secs = timeout;
        }
        if let Some(agent) = config.get("fetch", "user_agent") {
            self.user_agent = agent;
        }

        // [atlas] section
        if let Some(width) = config.getuint("atlas", "max_width").ok().flatten() {
            match u32::try_from(width) {
                Ok(width) => self.max_atlas_width = width,
                Err(_) => warn!(
                    "atlas.max_width {} out of range, keeping {}",
                    width, self.max_atlas_width
                ),
            }
        }

        // [board] section
        if let Some(locators) = config.getuint("board", "locators").ok().flatten() {
            match usize::try_from(locators) {
                Ok(locators) => self.locators = locators,
                Err(_) => warn!("board.locators {} out of range", locators),
            }
        }

        // [catalog] section
        if let Some(urls) = config.get("catalog", "urls") {
            self.catalog_urls = urls
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(chunk) = config.getuint("catalog", "chunk_size").ok().flatten() {
            match usize::try_from(chunk) {
                Ok(chunk) => self.chunk_size = chunk,
                Err(_) => warn!("catalog.chunk_size {} out of range", chunk),
            }
        }
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();

        // [playback] section
        config.set("playback", "fps", Some(self.fps.to_string()));
        config.set(
            "playback",
            "source_timing",
            Some(self.source_timing.to_string()),
        );
        config.set("playback", "tick_rate", Some(self.tick_rate.to_string()));

        // [fetch] section
        config.set(
            "fetch",
            "timeout_secs",
            Some(self.fetch_timeout_secs.to_string()),
        );
        config.set("fetch", "user_agent", Some(self.user_agent.clone()));

        // [atlas] section
        config.set("atlas", "max_width", Some(self.max_atlas_width.to_string()));

        // [board] section
        config.set("board", "locators", Some(self.locators.to_string()));

        // [catalog] section
        if !self.catalog_urls.is_empty() {
            config.set("catalog", "urls", Some(self.catalog_urls.join(", ")));
        }
        config.set("catalog", "chunk_size", Some(self.chunk_size.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }
}
