//! Board session setup and per-frame driving.
//!
//! A [`Session`] owns the ECS [`World`] and the per-frame [`Schedule`]. It is
//! the only place that knows how the pieces fit together:
//!
//! 1. Resources: [`WorldTime`], [`GifConfig`], [`GifCatalog`], [`GifBoard`],
//!    [`BrowserState`], the [`GifRegistry`] and both message queues.
//! 2. Entities: one preview surface and `config.locators` locator surfaces.
//! 3. Observers for the board and browser events.
//! 4. The schedule: the fetch pipeline systems (chained) and then
//!    [`animate_gifs`].
//!
//! The fetch thread is optional. Without it, sources stay pending until
//! something completes them through the registry directly, which is what the
//! tests do.

use bevy_ecs::observer::Observer;
use bevy_ecs::prelude::*;
use log::{debug, info};
use serde::Serialize;

use crate::atlas::FrameAtlasBuilder;
use crate::components::gifsurface::{GifSurface, SurfaceSnapshot};
use crate::components::locator::Locator;
use crate::components::preview::GifPreview;
use crate::events::board::{
    PlaceCurrentGifEvent, ScrollGifSelectionEvent, place_current_gif_observer,
    scroll_selection_observer,
};
use crate::events::browser::{ToggleBrowserEvent, toggle_browser_observer};
use crate::events::fetch::{FetchMessage, GifLoadMessage};
use crate::fetcher::SourceFetcher;
use crate::resources::board::GifBoard;
use crate::resources::browser::BrowserState;
use crate::resources::catalog::GifCatalog;
use crate::resources::fetch::{setup_fetch, shutdown_fetch};
use crate::resources::gifconfig::GifConfig;
use crate::resources::gifregistry::GifRegistry;
use crate::resources::worldtime::WorldTime;
use crate::systems::fetch::{
    apply_fetched_gifs, poll_fetch_messages, report_gif_loads, update_fetch_messages,
    update_gif_load_messages,
};
use crate::systems::gifanimation::animate_gifs;
use crate::systems::time::update_world_time;

pub struct Session {
    world: World,
    schedule: Schedule,
}

impl Session {
    /// Build a session without a fetch thread.
    pub fn new(config: GifConfig) -> Self {
        let world = build_world(config);
        Self {
            world,
            schedule: build_schedule(),
        }
    }

    /// Build a session whose loads go through `fetcher` on a background
    /// thread.
    pub fn with_fetcher(config: GifConfig, fetcher: impl SourceFetcher) -> Self {
        let mut session = Self::new(config);
        setup_fetch(&mut session.world, fetcher);
        session
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Advance time by `dt` seconds and run the schedule once.
    pub fn run_frame(&mut self, dt: f32) {
        update_world_time(&mut self.world, dt);
        self.schedule.run(&mut self.world);
        self.world.clear_trackers();
    }

    pub fn toggle_browser(&mut self) {
        self.world.trigger(ToggleBrowserEvent {});
    }

    pub fn scroll(&mut self, step: i64) {
        self.world.trigger(ScrollGifSelectionEvent { step });
    }

    pub fn place_current(&mut self) {
        self.world.trigger(PlaceCurrentGifEvent {});
    }

    /// Place every source of the board once, starting at the current
    /// selection. Stops early when there are fewer locators than sources.
    pub fn place_all(&mut self) -> usize {
        let (sources, locators) = {
            let board = self.world.resource::<GifBoard>();
            (board.sources().len(), board.locators().len())
        };
        let count = sources.min(locators);
        for _ in 0..count {
            self.place_current();
            self.scroll(1);
        }
        debug!("Placed {} GIF(s)", count);
        count
    }

    pub fn board(&self) -> &GifBoard {
        self.world.resource::<GifBoard>()
    }

    pub fn registry(&self) -> &GifRegistry {
        self.world.resource::<GifRegistry>()
    }

    pub fn registry_mut(&mut self) -> Mut<'_, GifRegistry> {
        self.world.resource_mut::<GifRegistry>()
    }

    /// Everything worth knowing about the board right now.
    pub fn snapshot(&mut self) -> BoardSnapshot {
        let mut locators: Vec<(usize, SurfaceSnapshot)> = self
            .world
            .query::<(&Locator, &GifSurface)>()
            .iter(&self.world)
            .map(|(locator, surface)| (locator.index, surface.snapshot()))
            .collect();
        locators.sort_by_key(|(index, _)| *index);

        let preview = self
            .world
            .query_filtered::<&GifSurface, With<GifPreview>>()
            .iter(&self.world)
            .next()
            .map(GifSurface::snapshot);

        let time = self.world.resource::<WorldTime>();
        let board = self.world.resource::<GifBoard>();
        let browser = self.world.resource::<BrowserState>();
        let registry = self.world.resource::<GifRegistry>();

        let mut drivers: Vec<DriverSnapshot> = registry
            .drivers()
            .map(|(source, driver)| DriverSnapshot {
                source: source.to_string(),
                frame_count: driver.frame_count(),
                frame_index: driver.frame_index(),
                fps: driver.fps(),
                targets: driver.targets().len(),
            })
            .collect();
        drivers.sort_by(|a, b| a.source.cmp(&b.source));

        BoardSnapshot {
            frame: time.frame_count,
            elapsed: time.elapsed,
            selected: board.current_source().map(String::from),
            browser_showing: browser.showing,
            preview,
            locators: locators.into_iter().map(|(_, s)| s).collect(),
            drivers,
            pending: registry.pending_len(),
        }
    }

    /// Stop the fetch thread, if any. Also runs on drop.
    pub fn shutdown(&mut self) {
        shutdown_fetch(&mut self.world);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverSnapshot {
    pub source: String,
    pub frame_count: usize,
    pub frame_index: usize,
    pub fps: f32,
    pub targets: usize,
}

/// Serializable board state for `--dump` style diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub frame: u64,
    pub elapsed: f32,
    pub selected: Option<String>,
    pub browser_showing: bool,
    pub preview: Option<SurfaceSnapshot>,
    pub locators: Vec<SurfaceSnapshot>,
    pub drivers: Vec<DriverSnapshot>,
    pub pending: usize,
}

/// Create the world with every resource, surface entity and observer the
/// board needs.
pub fn build_world(config: GifConfig) -> World {
    let mut world = World::new();
    world.insert_resource(WorldTime::default().with_time_scale(1.0));

    let catalog = GifCatalog::with_override(&config.catalog_urls, config.chunk_size);
    let registry = GifRegistry::new(config.fps)
        .with_source_timing(config.source_timing)
        .with_builder(FrameAtlasBuilder::new().with_max_width(config.max_atlas_width));
    let mut board = GifBoard::new(catalog.source_ids(0));

    let preview = world.spawn((GifPreview, GifSurface::default())).id();
    board.set_preview(preview);
    let locators: Vec<Entity> = (0..config.locators)
        .map(|index| world.spawn((Locator { index }, GifSurface::default())).id())
        .collect();
    board.set_locators(locators);

    info!(
        "Board ready: {} source(s), {} locator(s), {:.1} fps",
        board.sources().len(),
        config.locators,
        config.fps
    );

    world.insert_resource(catalog);
    world.insert_resource(board);
    world.insert_resource(registry);
    world.insert_resource(BrowserState::default());
    world.insert_resource(config);
    world.init_resource::<Messages<FetchMessage>>();
    world.init_resource::<Messages<GifLoadMessage>>();

    world.spawn(Observer::new(toggle_browser_observer));
    world.spawn(Observer::new(scroll_selection_observer));
    world.spawn(Observer::new(place_current_gif_observer));
    world.flush();

    world
}

/// Per-frame systems: drain the fetch thread, turn results into drivers,
/// report outcomes, then animate.
pub fn build_schedule() -> Schedule {
    let mut update = Schedule::default();
    update.add_systems(
        // fetch systems must be together
        (
            poll_fetch_messages,
            update_fetch_messages,
            apply_fetched_gifs,
            report_gif_loads,
            update_gif_load_messages,
        )
            .chain(),
    );
    update.add_systems(animate_gifs.after(apply_fetched_gifs));
    update
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(locators: usize) -> GifConfig {
        GifConfig {
            locators,
            catalog_urls: vec!["a.gif".into(), "b.gif".into(), "c.gif".into()],
            ..GifConfig::new()
        }
    }

    #[test]
    fn test_build_world_spawns_surfaces() {
        let mut session = Session::new(config(2));
        let snap = session.snapshot();
        assert_eq!(snap.locators.len(), 2);
        assert!(snap.preview.is_some());
        assert_eq!(snap.selected.as_deref(), Some("a.gif"));
        assert!(!snap.browser_showing);
        assert_eq!(snap.pending, 0);
    }

    #[test]
    fn test_place_all_requests_each_source() {
        let mut session = Session::new(config(2));
        assert_eq!(session.place_all(), 2);
        let snap = session.snapshot();
        assert_eq!(snap.locators[0].source.as_deref(), Some("a.gif"));
        assert_eq!(snap.locators[1].source.as_deref(), Some("b.gif"));
        assert_eq!(snap.pending, 2);
        assert_eq!(snap.selected.as_deref(), Some("c.gif"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut session = Session::new(config(1));
        session.run_frame(0.016);
        let json = serde_json::to_string(&session.snapshot()).expect("json");
        assert!(json.contains("\"frame\":1"));
        assert!(json.contains("\"selected\":\"a.gif\""));
    }
}
